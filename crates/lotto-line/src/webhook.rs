//! Webhook authentication and payload decoding.
//!
//! The platform signs each delivery as
//!
//! ```text
//! X-Line-Signature: base64(HMAC-SHA256(channel_secret, raw_body))
//! ```

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ring::hmac;
use serde::Deserialize;

use lotto_core::domain::{EventContext, EventSource};

pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Signature for `body` under `secret`, base64 encoded.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    STANDARD.encode(hmac::sign(&key, body).as_ref())
}

/// Constant-time check of a signature header against the raw body.
pub fn verify_signature(secret: &str, body: &[u8], header: &str) -> bool {
    let Ok(sig) = STANDARD.decode(header.trim()) else {
        return false;
    };
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hmac::verify(&key, body, &sig).is_ok()
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Option<RawSource>,
    #[serde(default)]
    pub message: Option<RawMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSource {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub group_id: Option<String>,
    pub room_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl RawSource {
    fn to_source(&self) -> Option<EventSource> {
        let user_id = self.user_id.clone().filter(|u| !u.is_empty());
        match self.kind.as_str() {
            "group" => self.group_id.clone().map(|group_id| EventSource::Group { group_id, user_id }),
            "room" => self.room_id.clone().map(|room_id| EventSource::Room { room_id, user_id }),
            "user" => user_id.map(|user_id| EventSource::User { user_id }),
            _ => None,
        }
    }
}

/// An inbound event reduced to what the handlers act on.
#[derive(Clone, Debug)]
pub struct InboundEvent {
    pub ctx: EventContext,
    pub is_message: bool,
    /// Set for text messages only.
    pub text: Option<String>,
}

impl From<RawEvent> for InboundEvent {
    fn from(raw: RawEvent) -> Self {
        let is_message = raw.kind == "message";
        let text = raw
            .message
            .filter(|m| is_message && m.kind == "text")
            .and_then(|m| m.text);
        Self {
            ctx: EventContext {
                reply_token: raw.reply_token.filter(|t| !t.is_empty()),
                source: raw.source.as_ref().and_then(RawSource::to_source),
            },
            is_message,
            text,
        }
    }
}

pub fn parse_events(body: &[u8]) -> Result<Vec<InboundEvent>, serde_json::Error> {
    let payload: WebhookPayload = serde_json::from_slice(body)?;
    Ok(payload.events.into_iter().map(InboundEvent::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "channel-secret";

    #[test]
    fn accepts_own_signature_and_rejects_tampering() {
        let body = br#"{"events":[]}"#;
        let sig = sign(SECRET, body);
        assert!(verify_signature(SECRET, body, &sig));
        assert!(!verify_signature(SECRET, br#"{"events":[1]}"#, &sig));
        assert!(!verify_signature("other", body, &sig));
        assert!(!verify_signature(SECRET, body, "not base64!!"));
        assert!(!verify_signature(SECRET, body, ""));
    }

    #[test]
    fn matches_known_hmac_vector() {
        // RFC 4231 test case 2.
        let sig = sign("Jefe", b"what do ya want for nothing?");
        assert_eq!(sig, "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM=");
    }

    #[test]
    fn parses_group_text_event() {
        let body = r#"{
            "destination": "U0",
            "events": [{
                "type": "message",
                "replyToken": "r1",
                "source": {"type": "group", "groupId": "C1", "userId": "U1"},
                "message": {"type": "text", "id": "1", "text": "/ผลหวย"}
            }]
        }"#
        .as_bytes();
        let events = parse_events(body).unwrap();
        assert_eq!(events.len(), 1);
        let ev = &events[0];
        assert!(ev.is_message);
        assert_eq!(ev.text.as_deref(), Some("/ผลหวย"));
        assert_eq!(ev.ctx.reply_token.as_deref(), Some("r1"));
        assert_eq!(ev.ctx.group_id(), Some("C1"));
    }

    #[test]
    fn non_text_and_non_message_events_have_no_text() {
        let body = br#"{"events": [
            {"type": "message", "replyToken": "r", "source": {"type": "user", "userId": "U1"},
             "message": {"type": "sticker", "id": "2"}},
            {"type": "follow", "replyToken": "r2", "source": {"type": "room", "roomId": "R1"}}
        ]}"#;
        let events = parse_events(body).unwrap();
        assert!(events[0].is_message && events[0].text.is_none());
        assert_eq!(events[0].ctx.target_id().unwrap().as_str(), "U1");
        assert!(!events[1].is_message);
        assert_eq!(events[1].ctx.target_id().unwrap().as_str(), "R1");
        assert_eq!(events[1].ctx.group_id(), None);
    }

    #[test]
    fn empty_or_invalid_bodies() {
        assert!(parse_events(b"{}").unwrap().is_empty());
        assert!(parse_events(b"not json").is_err());
    }
}
