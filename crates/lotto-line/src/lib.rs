//! LINE adapter.
//!
//! Implements the `lotto-core` [`ChatPlatform`] port over the LINE Messaging
//! API and hosts the webhook HTTP surface.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

pub mod handlers;
pub mod router;
pub mod webhook;

use lotto_core::{
    domain::RecipientId,
    messaging::{
        port::{ChatPlatform, PlatformResult},
        types::{classify_api_error, OutboundMessage, PlatformError},
    },
};

pub const DEFAULT_API_BASE: &str = "https://api.line.me";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: &'a [OutboundMessage],
}

#[derive(Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: &'a [OutboundMessage],
}

#[derive(Serialize)]
struct MulticastRequest<'a> {
    to: Vec<&'a str>,
    messages: &'a [OutboundMessage],
}

#[derive(Clone)]
pub struct LineClient {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl LineClient {
    pub fn new(http: reqwest::Client, api_base: &str, access_token: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn map_transport(e: reqwest::Error) -> PlatformError {
        PlatformError::Transport(e.to_string())
    }

    async fn check(resp: reqwest::Response) -> PlatformResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(classify_api_error(status.as_u16(), &body))
    }

    async fn post_json<T: Serialize + Sync>(&self, path: &str, body: &T) -> PlatformResult<()> {
        let resp = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for LineClient {
    async fn reply(&self, reply_token: &str, messages: &[OutboundMessage]) -> PlatformResult<()> {
        self.post_json(
            "/v2/bot/message/reply",
            &ReplyRequest {
                reply_token,
                messages,
            },
        )
        .await
    }

    async fn push(&self, to: &RecipientId, messages: &[OutboundMessage]) -> PlatformResult<()> {
        self.post_json(
            "/v2/bot/message/push",
            &PushRequest {
                to: to.as_str(),
                messages,
            },
        )
        .await
    }

    async fn multicast(
        &self,
        to: &[RecipientId],
        messages: &[OutboundMessage],
    ) -> PlatformResult<()> {
        self.post_json(
            "/v2/bot/message/multicast",
            &MulticastRequest {
                to: to.iter().map(RecipientId::as_str).collect(),
                messages,
            },
        )
        .await
    }

    async fn group_name(&self, group_id: &str) -> PlatformResult<Option<String>> {
        let resp = self
            .http
            .get(self.url(&format!("/v2/bot/group/{group_id}/summary")))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(Self::map_transport)?;
        let resp = Self::check(resp).await?;
        let summary: Value = resp.json().await.map_err(Self::map_transport)?;
        Ok(summary
            .get("groupName")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string))
    }
}
