use serde::{Deserialize, Serialize};

use crate::utils::truncate_text;

/// Hard per-call recipient cap of the multicast primitive.
pub const MULTICAST_MAX_RECIPIENTS: usize = 500;

/// Outgoing message payload, serialized in the platform's wire shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        original_content_url: String,
        preview_image_url: String,
    },
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Image message using the same URL for the original and the preview.
    pub fn image(url: impl Into<String>) -> Self {
        let url = url.into();
        Self::Image {
            original_content_url: url.clone(),
            preview_image_url: url,
        }
    }
}

/// Failure of a single chat API call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// Reply token already used, expired, or unknown.
    #[error("invalid reply token")]
    InvalidReplyToken,

    #[error("platform api error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("platform transport error: {0}")]
    Transport(String),
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// Classify an error response of the chat API.
///
/// The platform has no machine-readable code for a bad reply token; it is only
/// identifiable by its message, and that check lives here and nowhere else.
pub fn classify_api_error(status: u16, body: &str) -> PlatformError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| truncate_text(body.trim(), 200));

    if status == 400 && message.to_lowercase().contains("invalid reply token") {
        return PlatformError::InvalidReplyToken;
    }
    PlatformError::Api { status, message }
}
