use crate::messaging::types::PlatformError;

/// Core error type.
///
/// Adapter crates map their specific errors into this type so the command layer
/// can handle failures consistently (user-facing message vs logged and dropped).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("fetch from {source_name} failed: {reason}")]
    Fetch {
        source_name: String,
        reason: String,
    },

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn fetch(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
