//! Delivery engine: reply with push fallback, and chunked multicast fan-out.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    domain::{EventContext, RecipientId},
    messaging::{
        port::ChatPlatform,
        types::{OutboundMessage, PlatformError, MULTICAST_MAX_RECIPIENTS},
    },
    registry::RecipientRegistry,
};

/// Reply token the platform sends for events that cannot be replied to
/// (e.g. webhook verification requests).
pub const ZERO_REPLY_TOKEN: &str = "00000000000000000000000000000000";

/// How a `safe_send` ended. Informational only; callers may ignore it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    Replied,
    Pushed,
    /// Every attempted path failed; the error was logged.
    Failed,
    /// Nothing to deliver to (no usable token and no push target).
    NoTarget,
}

/// Result of a `push_to_all` fan-out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub recipients: usize,
    pub chunks: usize,
    pub failed_chunks: usize,
}

pub struct Dispatcher {
    platform: Arc<dyn ChatPlatform>,
    registry: Arc<RecipientRegistry>,
}

impl Dispatcher {
    pub fn new(platform: Arc<dyn ChatPlatform>, registry: Arc<RecipientRegistry>) -> Self {
        Self { platform, registry }
    }

    pub fn platform(&self) -> &Arc<dyn ChatPlatform> {
        &self.platform
    }

    pub fn registry(&self) -> &Arc<RecipientRegistry> {
        &self.registry
    }

    /// Deliver `messages` to whoever triggered `event`.
    ///
    /// At most one reply attempt and at most one push. A push follows a failed
    /// reply only when the token itself was rejected; any other reply error is
    /// final. Nothing is returned as an error.
    pub async fn safe_send(&self, event: &EventContext, messages: &[OutboundMessage]) -> SendOutcome {
        if messages.is_empty() {
            return SendOutcome::NoTarget;
        }

        let target = event.target_id();
        let token = event
            .reply_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != ZERO_REPLY_TOKEN);

        let Some(token) = token else {
            return match target {
                Some(to) => self.push_once(&to, messages).await,
                None => {
                    debug!("no reply token and no push target; dropping messages");
                    SendOutcome::NoTarget
                }
            };
        };

        match self.platform.reply(token, messages).await {
            Ok(()) => SendOutcome::Replied,
            Err(PlatformError::InvalidReplyToken) => match target {
                Some(to) => {
                    info!(to = %to, "reply token rejected; falling back to push");
                    self.push_once(&to, messages).await
                }
                None => {
                    warn!("reply token rejected and event has no push target");
                    SendOutcome::Failed
                }
            },
            Err(e) => {
                warn!(error = %e, "reply failed");
                SendOutcome::Failed
            }
        }
    }

    async fn push_once(&self, to: &RecipientId, messages: &[OutboundMessage]) -> SendOutcome {
        match self.platform.push(to, messages).await {
            Ok(()) => SendOutcome::Pushed,
            Err(e) => {
                warn!(to = %to, error = %e, "push failed");
                SendOutcome::Failed
            }
        }
    }

    /// Multicast `messages` to every remembered group except `exclude`.
    ///
    /// Recipients are sent in chunks of at most 500, sequentially. A failed
    /// chunk is logged and skipped; it never stops the remaining chunks and is
    /// not retried.
    pub async fn push_to_all(
        &self,
        messages: &[OutboundMessage],
        exclude: Option<&str>,
    ) -> BroadcastReport {
        let recipients = self.registry.list_recipients(exclude).await;
        let mut report = BroadcastReport {
            recipients: recipients.len(),
            ..BroadcastReport::default()
        };
        if recipients.is_empty() || messages.is_empty() {
            debug!("no recipients to broadcast to");
            return report;
        }

        for (idx, chunk) in recipients.chunks(MULTICAST_MAX_RECIPIENTS).enumerate() {
            report.chunks += 1;
            match self.platform.multicast(chunk, messages).await {
                Ok(()) => debug!(chunk = idx, size = chunk.len(), "multicast chunk sent"),
                Err(e) => {
                    report.failed_chunks += 1;
                    warn!(chunk = idx, size = chunk.len(), error = %e, "multicast chunk failed");
                }
            }
        }

        info!(
            recipients = report.recipients,
            chunks = report.chunks,
            failed_chunks = report.failed_chunks,
            "broadcast finished"
        );
        report
    }
}
