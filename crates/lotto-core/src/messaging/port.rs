use async_trait::async_trait;

use crate::{
    domain::RecipientId,
    messaging::types::{OutboundMessage, PlatformError},
};

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Chat platform port: the three delivery primitives plus group lookup.
///
/// Each call is one independent network request with a bounded timeout.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Answer an inbound event with its single-use reply token.
    async fn reply(&self, reply_token: &str, messages: &[OutboundMessage]) -> PlatformResult<()>;

    /// Deliver to one durable recipient.
    async fn push(&self, to: &RecipientId, messages: &[OutboundMessage]) -> PlatformResult<()>;

    /// Deliver to many recipients in one call (at most
    /// [`MULTICAST_MAX_RECIPIENTS`](crate::messaging::types::MULTICAST_MAX_RECIPIENTS)).
    async fn multicast(
        &self,
        to: &[RecipientId],
        messages: &[OutboundMessage],
    ) -> PlatformResult<()>;

    /// Display name of a group, if the platform knows it.
    async fn group_name(&self, group_id: &str) -> PlatformResult<Option<String>>;
}
