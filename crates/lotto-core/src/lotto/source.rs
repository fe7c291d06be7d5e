use async_trait::async_trait;

use crate::{domain::LottoResult, Result};

/// One upstream result site.
///
/// Implementations issue a single bounded request and either return a complete,
/// normalized result or an error. They never retry.
#[async_trait]
pub trait LottoSource: Send + Sync {
    /// Short stable name used in logs.
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<LottoResult>;
}
