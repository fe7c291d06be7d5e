use std::{str::FromStr, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{domain::LottoResult, lotto::source::LottoSource};

/// Default freshness window for a cached result.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// What happens to a cached success when every source fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Keep serving the last successful result. The failed attempt still
    /// starts a new window, so sources are retried once it has passed.
    #[default]
    KeepLastGood,
    /// Overwrite the cache with "no result".
    Clear,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep" | "keep_last_good" | "last_good" => Ok(Self::KeepLastGood),
            "clear" | "absent" => Ok(Self::Clear),
            other => Err(format!("unknown policy {other:?} (expected keep|clear)")),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    fetched_at: Instant,
    result: Option<LottoResult>,
}

/// Tries sources in priority order and caches the outcome for a short window.
///
/// The cache lock is held for the whole refresh, so concurrent callers wait for
/// one in-flight fetch instead of hitting the upstream sites in parallel.
pub struct LottoFetcher {
    sources: Vec<Arc<dyn LottoSource>>,
    ttl: Duration,
    on_failure: FailurePolicy,
    cache: Mutex<Option<CacheEntry>>,
}

impl LottoFetcher {
    pub fn new(sources: Vec<Arc<dyn LottoSource>>) -> Self {
        Self {
            sources,
            ttl: DEFAULT_TTL,
            on_failure: FailurePolicy::default(),
            cache: Mutex::new(None),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    /// Latest result, or `None` if no source produced one.
    ///
    /// Every attempt, successful or not, is recorded. Without `force`, an
    /// attempt younger than the freshness window is answered from the cache
    /// (a result or `None`) with no network access.
    pub async fn fetch(&self, force: bool) -> Option<LottoResult> {
        let mut cache = self.cache.lock().await;

        if !force {
            if let Some(entry) = cache.as_ref() {
                if entry.fetched_at.elapsed() < self.ttl {
                    debug!(hit = entry.result.is_some(), "serving cached lotto outcome");
                    return entry.result.clone();
                }
            }
        }

        let result = match self.try_sources().await {
            Some(result) => Some(result),
            None => match self.on_failure {
                FailurePolicy::Clear => None,
                FailurePolicy::KeepLastGood => {
                    let last_good = cache.as_ref().and_then(|e| e.result.clone());
                    if let Some(result) = &last_good {
                        warn!(
                            date = %result.date_th(),
                            "all lotto sources failed; serving last known good result"
                        );
                    }
                    last_good
                }
            },
        };

        *cache = Some(CacheEntry {
            fetched_at: Instant::now(),
            result: result.clone(),
        });
        result
    }

    async fn try_sources(&self) -> Option<LottoResult> {
        for source in &self.sources {
            match source.fetch().await {
                Ok(result) => {
                    info!(source = source.name(), date = %result.date_th(), "fetched lotto result");
                    return Some(result);
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "lotto source failed");
                }
            }
        }
        warn!(sources = self.sources.len(), "no lotto source produced a result");
        None
    }
}
