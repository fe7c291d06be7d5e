use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::RecipientId,
    messaging::{
        port::{ChatPlatform, PlatformResult},
        types::OutboundMessage,
    },
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* chat API calls.
    pub global_min_interval: Duration,
    /// Minimum spacing between pushes to the same recipient.
    pub per_target_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(10), // ~100/sec
            per_target_min_interval: Duration::from_millis(250),
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }

    /// No reserved slot lies ahead of `now`.
    fn is_idle(&self, now: Instant) -> bool {
        self.next <= now
    }
}

/// ChatPlatform decorator that spaces outbound calls.
///
/// Best-effort protection against platform rate limits during fan-out; it does
/// not guarantee the platform never answers 429.
pub struct ThrottledPlatform {
    inner: Arc<dyn ChatPlatform>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_target: Mutex<HashMap<String, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledPlatform {
    pub fn new(inner: Arc<dyn ChatPlatform>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_target: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for_target(&self, target: &str) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_target.lock().await;
        let now = Instant::now();
        // Drop limiters that nobody holds and whose last slot has passed.
        map.retain(|key, lim| {
            key == target
                || Arc::strong_count(lim) > 1
                || lim.try_lock().map(|l| !l.is_idle(now)).unwrap_or(true)
        });
        map.entry(target.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_target_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle_target(&self, target: &str) {
        let global_wait = { self.global.lock().await.reserve() };
        let target_wait = {
            let lim = self.limiter_for_target(target).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(target_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }

    async fn throttle_global(&self) {
        let wait = { self.global.lock().await.reserve() };
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait]
impl ChatPlatform for ThrottledPlatform {
    async fn reply(&self, reply_token: &str, messages: &[OutboundMessage]) -> PlatformResult<()> {
        // Reply tokens expire quickly; never hold them behind a per-target queue.
        self.throttle_global().await;
        self.inner.reply(reply_token, messages).await
    }

    async fn push(&self, to: &RecipientId, messages: &[OutboundMessage]) -> PlatformResult<()> {
        self.throttle_target(to.as_str()).await;
        self.inner.push(to, messages).await
    }

    async fn multicast(
        &self,
        to: &[RecipientId],
        messages: &[OutboundMessage],
    ) -> PlatformResult<()> {
        self.throttle_global().await;
        self.inner.multicast(to, messages).await
    }

    async fn group_name(&self, group_id: &str) -> PlatformResult<Option<String>> {
        self.throttle_global().await;
        self.inner.group_name(group_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopPlatform;

    #[async_trait]
    impl ChatPlatform for NoopPlatform {
        async fn reply(&self, _: &str, _: &[OutboundMessage]) -> PlatformResult<()> {
            Ok(())
        }

        async fn push(&self, _: &RecipientId, _: &[OutboundMessage]) -> PlatformResult<()> {
            Ok(())
        }

        async fn multicast(&self, _: &[RecipientId], _: &[OutboundMessage]) -> PlatformResult<()> {
            Ok(())
        }

        async fn group_name(&self, _: &str) -> PlatformResult<Option<String>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn idle_target_limiters_are_pruned() {
        let throttled = ThrottledPlatform::new(
            Arc::new(NoopPlatform),
            ThrottleConfig {
                global_min_interval: Duration::ZERO,
                per_target_min_interval: Duration::from_millis(50),
            },
        );

        for id in ["C1", "C2", "C3"] {
            throttled.push(&RecipientId(id.to_string()), &[]).await.unwrap();
        }
        assert_eq!(throttled.per_target.lock().await.len(), 3);

        sleep(Duration::from_millis(120)).await;
        throttled.push(&RecipientId("C4".to_string()), &[]).await.unwrap();

        let map = throttled.per_target.lock().await;
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("C4"));
    }

    #[tokio::test]
    async fn limiter_spaces_consecutive_reservations() {
        let mut lim = IntervalLimiter::new(Duration::from_millis(100));
        assert_eq!(lim.reserve(), Duration::ZERO);
        let second = lim.reserve();
        assert!(second > Duration::from_millis(50));
        assert!(second <= Duration::from_millis(100));
        let third = lim.reserve();
        assert!(third > second);
    }
}
