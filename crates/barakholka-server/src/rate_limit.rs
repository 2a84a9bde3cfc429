//! Per-user throttling of chat message posts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use barakholka_shared::UserId;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::ServerError;

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    fn try_take(&mut self, rate: f64, capacity: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;
        self.tokens = (self.tokens + elapsed * rate).min(capacity);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Token bucket per sender: `rate` messages per second sustained, up to
/// `burst` at once.
#[derive(Clone)]
pub struct MessageRateLimiter {
    buckets: Arc<Mutex<HashMap<UserId, TokenBucket>>>,
    rate: f64,
    burst: f64,
}

impl MessageRateLimiter {
    pub fn new(rate: f64, burst: f64) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            rate,
            burst,
        }
    }

    /// Spend one token for `user`, or fail with [`ServerError::RateLimited`].
    pub async fn check(&self, user: UserId) -> Result<(), ServerError> {
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets
            .entry(user)
            .or_insert_with(|| TokenBucket::full(self.burst));

        if bucket.try_take(self.rate, self.burst) {
            Ok(())
        } else {
            warn!(user = %user, "message rate limit exceeded");
            Err(ServerError::RateLimited)
        }
    }

    /// Forget users idle for longer than `max_idle_secs`.
    pub async fn purge_stale(&self, max_idle_secs: f64) {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        buckets.retain(|_, bucket| {
            now.duration_since(bucket.last_refill).as_secs_f64() < max_idle_secs
        });
    }
}
