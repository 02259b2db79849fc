use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Rate limit exceeded")]
pub struct RateLimitExceeded;

/// Fixed-window request quota per API key.
///
/// All keys share one global window: the reset task clears every counter at
/// the same instant, regardless of when each key made its first request.
/// This is intentionally not a sliding or per-key window.
pub struct RateLimiter {
    counts: Mutex<HashMap<String, u32>>,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(max_requests: u32) -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            max_requests,
        }
    }

    /// Counts one request against `api_key`'s quota.
    ///
    /// The counter is incremented before the comparison and keeps growing
    /// past the limit, so every call after the quota is hit stays rejected
    /// until the next reset.
    pub async fn consume(&self, api_key: &str) -> Result<(), RateLimitExceeded> {
        let mut counts = self.counts.lock().await;
        let count = counts.entry(api_key.to_string()).or_insert(0);
        *count += 1;
        if *count > self.max_requests {
            tracing::warn!("Rate limit exceeded for API key: {}", api_key);
            return Err(RateLimitExceeded);
        }
        tracing::debug!("Request count for API key {}: {}", api_key, count);
        Ok(())
    }

    /// Clears all counters unconditionally, starting a fresh window for
    /// every key at once.
    pub async fn reset(&self) {
        tracing::info!("Resetting rate limit counts");
        self.counts.lock().await.clear();
    }
}

/// Fires `reset` every `window` of wall-clock time, independent of request
/// volume. A request arriving exactly at the boundary may land in either
/// window.
pub fn spawn_reset_task(
    limiter: Arc<RateLimiter>,
    window: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(window);
        // The first tick completes immediately; skip it so the first window
        // runs its full length.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            limiter.reset().await;
        }
    })
}
