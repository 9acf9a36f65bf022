//! Backoff for transient transport failures.
//!
//! Two users: the connection loop, which paces reconnection attempts through
//! a stateful [`ReconnectPolicy`] instead of hammering the server in a tight
//! loop, and the remote session download, which retries transient network
//! errors a small bounded number of times via [`retry_with_backoff`].

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use super::traits::WaError;

/// Reconnection attempts before giving up.
const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Ceiling for a single reconnect delay.
const MAX_RECONNECT_DELAY_SECS: u64 = 60;

/// Exponential backoff schedule for the connection loop.
///
/// Delays follow 2^n seconds (1, 2, 4, ...) capped at
/// [`MAX_RECONNECT_DELAY_SECS`]. After [`MAX_RECONNECT_ATTEMPTS`] failures
/// without an intervening successful open, `next_delay` returns `None` and
/// the caller should treat the connection as lost for good.
#[derive(Debug)]
pub struct ReconnectPolicy {
    attempt: u32,
}

impl ReconnectPolicy {
    pub fn new() -> Self {
        Self { attempt: 0 }
    }

    /// Delay to wait before the next attempt, or `None` once exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= MAX_RECONNECT_ATTEMPTS {
            return None;
        }
        let secs = 2u64
            .saturating_pow(self.attempt)
            .min(MAX_RECONNECT_DELAY_SECS);
        self.attempt += 1;
        Some(Duration::from_secs(secs))
    }

    /// Called on a successful open: the next failure starts over at 1s.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Retry an async operation with 2^n-second backoff, up to `max_retries`
/// additional attempts beyond the first.
///
/// Only errors for which `is_retryable` returns true are retried; anything
/// else is returned immediately.
pub async fn retry_with_backoff<F, Fut, T>(
    mut operation: F,
    is_retryable: fn(&WaError) -> bool,
    max_retries: u32,
) -> Result<T, WaError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, WaError>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                if !is_retryable(&err) || attempt >= max_retries {
                    return Err(err);
                }

                let backoff = Duration::from_secs(2u64.saturating_pow(attempt));
                warn!(attempt = attempt + 1, ?backoff, error = %err, "retrying after transient failure");
                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

/// Transient errors worth retrying: network only, never protocol/session.
pub fn is_transient(err: &WaError) -> bool {
    matches!(err, WaError::Network(_))
}
