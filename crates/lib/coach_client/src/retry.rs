//! Caller-side retry for backend-unavailable responses.
//!
//! The client never retries on its own. Callers that want to wait out a
//! datastore that is still starting wrap the call in [`retry_unavailable`],
//! which sleeps the server-suggested delay between attempts.

use std::future::Future;

use tokio::time::{Duration, sleep};
use tracing::info;

use crate::error::{ClientError, ClientResult};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1.
    pub max_attempts: u32,
    /// Upper bound for a single server-suggested delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempts run out. Returns the last error.
pub async fn retry_unavailable<T, F, Fut>(policy: RetryPolicy, mut op: F) -> ClientResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ClientResult<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() && attempt < attempts => {
                let delay = retry_delay(&error).min(policy.max_delay);
                info!(
                    attempt,
                    max_attempts = attempts,
                    delay_secs = delay.as_secs_f64(),
                    "backend unavailable, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

fn retry_delay(error: &ClientError) -> Duration {
    error
        .retry_after()
        .unwrap_or(crate::error::DEFAULT_RETRY_AFTER)
}
