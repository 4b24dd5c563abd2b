//! Bounded retry for transient transport failures.
//!
//! Every network call in this crate goes through one policy: a fixed
//! number of attempts with a fixed delay, each failure logged. Bounded on
//! purpose — a dead endpoint should fail the run, not hang it.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use genesig_common::config::FetchConfig;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(fetch: &FetchConfig) -> Self {
        Self {
            max_attempts: fetch.max_attempts.max(1),
            delay: Duration::from_millis(fetch.retry_delay_ms),
        }
    }

    /// Run `op` until it succeeds or the attempt budget is spent; the last
    /// error is returned as-is.
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < self.max_attempts => {
                    tracing::warn!(%what, attempt, max_attempts = self.max_attempts, %error,
                        "attempt failed, retrying");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    tracing::warn!(%what, attempt, %error, "giving up");
                    return Err(error);
                }
            }
        }
    }
}
