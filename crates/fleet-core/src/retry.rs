//! Retry of transient network failures

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;

use crate::Result;

/// Bounded exponential retry for network-classified failures.
///
/// `backoff` supplies the delays; the attempt count is kept here so the
/// bound is exact regardless of elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

/// Result of a retried operation and the number of retries it took.
#[derive(Debug)]
pub struct Retried<T> {
    pub result: Result<T>,
    pub retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Run `op`, retrying while it fails with a retryable error and the
    /// retry budget lasts. Non-retryable errors return immediately.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Retried<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delays = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.base_delay)
            .with_multiplier(2.0)
            .with_max_interval(Duration::from_secs(30))
            .with_max_elapsed_time(None)
            .build();
        let mut retries = 0;

        loop {
            match op().await {
                Ok(value) => {
                    return Retried {
                        result: Ok(value),
                        retries,
                    };
                }
                Err(e) if e.is_retryable() && retries < self.max_retries => {
                    let delay = delays.next_backoff().unwrap_or(self.base_delay);
                    retries += 1;
                    tracing::warn!(
                        operation = label,
                        attempt = retries,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying after network failure"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Retried {
                        result: Err(e),
                        retries,
                    };
                }
            }
        }
    }
}
