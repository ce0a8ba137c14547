//! Periodic scan-and-operate loop

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::CancelSignal;

/// Runs a tick on a fixed interval until cancelled.
///
/// Cancellation is only observed between ticks; a tick that has started
/// always runs to completion.
#[derive(Debug, Clone)]
pub struct Watcher {
    interval: Duration,
    cancel: CancelSignal,
    max_ticks: Option<u64>,
}

impl Watcher {
    pub fn new(interval: Duration, cancel: CancelSignal) -> Self {
        Self {
            interval,
            cancel,
            max_ticks: None,
        }
    }

    /// Stop after `ticks` ticks even without cancellation.
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    /// Run `tick` with its 0-based index until cancelled. The first tick
    /// runs immediately. Returns the number of completed ticks.
    pub async fn run<F, Fut>(&self, mut tick: F) -> u64
    where
        F: FnMut(u64) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.interval.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut completed = 0;

        loop {
            if self.max_ticks.is_some_and(|max| completed >= max) {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.cancel.cancelled() => break,
            }
            if self.cancel.is_cancelled() {
                break;
            }
            tracing::debug!(tick = completed, "Watch tick");
            tick(completed).await;
            completed += 1;
        }

        tracing::info!(ticks = completed, "Watch loop stopped");
        completed
    }
}
