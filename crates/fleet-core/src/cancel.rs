//! Cooperative cancellation shared by every run

use std::sync::Arc;

use tokio::sync::watch;

/// A cancellation flag observed by worker pools and watch loops.
///
/// Cancelling stops new work from being dispatched. Work already running is
/// left to finish.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolve once cancellation has been requested.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}
