//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::AudioConverter;

/// How long shutdown waits for in-flight tasks
pub(crate) const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl AudioConverter {
    /// Gracefully shut down the converter
    ///
    /// 1. Stops accepting new submissions ([`Error::ShuttingDown`](crate::Error::ShuttingDown))
    /// 2. Stops background services (retention sweeper)
    /// 3. Waits up to 30 seconds for in-flight tasks to reach a terminal state
    /// 4. Emits [`Event::Shutdown`]
    ///
    /// Tasks still running after the timeout are left to finish on their own;
    /// there is no cancellation.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_within(SHUTDOWN_TIMEOUT).await
    }

    /// [`shutdown`](Self::shutdown) with a custom wait bound
    pub async fn shutdown_within(&self, timeout: Duration) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.lifecycle.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new submissions");

        self.lifecycle.shutdown_token.cancel();
        self.lifecycle.tracker.close();

        let in_flight = self.lifecycle.tracker.len();
        tracing::debug!(in_flight, "Waiting for in-flight tasks");
        match tokio::time::timeout(timeout, self.lifecycle.tracker.wait()).await {
            Ok(()) => tracing::info!("All in-flight tasks finished"),
            Err(_) => tracing::warn!(
                remaining = self.lifecycle.tracker.len(),
                "Timeout waiting for in-flight tasks, proceeding with shutdown"
            ),
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether new submissions are accepted
    pub fn is_accepting(&self) -> bool {
        self.lifecycle.accepting_new.load(Ordering::SeqCst)
    }

    /// Number of tasks whose runner has not finished yet
    pub fn active_tasks(&self) -> usize {
        self.lifecycle.tracker.len()
    }
}
