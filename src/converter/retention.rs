//! Eviction of finished tasks from the registry.

use crate::types::TaskId;
use chrono::Utc;

use super::AudioConverter;

impl AudioConverter {
    /// Evict terminal tasks whose last update is older than the configured TTL
    ///
    /// Returns the evicted ids; always empty when no TTL is configured.
    pub async fn evict_expired(&self) -> Vec<TaskId> {
        let Some(ttl) = self.config.retention.task_ttl else {
            return Vec::new();
        };
        let ttl = match chrono::Duration::from_std(ttl) {
            Ok(ttl) => ttl,
            // a TTL beyond chrono's range never expires anything
            Err(_) => return Vec::new(),
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(ttl) else {
            return Vec::new();
        };

        let evicted = self.registry.evict_finished_before(cutoff).await;
        if !evicted.is_empty() {
            tracing::debug!(evicted = evicted.len(), "Evicted expired tasks");
        }
        evicted
    }

    /// Start the retention sweeper when a TTL is configured
    pub(crate) fn spawn_retention_sweeper(&self) -> Option<tokio::task::JoinHandle<()>> {
        let Some(ttl) = self.config.retention.task_ttl else {
            tracing::debug!("No task TTL configured, skipping retention sweeper");
            return None;
        };

        let converter = self.clone();
        let interval = self.config.retention.sweep_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        converter.evict_expired().await;
                    }
                    _ = converter.lifecycle.shutdown_token.cancelled() => {
                        break;
                    }
                }
            }
            tracing::debug!("Retention sweeper stopped");
        });

        tracing::info!(
            ttl_secs = ttl.as_secs(),
            interval_secs = interval.as_secs(),
            "Retention sweeper started"
        );
        Some(handle)
    }
}
