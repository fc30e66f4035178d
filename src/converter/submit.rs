//! Submission and polling.

use crate::error::{Error, Result};
use crate::types::{Event, Submission, TaskId, TaskState};

use super::AudioConverter;

impl AudioConverter {
    /// Submit a URL for conversion
    ///
    /// Registers a task in `starting` and runs it in the background; this never waits
    /// for the engine.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] when `url` is empty or not an absolute http(s) URL;
    ///   no task is created
    /// - [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has begun
    pub async fn submit(&self, url: &str, is_playlist: bool) -> Result<TaskId> {
        let url = validate_url(url)?;

        if !self
            .lifecycle
            .accepting_new
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Err(Error::ShuttingDown);
        }

        let submission = Submission { url, is_playlist };
        let id = self.registry.create(&submission).await;

        tracing::info!(
            task_id = %id,
            url = %submission.url,
            is_playlist,
            "Task submitted"
        );
        self.emit_event(Event::Submitted {
            id,
            url: submission.url.clone(),
            is_playlist,
        });

        let converter = self.clone();
        self.lifecycle.tracker.spawn(async move {
            converter.run_task(id, submission).await;
        });

        Ok(id)
    }

    /// Snapshot of a task's state, or `None` for an unknown id
    pub async fn poll(&self, id: TaskId) -> Option<TaskState> {
        self.registry.get(id).await
    }

    /// Snapshots of every known task, newest first
    pub async fn list_tasks(&self) -> Vec<TaskState> {
        self.registry.list().await
    }
}

/// Trim and check a submitted URL
fn validate_url(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(Error::InvalidInput("url must not be empty".into()));
    }

    let parsed = url::Url::parse(url)
        .map_err(|e| Error::InvalidInput(format!("invalid url '{}': {}", url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(Error::InvalidInput(format!(
            "url must be an absolute http(s) URL: {}",
            url
        )));
    }

    Ok(url.to_string())
}
