//! In-memory task registry
//!
//! The registry is the only shared mutable state in the converter. Polling requests
//! read it while background tasks write it, so it is built for both to proceed
//! without contending on unrelated entries:
//!
//! - the id map sits behind a [`RwLock`] that is held only long enough to look up or
//!   insert an entry handle, never across engine I/O
//! - each entry sits behind its own [`RwLock`]
//! - [`TaskRegistry::update`] runs the mutator on a copy, validates the copy against
//!   the lifecycle rules, then commits it in one write, so readers observe either the
//!   previous or the next snapshot and never a mix

use crate::error::{Error, Result};
use crate::types::{Submission, TaskId, TaskState, TaskStatus};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Entry = Arc<RwLock<TaskState>>;

/// Process-wide mapping from task identifier to task state
#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<RwLock<HashMap<TaskId, Entry>>>,
}

impl TaskRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh identifier and insert its initial `starting` state
    pub async fn create(&self, submission: &Submission) -> TaskId {
        let mut tasks = self.tasks.write().await;
        let mut id = TaskId::new();
        // v4 collisions are practically impossible, but an id is never reused
        while tasks.contains_key(&id) {
            id = TaskId::new();
        }
        let state = TaskState::new(id, submission);
        tasks.insert(id, Arc::new(RwLock::new(state)));
        id
    }

    /// Consistent snapshot of a task, or `None` if the id was never created
    pub async fn get(&self, id: TaskId) -> Option<TaskState> {
        let entry = self.entry(id).await?;
        let state = entry.read().await;
        Some(state.clone())
    }

    /// Snapshots of every task, newest first
    pub async fn list(&self) -> Vec<TaskState> {
        let entries: Vec<Entry> = self.tasks.read().await.values().cloned().collect();
        let mut states = Vec::with_capacity(entries.len());
        for entry in entries {
            states.push(entry.read().await.clone());
        }
        states.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        states
    }

    /// Number of registered tasks
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Whether the registry holds no tasks
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Apply a field-level mutation to one task and return the committed snapshot
    ///
    /// The mutation is rejected (and nothing is written) when it would:
    /// - change a task that is already `completed` or `error`
    /// - move the status backwards along the lifecycle
    /// - lower `progress` while the task is downloading
    ///
    /// `updated_at` is refreshed only when the snapshot actually changed.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for unknown ids, [`Error::InvalidTransition`] for rejected
    /// mutations.
    pub async fn update<F>(&self, id: TaskId, mutator: F) -> Result<TaskState>
    where
        F: FnOnce(&mut TaskState),
    {
        let entry = self
            .entry(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("task {}", id)))?;

        let mut current = entry.write().await;
        let mut next = current.clone();
        mutator(&mut next);
        next.id = current.id;
        next.created_at = current.created_at;

        next.progress = if next.progress.is_finite() {
            next.progress.clamp(0.0, 100.0)
        } else {
            current.progress
        };

        if next == *current {
            return Ok(next);
        }

        let rejected = current.status.is_terminal()
            || !current.status.can_transition_to(next.status)
            || (next.status != TaskStatus::Completed && !next.files.is_empty())
            || (current.status == TaskStatus::Downloading
                && next.status == TaskStatus::Downloading
                && next.progress < current.progress);
        if rejected {
            return Err(Error::InvalidTransition {
                id,
                from: current.status,
                to: next.status,
            });
        }

        next.updated_at = Utc::now();
        *current = next.clone();
        Ok(next)
    }

    /// Remove terminal tasks whose last update is older than `cutoff`
    ///
    /// Returns the evicted ids. Tasks that are still running are never evicted.
    pub async fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> Vec<TaskId> {
        let mut tasks = self.tasks.write().await;
        let mut expired = Vec::new();
        for (id, entry) in tasks.iter() {
            // try_read: an entry being written is by definition not stale
            if let Ok(state) = entry.try_read()
                && state.status.is_terminal()
                && state.updated_at < cutoff
            {
                expired.push(*id);
            }
        }
        for id in &expired {
            tasks.remove(id);
        }
        expired
    }

    async fn entry(&self, id: TaskId) -> Option<Entry> {
        self.tasks.read().await.get(&id).cloned()
    }
}
