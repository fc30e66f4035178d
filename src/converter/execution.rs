//! Task execution: engine invocation, progress drain and terminal state.

use crate::engine::{ExtractMode, ExtractOutput, ExtractRequest};
use crate::error::EngineError;
use crate::progress::{ProgressReporterParams, spawn_progress_reporter};
use crate::types::{Event, Submission, TaskId};
use crate::utils::relative_output_name;
use tokio::sync::mpsc;

use super::AudioConverter;

/// Fallback title when the engine resolved none
const UNKNOWN_TITLE: &str = "Unknown";
/// Fallback title for a playlist the engine could not name
const UNKNOWN_PLAYLIST_TITLE: &str = "Unknown Playlist";

/// Successful result of a task, ready to be committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Completion {
    pub(crate) title: String,
    pub(crate) files: Vec<String>,
    pub(crate) skipped: Vec<String>,
}

impl AudioConverter {
    /// Run one task to its terminal state
    ///
    /// The engine runs in its own tokio task so that a panic inside it is reported
    /// as an unknown failure instead of leaving the task stuck. The progress reporter
    /// is drained before the terminal state is written.
    pub(crate) async fn run_task(&self, id: TaskId, submission: Submission) {
        let _permit = match &self.lifecycle.concurrent_limit {
            Some(limit) => match limit.clone().acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(_) => {
                    self.finish_task(
                        id,
                        Err(EngineError::Unknown("admission limit closed".into())),
                    )
                    .await;
                    return;
                }
            },
            None => None,
        };

        let mode = if submission.is_playlist {
            ExtractMode::Playlist
        } else {
            ExtractMode::Single
        };
        let request = ExtractRequest {
            url: submission.url,
            mode,
            output_dir: self.config.download_dir().clone(),
            audio_format: self.config.download.audio_format.clone(),
            audio_quality: self.config.download.audio_quality.clone(),
        };

        tracing::debug!(task_id = %id, engine = self.engine.name(), "Starting engine");

        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let reporter = spawn_progress_reporter(ProgressReporterParams {
            id,
            registry: self.registry.clone(),
            event_tx: self.event_tx.clone(),
            progress_rx,
        });

        let engine = self.engine.clone();
        let result = match tokio::spawn(async move { engine.extract(&request, progress_tx).await })
            .await
        {
            Ok(result) => result.and_then(|output| self.collect_output(mode, output)),
            Err(join_error) => Err(EngineError::Unknown(describe_join_error(join_error))),
        };

        if let Err(e) = reporter.await {
            tracing::warn!(task_id = %id, error = %e, "Progress reporter ended abnormally");
        }

        self.finish_task(id, result).await;
    }

    /// Turn engine output into a completion, applying the per-mode rules
    pub(crate) fn collect_output(
        &self,
        mode: ExtractMode,
        output: ExtractOutput,
    ) -> Result<Completion, EngineError> {
        let root = self.config.download_dir();
        let files: Vec<String> = output
            .items
            .iter()
            .map(|item| relative_output_name(root, &item.path))
            .collect();

        match mode {
            ExtractMode::Single => {
                let Some(file) = files.into_iter().next() else {
                    return Err(EngineError::Unknown(
                        "engine finished without producing an output file".into(),
                    ));
                };
                let title = non_empty(output.title)
                    .or_else(|| output.items.first().and_then(|i| non_empty(i.title.clone())))
                    .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
                Ok(Completion {
                    title,
                    files: vec![file],
                    skipped: Vec::new(),
                })
            }
            ExtractMode::Playlist => {
                if let Some(fatal) = output.skipped.iter().find(|e| !e.is_skippable()) {
                    return Err(fatal.clone());
                }
                if files.is_empty()
                    && let Some(first) = output.skipped.first()
                {
                    return Err(first.clone());
                }
                Ok(Completion {
                    title: non_empty(output.title)
                        .unwrap_or_else(|| UNKNOWN_PLAYLIST_TITLE.to_string()),
                    files,
                    skipped: output.skipped.iter().map(ToString::to_string).collect(),
                })
            }
        }
    }

    /// Commit the terminal state and announce it
    async fn finish_task(&self, id: TaskId, result: Result<Completion, EngineError>) {
        match result {
            Ok(completion) => {
                let Completion {
                    title,
                    files,
                    skipped,
                } = completion;
                let committed = self
                    .registry
                    .update(id, |state| {
                        state.complete(title.clone(), files.clone(), skipped.clone())
                    })
                    .await;
                match committed {
                    Ok(_) => {
                        tracing::info!(
                            task_id = %id,
                            title = %title,
                            files = files.len(),
                            skipped = skipped.len(),
                            "Task completed"
                        );
                        self.emit_event(Event::Completed { id, title, files });
                    }
                    Err(e) => {
                        tracing::error!(task_id = %id, error = %e, "Failed to record completion");
                    }
                }
            }
            Err(error) => {
                let committed = self.registry.update(id, |state| state.fail(&error)).await;
                match committed {
                    Ok(_) => {
                        tracing::warn!(
                            task_id = %id,
                            kind = ?error.kind(),
                            error = %error,
                            "Task failed"
                        );
                        self.emit_event(Event::Failed {
                            id,
                            error: error.to_string(),
                            kind: error.kind(),
                        });
                    }
                    Err(e) => {
                        tracing::error!(task_id = %id, error = %e, "Failed to record failure");
                    }
                }
            }
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn describe_join_error(error: tokio::task::JoinError) -> String {
    if !error.is_panic() {
        return format!("engine task ended unexpectedly: {}", error);
    }
    let payload = error.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("engine panicked: {}", message)
}
