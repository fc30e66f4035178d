//! Progress reporting
//!
//! Engine progress events are translated into task state mutations by [`apply`], a
//! pure function over [`TaskState`]. The reporter task spawned by
//! [`spawn_progress_reporter`] drains one task's engine channel, applies each event
//! through [`TaskRegistry::update`] and broadcasts a [`Event::Progress`] whenever the
//! snapshot changed.

use crate::engine::{EngineProgress, Phase};
use crate::registry::TaskRegistry;
use crate::types::{Event, TaskId, TaskState, TaskStatus};
use tokio::sync::{broadcast, mpsc};

/// Apply one engine progress event to a task state
///
/// Returns whether the state changed. Events never move a task backwards:
///
/// - `downloading` sets the status to `downloading` and, when the total size is known
///   and non-zero, raises `progress` to `downloaded / total * 100`. Inside a playlist
///   the fraction is scaled to the entry's slice of the whole. Once `converting`,
///   further `downloading` events are ignored.
/// - `finished` for a playlist entry that is not the last one advances `progress` to
///   the end of that entry's slice.
/// - `finished` otherwise moves the task to `converting`; repeating it is a no-op.
///
/// Terminal states are never touched.
pub fn apply(state: &mut TaskState, event: &EngineProgress) -> bool {
    if state.status.is_terminal() {
        return false;
    }

    match event.phase {
        Phase::Downloading => {
            if state.status == TaskStatus::Converting {
                return false;
            }
            let mut changed = set_status(state, TaskStatus::Downloading);
            if let Some(fraction) = fraction(event) {
                let percent = match event.entry {
                    Some(entry) => {
                        (f64::from(entry.index - 1) + fraction) / f64::from(entry.count) * 100.0
                    }
                    None => fraction * 100.0,
                };
                changed |= raise_progress(state, percent);
            }
            changed
        }
        Phase::Finished => match event.entry {
            Some(entry) if entry.index < entry.count => {
                if state.status == TaskStatus::Converting {
                    return false;
                }
                let percent = f64::from(entry.index) / f64::from(entry.count) * 100.0;
                set_status(state, TaskStatus::Downloading) | raise_progress(state, percent)
            }
            _ => set_status(state, TaskStatus::Converting),
        },
    }
}

/// Downloaded fraction in `[0, 1]`, or `None` when the total is unknown or zero
fn fraction(event: &EngineProgress) -> Option<f64> {
    let total = event.total_bytes.filter(|t| *t > 0)?;
    let downloaded = event.downloaded_bytes?;
    let fraction = downloaded as f64 / total as f64;
    fraction.is_finite().then(|| fraction.clamp(0.0, 1.0))
}

fn set_status(state: &mut TaskState, status: TaskStatus) -> bool {
    if state.status.rank() >= status.rank() {
        return false;
    }
    state.status = status;
    true
}

fn raise_progress(state: &mut TaskState, percent: f64) -> bool {
    let percent = percent.clamp(0.0, 100.0) as f32;
    if percent > state.progress {
        state.progress = percent;
        true
    } else {
        false
    }
}

/// Parameters for spawning a progress reporter background task
pub(crate) struct ProgressReporterParams {
    /// Task the events belong to
    pub id: TaskId,
    /// Registry holding the task
    pub registry: TaskRegistry,
    /// Event broadcast sender
    pub event_tx: broadcast::Sender<Event>,
    /// Engine progress channel; the task ends when every sender is dropped
    pub progress_rx: mpsc::UnboundedReceiver<EngineProgress>,
}

/// Spawn a background task that applies engine progress to the registry
///
/// The returned handle completes once the engine side of the channel is closed and
/// every queued event has been applied.
pub(crate) fn spawn_progress_reporter(
    params: ProgressReporterParams,
) -> tokio::task::JoinHandle<()> {
    let ProgressReporterParams {
        id,
        registry,
        event_tx,
        mut progress_rx,
    } = params;
    tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            let mut changed = false;
            let result = registry
                .update(id, |state| changed = apply(state, &event))
                .await;
            match result {
                Ok(state) if changed => {
                    event_tx
                        .send(Event::Progress {
                            id,
                            status: state.status,
                            percent: state.progress,
                        })
                        .ok();
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(task_id = %id, error = %e, "Dropped progress event");
                }
            }
        }
    })
}
