//! Custom test assertions for integration tests

use anymusic_dl::{AudioConverter, Event, TaskId, TaskState, TaskStatus};
use std::time::Duration;

/// Result of waiting for a task to finish, observed through events
#[derive(Debug)]
pub enum WaitResult {
    /// Task completed with these files
    Completed(Vec<String>),
    /// Task failed with this message
    Failed(String),
    /// Timeout waiting for a terminal event
    Timeout,
    /// Channel closed unexpectedly
    ChannelClosed,
}

/// Wait for the `completed` or `failed` event of `id`
///
/// Subscribe before submitting, or the terminal event may already be gone.
pub async fn wait_for_event(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    id: TaskId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::Completed {
                    id: event_id,
                    files,
                    ..
                }) if event_id == id => return WaitResult::Completed(files),
                Ok(Event::Failed {
                    id: event_id,
                    error,
                    ..
                }) if event_id == id => return WaitResult::Failed(error),
                Ok(_) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Poll until the task reaches a terminal status, recording every snapshot seen
pub async fn poll_until_terminal(
    converter: &AudioConverter,
    id: TaskId,
    timeout: Duration,
) -> Vec<TaskState> {
    let mut seen = Vec::new();
    let polled = tokio::time::timeout(timeout, async {
        loop {
            let state = converter.poll(id).await.expect("task vanished while polling");
            let terminal = state.status.is_terminal();
            seen.push(state);
            if terminal {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "task {} did not finish within {:?}", id, timeout);
    seen
}

/// Assert that observed snapshots never move backwards
pub fn assert_monotonic(snapshots: &[TaskState]) {
    for pair in snapshots.windows(2) {
        let (before, after) = (&pair[0], &pair[1]);
        assert!(
            after.status.rank() >= before.status.rank(),
            "status regressed from {} to {}",
            before.status,
            after.status
        );
        if before.status == TaskStatus::Downloading && after.status == TaskStatus::Downloading {
            assert!(
                after.progress >= before.progress,
                "progress regressed from {} to {}",
                before.progress,
                after.progress
            );
        }
    }
}
