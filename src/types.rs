//! Core types for anymusic-dl

use crate::error::{EngineError, FailureKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a conversion task
///
/// Randomly generated (UUID v4) at submission time and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, format = Uuid)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Allocate a fresh random identifier
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for TaskId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Task status
///
/// ```text
/// starting -> downloading -> converting -> completed
///     \            \              \
///      `------------`--------------`----> error
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created, engine not yet started
    Starting,
    /// Raw media is being downloaded
    Downloading,
    /// Raw media retrieved, transcoding to the target codec
    Converting,
    /// Output files exist under the download root
    Completed,
    /// The engine failed
    Error,
}

impl TaskStatus {
    /// Position along the lifecycle; transitions never decrease it
    pub fn rank(self) -> u8 {
        match self {
            TaskStatus::Starting => 0,
            TaskStatus::Downloading => 1,
            TaskStatus::Converting => 2,
            TaskStatus::Completed | TaskStatus::Error => 3,
        }
    }

    /// Whether the status is final
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }

    /// Whether a task in this status may move to `next`
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        if self.is_terminal() {
            return self == next;
        }
        next.rank() >= self.rank()
    }

    /// Lowercase name, as serialized
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Starting => "starting",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Converting => "converting",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Submission {
    /// Source URL (single item or playlist)
    pub url: String,
    /// Resolve the URL as a playlist
    #[serde(default)]
    pub is_playlist: bool,
}

/// Snapshot of a task's state, as returned by polling
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaskState {
    /// Task identifier
    pub id: TaskId,
    /// Submitted URL
    pub url: String,
    /// Whether the task runs the playlist path
    pub is_playlist: bool,
    /// Current status
    pub status: TaskStatus,
    /// Progress percentage (0.0 to 100.0)
    pub progress: f32,
    /// Output file names relative to the download root (populated on completion)
    pub files: Vec<String>,
    /// Resolved item or playlist title
    pub title: String,
    /// Failure description (only when status is `error`)
    pub error: Option<String>,
    /// Failure category (only when status is `error`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    /// Playlist entries that failed and were skipped
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
    /// When the task was submitted
    pub created_at: DateTime<Utc>,
    /// When the task state last changed
    pub updated_at: DateTime<Utc>,
}

impl TaskState {
    /// Initial state inserted at submission
    pub fn new(id: TaskId, submission: &Submission) -> Self {
        let now = Utc::now();
        Self {
            id,
            url: submission.url.clone(),
            is_playlist: submission.is_playlist,
            status: TaskStatus::Starting,
            progress: 0.0,
            files: Vec::new(),
            title: String::new(),
            error: None,
            error_kind: None,
            skipped: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition into `completed`
    pub fn complete(&mut self, title: String, files: Vec<String>, skipped: Vec<String>) {
        self.status = TaskStatus::Completed;
        self.progress = 100.0;
        self.title = title;
        self.files = files;
        self.skipped = skipped;
    }

    /// Transition into `error`
    pub fn fail(&mut self, error: &EngineError) {
        self.status = TaskStatus::Error;
        self.error = Some(error.to_string());
        self.error_kind = Some(error.kind());
    }
}

/// Event emitted during the task lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task accepted and registered
    Submitted {
        /// Task ID
        id: TaskId,
        /// Submitted URL
        url: String,
        /// Playlist path requested
        is_playlist: bool,
    },

    /// Status or progress changed while the engine runs
    Progress {
        /// Task ID
        id: TaskId,
        /// Current status
        status: TaskStatus,
        /// Progress percentage (0.0 to 100.0)
        percent: f32,
    },

    /// Task completed
    Completed {
        /// Task ID
        id: TaskId,
        /// Item or playlist title
        title: String,
        /// Produced files, relative to the download root
        files: Vec<String>,
    },

    /// Task failed
    Failed {
        /// Task ID
        id: TaskId,
        /// Failure description
        error: String,
        /// Failure category
        kind: FailureKind,
    },

    /// Converter is shutting down
    Shutdown,
}

impl Event {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            Event::Submitted { .. } => "submitted",
            Event::Progress { .. } => "progress",
            Event::Completed { .. } => "completed",
            Event::Failed { .. } => "failed",
            Event::Shutdown => "shutdown",
        }
    }
}

/// System capabilities information
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Capabilities {
    /// Name of the active engine implementation
    pub engine: String,
    /// Whether media can be extracted at all
    pub can_extract: bool,
    /// Whether an ffmpeg binary is available for transcoding
    pub can_transcode: bool,
    /// Target audio codec
    pub audio_format: String,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ids_are_unique() {
        let a = TaskId::new();
        let b = TaskId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn task_id_round_trips_through_string() {
        let id = TaskId::new();
        let parsed: TaskId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<TaskId>().is_err());
    }

    #[test]
    fn task_id_serializes_as_plain_string() {
        let id = TaskId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }

    #[test]
    fn transitions_move_forward_only() {
        use TaskStatus::*;
        assert!(Starting.can_transition_to(Downloading));
        assert!(Starting.can_transition_to(Converting));
        assert!(Starting.can_transition_to(Error));
        assert!(Downloading.can_transition_to(Downloading));
        assert!(Downloading.can_transition_to(Completed));
        assert!(Converting.can_transition_to(Error));
        assert!(!Converting.can_transition_to(Downloading));
        assert!(!Downloading.can_transition_to(Starting));
    }

    #[test]
    fn terminal_states_are_frozen() {
        use TaskStatus::*;
        assert!(!Completed.can_transition_to(Error));
        assert!(!Error.can_transition_to(Completed));
        assert!(!Error.can_transition_to(Downloading));
        assert!(Completed.can_transition_to(Completed));
        assert!(Completed.is_terminal());
        assert!(Error.is_terminal());
        assert!(!Converting.is_terminal());
    }

    #[test]
    fn new_state_matches_initial_contract() {
        let id = TaskId::new();
        let state = TaskState::new(
            id,
            &Submission {
                url: "https://example.com/watch?v=1".into(),
                is_playlist: false,
            },
        );
        assert_eq!(state.status, TaskStatus::Starting);
        assert_eq!(state.progress, 0.0);
        assert!(state.files.is_empty());
        assert!(state.title.is_empty());
        assert!(state.error.is_none());
    }

    #[test]
    fn state_json_keeps_original_field_names() {
        let state = TaskState::new(
            TaskId::new(),
            &Submission {
                url: "https://example.com/list".into(),
                is_playlist: true,
            },
        );
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["status"], "starting");
        assert_eq!(json["progress"], 0.0);
        assert_eq!(json["files"], serde_json::json!([]));
        assert_eq!(json["title"], "");
        assert!(json["error"].is_null());
        assert!(json.get("error_kind").is_none());
        assert!(json.get("skipped").is_none());
    }

    #[test]
    fn fail_records_message_and_kind() {
        let mut state = TaskState::new(
            TaskId::new(),
            &Submission {
                url: "https://example.com/x".into(),
                is_playlist: false,
            },
        );
        state.fail(&EngineError::Transcode("ffprobe and ffmpeg not found".into()));
        assert_eq!(state.status, TaskStatus::Error);
        assert_eq!(state.error.as_deref(), Some("ffprobe and ffmpeg not found"));
        assert_eq!(state.error_kind, Some(FailureKind::TranscodeFailure));
    }

    #[test]
    fn event_names_match_serde_tags() {
        let event = Event::Progress {
            id: TaskId::new(),
            status: TaskStatus::Downloading,
            percent: 12.5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.name());
        assert_eq!(Event::Shutdown.name(), "shutdown");
    }
}
