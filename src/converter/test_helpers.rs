//! Shared test helpers: a scripted engine and converter constructors.

use crate::config::Config;
use crate::converter::AudioConverter;
use crate::engine::{
    Engine, EngineCapabilities, EngineProgress, ExtractOutput, ExtractRequest, ExtractedItem,
};
use crate::error::EngineError;
use crate::types::{TaskId, TaskState};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::{Notify, mpsc};

/// What a scripted engine does once its progress script has been sent
pub(crate) enum Outcome {
    /// Write the given files (relative to the download root) and succeed
    Files {
        title: String,
        files: Vec<(String, String)>,
        skipped: Vec<EngineError>,
    },
    /// Fail with the given error
    Fail(EngineError),
    /// Panic with the given message
    Panic(&'static str),
}

/// Engine double that replays a fixed script
pub(crate) struct ScriptedEngine {
    progress: Vec<EngineProgress>,
    step_delay: Duration,
    gate: Option<Arc<Notify>>,
    outcome: Outcome,
}

impl ScriptedEngine {
    pub(crate) fn new(outcome: Outcome) -> Self {
        Self {
            progress: Vec::new(),
            step_delay: Duration::ZERO,
            gate: None,
            outcome,
        }
    }

    /// Single item producing `<title>.mp3`
    pub(crate) fn single(title: &str) -> Self {
        Self::new(Outcome::Files {
            title: title.to_string(),
            files: vec![(title.to_string(), format!("{}.mp3", title))],
            skipped: Vec::new(),
        })
    }

    pub(crate) fn failing(error: EngineError) -> Self {
        Self::new(Outcome::Fail(error))
    }

    pub(crate) fn with_progress(mut self, progress: Vec<EngineProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub(crate) fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Block inside `extract` until the returned handle is notified
    pub(crate) fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    async fn extract(
        &self,
        request: &ExtractRequest,
        progress: mpsc::UnboundedSender<EngineProgress>,
    ) -> Result<ExtractOutput, EngineError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        for event in &self.progress {
            let _ = progress.send(*event);
            if !self.step_delay.is_zero() {
                tokio::time::sleep(self.step_delay).await;
            }
        }

        match &self.outcome {
            Outcome::Files {
                title,
                files,
                skipped,
            } => {
                let mut items = Vec::new();
                for (item_title, relative) in files {
                    let path = request.output_dir.join(relative);
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent).unwrap();
                    }
                    std::fs::write(&path, b"ID3 scripted audio").unwrap();
                    items.push(ExtractedItem {
                        title: item_title.clone(),
                        path,
                    });
                }
                Ok(ExtractOutput {
                    title: title.clone(),
                    items,
                    skipped: skipped.clone(),
                })
            }
            Outcome::Fail(error) => Err(error.clone()),
            Outcome::Panic(message) => panic!("{}", message),
        }
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            can_extract: true,
            can_transcode: true,
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Create a converter around `engine` with a temporary download root.
/// Returns the converter and the tempdir (which must be kept alive).
pub(crate) async fn create_test_converter(
    engine: ScriptedEngine,
) -> (AudioConverter, tempfile::TempDir) {
    create_test_converter_with(engine, |_| {}).await
}

/// Like [`create_test_converter`], with a hook to adjust the configuration
pub(crate) async fn create_test_converter_with(
    engine: ScriptedEngine,
    configure: impl FnOnce(&mut Config),
) -> (AudioConverter, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    configure(&mut config);

    let converter = AudioConverter::with_engine(config, Arc::new(engine))
        .await
        .unwrap();
    (converter, temp_dir)
}

/// Poll until the task reaches `completed` or `error`
pub(crate) async fn wait_for_terminal(converter: &AudioConverter, id: TaskId) -> TaskState {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(state) = converter.poll(id).await
                && state.status.is_terminal()
            {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("task did not reach a terminal state in time")
}
