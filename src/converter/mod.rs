//! Core converter implementation split into focused submodules.
//!
//! The `AudioConverter` struct and its methods are organized by domain:
//! - [`submit`] - Submission validation, task creation and polling
//! - [`execution`] - Running one task through the engine and recording its outcome
//! - [`lifecycle`] - Graceful shutdown
//! - [`retention`] - Eviction of finished tasks

mod execution;
mod lifecycle;
mod retention;
mod submit;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::engine::{Engine, UnavailableEngine, YtDlpEngine};
use crate::error::{Error, Result};
use crate::registry::TaskRegistry;
use crate::types::{Capabilities, Event};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{Semaphore, broadcast};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Admission and background task bookkeeping
#[derive(Clone)]
pub(crate) struct LifecycleState {
    /// Whether new submissions are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Limit on tasks running the engine at once (None = unbounded)
    pub(crate) concurrent_limit: Option<Arc<Semaphore>>,
    /// Tracks every spawned task so shutdown can wait for them
    pub(crate) tracker: TaskTracker,
    /// Cancelled on shutdown to stop background services
    pub(crate) shutdown_token: CancellationToken,
}

/// Main converter instance (cloneable - all fields are Arc-wrapped)
///
/// Accepts URL submissions, runs each one as an independent background task and
/// exposes the per-task state for polling.
#[derive(Clone)]
pub struct AudioConverter {
    /// Per-task state shared between runners and pollers
    pub(crate) registry: TaskRegistry,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Extraction/transcode engine (trait object for pluggable implementations)
    pub(crate) engine: Arc<dyn Engine>,
    /// Admission and shutdown state
    pub(crate) lifecycle: LifecycleState,
}

impl AudioConverter {
    /// Create a new AudioConverter instance
    ///
    /// Validates the configuration, creates the download directory and selects the
    /// engine: an explicitly configured yt-dlp path, otherwise yt-dlp found in PATH
    /// (when `search_path` is enabled), otherwise [`UnavailableEngine`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use anymusic_dl::{AudioConverter, Config};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let converter = AudioConverter::new(Config::default()).await?;
    ///     let id = converter
    ///         .submit("https://www.youtube.com/watch?v=dQw4w9WgXcQ", false)
    ///         .await?;
    ///     println!("{:?}", converter.poll(id).await);
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: Config) -> Result<Self> {
        let engine: Arc<dyn Engine> = match YtDlpEngine::from_config(&config.engine) {
            Some(engine) => Arc::new(engine),
            None => {
                tracing::warn!(
                    "yt-dlp not found; submissions will fail until engine.ytdlp_path is configured"
                );
                Arc::new(UnavailableEngine)
            }
        };
        Self::with_engine(config, engine).await
    }

    /// Create a converter driven by a custom engine
    pub async fn with_engine(config: Config, engine: Arc<dyn Engine>) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(config.download_dir())
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download_dir().display(),
                        e
                    ),
                ))
            })?;

        let engine_caps = engine.capabilities();
        tracing::info!(
            engine = engine.name(),
            can_extract = engine_caps.can_extract,
            can_transcode = engine_caps.can_transcode,
            "Engine initialized"
        );

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let lifecycle = LifecycleState {
            accepting_new: Arc::new(AtomicBool::new(true)),
            concurrent_limit: config
                .download
                .max_concurrent_tasks
                .map(|limit| Arc::new(Semaphore::new(limit))),
            tracker: TaskTracker::new(),
            shutdown_token: CancellationToken::new(),
        };

        let converter = Self {
            registry: TaskRegistry::new(),
            event_tx,
            config: Arc::new(config),
            engine,
            lifecycle,
        };

        converter.spawn_retention_sweeper();

        Ok(converter)
    }

    /// Subscribe to task events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events
    /// independently; a subscriber that falls more than 1000 events behind receives
    /// `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Query the active engine's capabilities
    pub fn capabilities(&self) -> Capabilities {
        let caps = self.engine.capabilities();
        Capabilities {
            engine: self.engine.name().to_string(),
            can_extract: caps.can_extract,
            can_transcode: caps.can_transcode,
            audio_format: self.config.download.audio_format.clone(),
        }
    }

    /// Emit an event to all subscribers; dropped silently when nobody listens
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    ///
    /// Listens on the configured bind address (default: 127.0.0.1:5000).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let converter = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(converter, config).await })
    }
}
