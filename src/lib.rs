//! # anymusic-dl
//!
//! Asynchronous audio extraction service: submit a media URL (single item or
//! playlist), poll the task for progress, then fetch the produced audio files.
//!
//! ## Design Philosophy
//!
//! anymusic-dl is designed to be:
//! - **Non-blocking** - Submission returns a task id immediately; work runs in the background
//! - **Pluggable** - Extraction goes through the [`Engine`] trait, yt-dlp by default
//! - **Event-driven** - Consumers may subscribe to events instead of polling
//!
//! ## Quick Start
//!
//! ```no_run
//! use anymusic_dl::{AudioConverter, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = AudioConverter::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = converter.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let id = converter
//!         .submit("https://www.youtube.com/playlist?list=PL123", true)
//!         .await?;
//!     println!("Submitted {}", id);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Task orchestration (decomposed into focused submodules)
pub mod converter;
/// Media extraction engines
pub mod engine;
/// Error types
pub mod error;
/// Mapping of engine progress onto task state
pub mod progress;
/// Shared per-task state
pub mod registry;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{
    ApiConfig, Config, DownloadConfig, EngineConfig, RetentionConfig, ServerIntegrationConfig,
};
pub use converter::AudioConverter;
pub use engine::{
    Engine, EngineCapabilities, EngineProgress, ExtractMode, ExtractOutput, ExtractRequest,
    ExtractedItem, UnavailableEngine, YtDlpEngine,
};
pub use error::{ApiError, EngineError, Error, ErrorDetail, FailureKind, Result, ToHttpStatus};
pub use registry::TaskRegistry;
pub use types::{Capabilities, Event, Submission, TaskId, TaskState, TaskStatus};

/// Helper function to run the converter with graceful signal handling.
///
/// Waits for a termination signal and then calls the converter's `shutdown()` method,
/// which stops admission and waits for in-flight tasks.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use anymusic_dl::{AudioConverter, Config, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let converter = Arc::new(AudioConverter::new(Config::default()).await?);
///     converter.spawn_api_server();
///
///     // Run with automatic signal handling
///     run_with_shutdown(&converter).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(converter: &AudioConverter) -> Result<()> {
    wait_for_signal().await;
    converter.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
