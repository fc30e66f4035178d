//! Extraction/transcode engine
//!
//! The engine resolves a source URL into media items, downloads the best available
//! audio and transcodes it into the configured codec. The converter only depends on
//! the [`Engine`] trait:
//!
//! - [`YtDlpEngine`]: drives the external `yt-dlp` binary (ffmpeg does the transcode)
//! - [`UnavailableEngine`]: stand-in when no yt-dlp binary is available; every
//!   extraction fails with a descriptive [`EngineError::Unknown`]
//!
//! Progress is delivered as typed [`EngineProgress`] values over an mpsc channel
//! rather than through callbacks, so the progress reporter can be tested without an
//! engine.

mod parser;
mod unavailable;
mod ytdlp;

pub use parser::{EngineLine, classify_error, parse_line};
pub use unavailable::UnavailableEngine;
pub use ytdlp::YtDlpEngine;

use crate::error::EngineError;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Which extraction path to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Resolve exactly one media item
    Single,
    /// Resolve every entry of a playlist, skipping entries that fail
    Playlist,
}

/// Parameters of one engine invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    /// Source URL
    pub url: String,
    /// Single item or playlist
    pub mode: ExtractMode,
    /// Download root; outputs are written below it
    pub output_dir: PathBuf,
    /// Target audio codec (e.g. "mp3")
    pub audio_format: String,
    /// Target audio quality (e.g. "192")
    pub audio_quality: String,
}

impl ExtractRequest {
    /// Output path template relative to `output_dir`
    ///
    /// Playlist entries are grouped in a directory named after the playlist.
    pub fn output_template(&self) -> &'static str {
        match self.mode {
            ExtractMode::Single => "%(title)s.%(ext)s",
            ExtractMode::Playlist => "%(playlist_title)s/%(title)s.%(ext)s",
        }
    }
}

/// Engine-reported sub-stage of a download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Raw media is being retrieved
    Downloading,
    /// Raw media fully retrieved; transcoding follows
    Finished,
}

/// Position of the current entry within a playlist (1-based index)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPosition {
    /// 1-based index of the entry being processed
    pub index: u32,
    /// Number of entries in the playlist
    pub count: u32,
}

/// Raw progress event emitted by an engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineProgress {
    /// Sub-stage
    pub phase: Phase,
    /// Bytes retrieved so far
    pub downloaded_bytes: Option<u64>,
    /// Total size in bytes (exact or estimated), if known
    pub total_bytes: Option<u64>,
    /// Playlist position, when the engine reports one
    pub entry: Option<EntryPosition>,
}

impl EngineProgress {
    /// A `downloading` event with byte counters
    pub fn downloading(downloaded_bytes: u64, total_bytes: Option<u64>) -> Self {
        Self {
            phase: Phase::Downloading,
            downloaded_bytes: Some(downloaded_bytes),
            total_bytes,
            entry: None,
        }
    }

    /// A `finished` event
    pub fn finished() -> Self {
        Self {
            phase: Phase::Finished,
            downloaded_bytes: None,
            total_bytes: None,
            entry: None,
        }
    }

    /// Attach a playlist position
    pub fn in_entry(mut self, index: u32, count: u32) -> Self {
        self.entry = Some(EntryPosition { index, count });
        self
    }
}

/// One produced audio file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedItem {
    /// Item title
    pub title: String,
    /// Absolute path of the transcoded file
    pub path: PathBuf,
}

/// Result metadata of a finished engine invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractOutput {
    /// Item title (single) or playlist title (playlist)
    pub title: String,
    /// Produced files, in engine order
    pub items: Vec<ExtractedItem>,
    /// Playlist entries that failed and were skipped
    pub skipped: Vec<EngineError>,
}

/// Capabilities of an engine implementation
#[derive(Debug, Clone, Copy)]
pub struct EngineCapabilities {
    /// Can resolve and download media
    pub can_extract: bool,
    /// Can transcode to the target codec (ffmpeg present)
    pub can_transcode: bool,
}

/// Trait for the extraction/transcode engine
///
/// # Examples
///
/// ```no_run
/// use anymusic_dl::engine::{Engine, ExtractMode, ExtractRequest, YtDlpEngine};
/// use tokio::sync::mpsc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = YtDlpEngine::from_path().expect("yt-dlp not found in PATH");
/// let (tx, mut rx) = mpsc::unbounded_channel();
/// tokio::spawn(async move {
///     while let Some(progress) = rx.recv().await {
///         println!("{:?}", progress);
///     }
/// });
///
/// let request = ExtractRequest {
///     url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
///     mode: ExtractMode::Single,
///     output_dir: "downloads".into(),
///     audio_format: "mp3".into(),
///     audio_quality: "192".into(),
/// };
/// let output = engine.extract(&request, tx).await?;
/// println!("{} -> {:?}", output.title, output.items);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Engine: Send + Sync {
    /// Resolve, download and transcode `request.url`
    ///
    /// Progress events are sent on `progress` zero or more times; the sender is
    /// dropped when the call returns.
    ///
    /// # Errors
    ///
    /// Single mode fails on any failure. Playlist mode fails only when the playlist
    /// itself cannot be processed; failing entries are reported in
    /// [`ExtractOutput::skipped`].
    async fn extract(
        &self,
        request: &ExtractRequest,
        progress: mpsc::UnboundedSender<EngineProgress>,
    ) -> Result<ExtractOutput, EngineError>;

    /// Query capabilities of this engine
    fn capabilities(&self) -> EngineCapabilities;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
