//! Stand-in engine when yt-dlp is unavailable

use super::{Engine, EngineCapabilities, EngineProgress, ExtractOutput, ExtractRequest};
use crate::error::EngineError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Engine used when no yt-dlp binary is available or configured
///
/// Submissions are still accepted; every task ends in `error` with an
/// [`EngineError::Unknown`] that explains how to configure the binary.
///
/// # Examples
///
/// ```
/// use anymusic_dl::engine::{Engine, ExtractMode, ExtractRequest, UnavailableEngine};
/// use tokio::sync::mpsc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let engine = UnavailableEngine;
/// let (tx, _rx) = mpsc::unbounded_channel();
/// let request = ExtractRequest {
///     url: "https://example.com/watch?v=1".into(),
///     mode: ExtractMode::Single,
///     output_dir: "downloads".into(),
///     audio_format: "mp3".into(),
///     audio_quality: "192".into(),
/// };
/// assert!(engine.extract(&request, tx).await.is_err());
/// # }
/// ```
pub struct UnavailableEngine;

#[async_trait]
impl Engine for UnavailableEngine {
    async fn extract(
        &self,
        _request: &ExtractRequest,
        _progress: mpsc::UnboundedSender<EngineProgress>,
    ) -> Result<ExtractOutput, EngineError> {
        Err(EngineError::Unknown(
            "Extraction requires the external yt-dlp binary. \
             Configure engine.ytdlp_path in config or ensure yt-dlp is in PATH."
                .into(),
        ))
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            can_extract: false,
            can_transcode: false,
        }
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}
