//! yt-dlp engine using the external yt-dlp binary

use super::parser::{OUTPUT_PREFIX, PROGRESS_PREFIX, classify_error, parse_line};
use super::{
    Engine, EngineCapabilities, EngineLine, EngineProgress, ExtractMode, ExtractOutput,
    ExtractRequest, ExtractedItem,
};
use crate::config::EngineConfig;
use crate::error::EngineError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Engine driving the external `yt-dlp` binary
///
/// yt-dlp resolves and downloads the media; transcoding is delegated by yt-dlp to
/// ffmpeg (`-x --audio-format`). Progress and final paths are read from stdout
/// through machine-readable templates, errors from stderr.
///
/// # Examples
///
/// ```no_run
/// use anymusic_dl::engine::{Engine, YtDlpEngine};
/// use std::path::PathBuf;
///
/// // Create with explicit path
/// let engine = YtDlpEngine::new(PathBuf::from("/usr/local/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let engine = YtDlpEngine::from_path().expect("yt-dlp not found in PATH");
/// assert_eq!(engine.name(), "yt-dlp");
/// ```
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    binary_path: PathBuf,
    ffmpeg_path: Option<PathBuf>,
    cookies_file: Option<PathBuf>,
}

impl YtDlpEngine {
    /// Create a new engine with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            ffmpeg_path: None,
            cookies_file: None,
        }
    }

    /// Attempt to find yt-dlp in PATH
    ///
    /// Returns `None` when no `yt-dlp` binary is found.
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Build an engine from configuration
    ///
    /// An explicit `ytdlp_path` wins; otherwise PATH is searched when
    /// `search_path` is enabled. Returns `None` when no binary is available.
    pub fn from_config(config: &EngineConfig) -> Option<Self> {
        let mut engine = match &config.ytdlp_path {
            Some(path) => Self::new(path.clone()),
            None if config.search_path => Self::from_path()?,
            None => return None,
        };
        engine.ffmpeg_path = config.ffmpeg_path.clone();
        engine.cookies_file = config.cookies_file.clone();
        Some(engine)
    }

    /// Path of the yt-dlp binary
    pub fn binary_path(&self) -> &PathBuf {
        &self.binary_path
    }

    /// Use a specific ffmpeg binary (or directory containing it)
    pub fn with_ffmpeg(mut self, path: PathBuf) -> Self {
        self.ffmpeg_path = Some(path);
        self
    }

    /// Hand a Netscape cookies file to yt-dlp when it exists
    pub fn with_cookies(mut self, path: PathBuf) -> Self {
        self.cookies_file = Some(path);
        self
    }

    /// Command line for one extraction
    pub(crate) fn build_args(&self, request: &ExtractRequest) -> Vec<OsString> {
        let progress_template = format!(
            "download:{PROGRESS_PREFIX} %(progress.status)s %(progress.downloaded_bytes)s \
             %(progress.total_bytes)s %(progress.total_bytes_estimate)s \
             %(info.playlist_index)s %(info.n_entries)s"
        );
        let print_template = format!(
            "after_move:{OUTPUT_PREFIX} %(.{{title,filepath,playlist_title}})j"
        );

        let mut args: Vec<OsString> = vec![
            "--newline".into(),
            "--progress".into(),
            "--no-simulate".into(),
            "--no-colors".into(),
            "--progress-template".into(),
            progress_template.into(),
            "--print".into(),
            print_template.into(),
            "-f".into(),
            "bestaudio/best".into(),
            "-x".into(),
            "--audio-format".into(),
            request.audio_format.clone().into(),
            "--audio-quality".into(),
            request.audio_quality.clone().into(),
            "-P".into(),
            request.output_dir.clone().into_os_string(),
            "-o".into(),
            request.output_template().into(),
        ];

        match request.mode {
            ExtractMode::Single => args.push("--no-playlist".into()),
            ExtractMode::Playlist => {
                args.push("--yes-playlist".into());
                args.push("--ignore-errors".into());
            }
        }

        if let Some(cookies) = &self.cookies_file
            && cookies.is_file()
        {
            args.push("--cookies".into());
            args.push(cookies.clone().into_os_string());
        }

        if let Some(ffmpeg) = &self.ffmpeg_path {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.clone().into_os_string());
        }

        args.push("--".into());
        args.push(request.url.clone().into());
        args
    }
}

#[async_trait]
impl Engine for YtDlpEngine {
    async fn extract(
        &self,
        request: &ExtractRequest,
        progress: mpsc::UnboundedSender<EngineProgress>,
    ) -> Result<ExtractOutput, EngineError> {
        let mut child = Command::new(&self.binary_path)
            .args(self.build_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Unknown(format!("Failed to execute yt-dlp: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Unknown("yt-dlp stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::Unknown("yt-dlp stderr not captured".into()))?;

        let read_stdout = async move {
            let mut items = Vec::new();
            let mut playlist_title = None;
            let mut errors = Vec::new();
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match parse_line(&line) {
                    EngineLine::Progress(event) => {
                        progress.send(event).ok();
                    }
                    EngineLine::Output {
                        title,
                        path,
                        playlist_title: parent,
                    } => {
                        if playlist_title.is_none() {
                            playlist_title = parent;
                        }
                        items.push(ExtractedItem { title, path });
                    }
                    EngineLine::Error(message) => errors.push(message),
                    EngineLine::Other => tracing::trace!(line = %line, "yt-dlp"),
                }
            }
            (items, playlist_title, errors)
        };

        let read_stderr = async move {
            let mut errors = Vec::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match parse_line(&line) {
                    EngineLine::Error(message) => errors.push(message),
                    _ => tracing::debug!(line = %line, "yt-dlp stderr"),
                }
            }
            errors
        };

        let ((items, playlist_title, mut errors), stderr_errors) =
            tokio::join!(read_stdout, read_stderr);
        errors.extend(stderr_errors);

        let status = child
            .wait()
            .await
            .map_err(|e| EngineError::Unknown(format!("Failed to wait for yt-dlp: {}", e)))?;

        match request.mode {
            ExtractMode::Single => {
                if !status.success() {
                    return Err(errors.last().map(|m| classify_error(m)).unwrap_or_else(
                        || EngineError::Unknown(format!("yt-dlp exited with {}", status)),
                    ));
                }
                let title = items
                    .first()
                    .map(|item| item.title.clone())
                    .unwrap_or_else(|| "Unknown".to_string());
                Ok(ExtractOutput {
                    title,
                    items,
                    skipped: Vec::new(),
                })
            }
            ExtractMode::Playlist => {
                if !status.success() && items.is_empty() && errors.is_empty() {
                    return Err(EngineError::Unknown(format!(
                        "yt-dlp exited with {}",
                        status
                    )));
                }
                Ok(ExtractOutput {
                    title: playlist_title.unwrap_or_else(|| "Unknown Playlist".to_string()),
                    items,
                    skipped: errors.iter().map(|m| classify_error(m)).collect(),
                })
            }
        }
    }

    fn capabilities(&self) -> EngineCapabilities {
        let can_transcode = match &self.ffmpeg_path {
            Some(path) => path.exists(),
            None => which::which("ffmpeg").is_ok(),
        };
        EngineCapabilities {
            can_extract: true,
            can_transcode,
        }
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
