//! Parser for yt-dlp output
//!
//! yt-dlp is invoked with a progress template and a print template that produce
//! machine-readable lines on stdout:
//!
//! ```text
//! [progress] downloading 1048576 4194304 NA 2 5
//! [progress] finished 4194304 4194304 NA 2 5
//! [output] {"title": "Song", "filepath": "/srv/dl/List/Song.mp3", "playlist_title": "List"}
//! ```
//!
//! Failures are reported on stderr as `ERROR: ...` lines.

use super::{EngineProgress, EntryPosition, Phase};
use crate::error::EngineError;
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Prefix of progress lines, as set in the progress template
pub(crate) const PROGRESS_PREFIX: &str = "[progress]";

/// Prefix of per-item result lines, as set in the print template
pub(crate) const OUTPUT_PREFIX: &str = "[output]";

const ERROR_PREFIX: &str = "ERROR:";

static HTTP_ERROR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"HTTP Error (\d{3})").ok());

/// One classified line of engine output
#[derive(Debug, Clone, PartialEq)]
pub enum EngineLine {
    /// Progress report
    Progress(EngineProgress),
    /// A finished, transcoded item
    Output {
        /// Item title
        title: String,
        /// Final path of the transcoded file
        path: PathBuf,
        /// Title of the enclosing playlist, if any
        playlist_title: Option<String>,
    },
    /// An `ERROR:` line (message without the prefix)
    Error(String),
    /// Anything else
    Other,
}

#[derive(Deserialize)]
struct OutputRecord {
    title: Option<String>,
    filepath: Option<String>,
    playlist_title: Option<String>,
}

/// Classify a single line of yt-dlp stdout or stderr
pub fn parse_line(line: &str) -> EngineLine {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(PROGRESS_PREFIX) {
        return parse_progress(rest).map_or(EngineLine::Other, EngineLine::Progress);
    }

    if let Some(rest) = line.strip_prefix(OUTPUT_PREFIX) {
        let Ok(record) = serde_json::from_str::<OutputRecord>(rest.trim()) else {
            return EngineLine::Other;
        };
        let Some(filepath) = record.filepath.filter(|p| !p.is_empty()) else {
            return EngineLine::Other;
        };
        return EngineLine::Output {
            title: record
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            path: PathBuf::from(filepath),
            playlist_title: record.playlist_title.filter(|t| !t.is_empty()),
        };
    }

    if let Some(rest) = line.strip_prefix(ERROR_PREFIX) {
        return EngineLine::Error(rest.trim().to_string());
    }

    EngineLine::Other
}

fn parse_progress(fields: &str) -> Option<EngineProgress> {
    let mut fields = fields.split_whitespace();

    let phase = match fields.next()? {
        "downloading" => Phase::Downloading,
        "finished" => Phase::Finished,
        _ => return None,
    };
    let downloaded_bytes = fields.next().and_then(parse_bytes);
    let total_bytes = fields.next().and_then(parse_bytes);
    let total_estimate = fields.next().and_then(parse_bytes);
    let index = fields.next().and_then(|f| f.parse::<u32>().ok());
    let count = fields.next().and_then(|f| f.parse::<u32>().ok());

    let entry = match (index, count) {
        (Some(index), Some(count)) if index >= 1 && count >= 1 && index <= count => {
            Some(EntryPosition { index, count })
        }
        _ => None,
    };

    Some(EngineProgress {
        phase,
        downloaded_bytes,
        total_bytes: total_bytes.filter(|t| *t > 0).or(total_estimate),
        entry,
    })
}

/// Byte counters may be integers, floats (estimates) or `NA`
fn parse_bytes(field: &str) -> Option<u64> {
    let value = field.parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value as u64)
}

/// Map an engine error message onto the failure taxonomy
///
/// Checked in order: transcode problems (ffmpeg/post-processing), failures while
/// media data was already being fetched, HTTP status codes (4xx means the media
/// cannot be accessed), resolution problems, then transfer problems (network).
/// Everything else is [`EngineError::Unknown`].
pub fn classify_error(message: &str) -> EngineError {
    let message = message
        .trim()
        .strip_prefix(ERROR_PREFIX)
        .unwrap_or(message.trim())
        .trim()
        .to_string();
    let lower = message.to_lowercase();

    const TRANSCODE: &[&str] = &[
        "postprocessing",
        "ffmpeg",
        "ffprobe",
        "audio conversion failed",
        "extractaudio",
        "conversion failed",
    ];
    const RESOLUTION: &[&str] = &[
        "unsupported url",
        "is not a valid url",
        "video unavailable",
        "private video",
        "has been removed",
        "does not exist",
        "not available",
        "unable to extract",
        "no video formats found",
        "requested format is not available",
        "sign in to confirm",
        "members-only",
        "this video is",
        "no such playlist",
    ];
    // raised once media data is being fetched, whatever the status code
    const MID_TRANSFER: &[&str] = &["unable to download video data", "got error:"];
    const TRANSFER: &[&str] = &[
        "unable to download",
        "connection",
        "timed out",
        "network",
        "name or service not known",
        "temporary failure in name resolution",
        "ssl",
        "errno",
        "fragment",
        "incomplete",
    ];

    if TRANSCODE.iter().any(|p| lower.contains(p)) {
        return EngineError::Transcode(message);
    }

    if MID_TRANSFER.iter().any(|p| lower.contains(p)) {
        return EngineError::Transfer(message);
    }

    if let Some(status) = HTTP_ERROR
        .as_ref()
        .and_then(|re| re.captures(&message))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u16>().ok())
    {
        return if (400..500).contains(&status) {
            EngineError::Resolution(message)
        } else {
            EngineError::Transfer(message)
        };
    }

    if RESOLUTION.iter().any(|p| lower.contains(p)) {
        return EngineError::Resolution(message);
    }

    if TRANSFER.iter().any(|p| lower.contains(p)) {
        return EngineError::Transfer(message);
    }

    EngineError::Unknown(message)
}
