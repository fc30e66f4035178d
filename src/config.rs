//! Configuration types for anymusic-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Conversion behavior (output location, codec, admission)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Download root; every produced file lives below it (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Target audio codec passed to the engine (default: "mp3")
    #[serde(default = "default_audio_format")]
    pub audio_format: String,

    /// Target audio quality; a bitrate in kbps or an engine VBR level (default: "192")
    #[serde(default = "default_audio_quality")]
    pub audio_quality: String,

    /// Maximum number of tasks running the engine at once (None = unbounded)
    ///
    /// Tasks waiting for admission stay in `starting`.
    #[serde(default)]
    pub max_concurrent_tasks: Option<usize>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            audio_format: default_audio_format(),
            audio_quality: default_audio_quality(),
            max_concurrent_tasks: None,
        }
    }
}

/// External engine binaries and credentials
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EngineConfig {
    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to ffmpeg executable or its directory (auto-detected by yt-dlp if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Netscape-format cookies file handed to the engine when it exists
    #[serde(default)]
    pub cookies_file: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            cookies_file: None,
            search_path: true,
        }
    }
}

/// Retention of finished tasks in the registry
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetentionConfig {
    /// Evict completed/failed tasks this long after their last update (None = keep forever)
    #[serde(default, with = "optional_duration_serde")]
    #[schema(value_type = Option<u64>)]
    pub task_ttl: Option<Duration>,

    /// How often the sweeper runs when a TTL is set (default: 60 seconds)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub sweep_interval: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            task_ttl: None,
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:5000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Main configuration for AudioConverter
///
/// Fields are organized into sub-configs:
/// - [`download`](DownloadConfig) - download root, codec, admission limit
/// - [`engine`](EngineConfig) - yt-dlp/ffmpeg paths, cookies
/// - [`retention`](RetentionConfig) - eviction of finished tasks
/// - [`server`](ServerIntegrationConfig) - REST API
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Conversion behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// External engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Task retention policy
    #[serde(default)]
    pub retention: RetentionConfig,

    /// API settings
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Download root directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Load configuration from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the converter cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_tasks == Some(0) {
            return Err(Error::Config {
                message: "max_concurrent_tasks must be at least 1 (omit it for no limit)".into(),
                key: Some("max_concurrent_tasks".into()),
            });
        }
        if let Some(limit) = self.download.max_concurrent_tasks
            && limit > tokio::sync::Semaphore::MAX_PERMITS
        {
            return Err(Error::Config {
                message: format!(
                    "max_concurrent_tasks must not exceed {} (omit it for no limit)",
                    tokio::sync::Semaphore::MAX_PERMITS
                ),
                key: Some("max_concurrent_tasks".into()),
            });
        }
        if self.download.audio_format.trim().is_empty() {
            return Err(Error::Config {
                message: "audio_format must not be empty".into(),
                key: Some("audio_format".into()),
            });
        }
        if self.retention.sweep_interval.is_zero() {
            return Err(Error::Config {
                message: "sweep_interval must be greater than zero".into(),
                key: Some("sweep_interval".into()),
            });
        }
        Ok(())
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_audio_format() -> String {
    "mp3".to_string()
}

fn default_audio_quality() -> String {
    "192".to_string()
}

fn default_true() -> bool {
    true
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
