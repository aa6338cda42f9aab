use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;

const CONFIG_FILE_NAME: &str = "config.yaml";
const LOCAL_CONFIG_FILE: &str = "ytscribe.yaml";
const APP_DIR_NAME: &str = "ytscribe";
const MAX_TTL_HOURS: u64 = 3650 * 24;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External extraction tool settings
    pub ytdlp: YtDlpConfig,

    /// Metadata cache settings
    pub cache: CacheConfig,

    /// Retry policy for yt-dlp invocations
    pub retry: RetryConfig,

    /// Download defaults
    pub downloads: DownloadsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YtDlpConfig {
    /// Binary name or path
    pub binary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache metadata lookups on disk
    pub enabled: bool,

    /// Cache directory (defaults to the user cache dir)
    pub dir: Option<PathBuf>,

    /// Entry lifetime in hours
    pub ttl_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per yt-dlp invocation
    pub max_attempts: u32,

    /// Base backoff delay in milliseconds
    pub base_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadsConfig {
    /// Target directory for video/audio downloads
    pub output_dir: Option<PathBuf>,

    /// Default video quality (`best`, `worst`, `720p`, ...)
    pub video_quality: String,

    /// Default audio codec for extraction
    pub audio_format: String,

    /// Default subtitle languages
    pub subtitle_languages: Vec<String>,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            ttl_hours: 24,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            video_quality: "best".to_string(),
            audio_format: "mp3".to_string(),
            subtitle_languages: vec!["en".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location (creating it if missing)
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file does not exist: {}", path.display());
                }
                path.to_path_buf()
            }
            None => Self::config_path()?,
        };

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            config.validate()?;
            tracing::debug!("Loaded configuration from {}", config_path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save(&config_path).await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.ytdlp.binary.trim().is_empty() {
            anyhow::bail!("ytdlp.binary must not be empty");
        }

        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }

        if self.cache.ttl_hours == 0 || self.cache.ttl_hours > MAX_TTL_HOURS {
            anyhow::bail!("cache.ttl_hours must be between 1 and {}", MAX_TTL_HOURS);
        }

        Ok(())
    }

    /// Directory holding cache entries
    pub fn cache_dir(&self) -> PathBuf {
        self.cache
            .dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|dir| dir.join(APP_DIR_NAME)))
            .unwrap_or_else(|| std::env::temp_dir().join(APP_DIR_NAME).join("cache"))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_hours.saturating_mul(60 * 60))
    }

    /// Directory receiving video and audio downloads
    pub fn download_dir(&self) -> PathBuf {
        self.downloads
            .output_dir
            .clone()
            .or_else(|| dirs::download_dir().map(|dir| dir.join(APP_DIR_NAME)))
            .unwrap_or_else(|| PathBuf::from("downloads"))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  yt-dlp binary: {}", self.ytdlp.binary);
        println!("  Cache enabled: {}", self.cache.enabled);
        println!("  Cache directory: {}", self.cache_dir().display());
        println!("  Cache TTL: {}h", self.cache.ttl_hours);
        println!(
            "  Retry: {} attempts, {}ms base delay",
            self.retry.max_attempts, self.retry.base_delay_ms
        );
        println!("  Download directory: {}", self.download_dir().display());
        println!("  Video quality: {}", self.downloads.video_quality);
        println!("  Audio format: {}", self.downloads.audio_format);
        println!(
            "  Subtitle languages: {}",
            self.downloads.subtitle_languages.join(", ")
        );
    }
}
