//! Configuration management for panelcast.
//!
//! Configuration is read from `~/.config/panelcast/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! The bot token may be supplied through `PANELCAST_BOT_TOKEN` instead.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{SourceKind, SourceSeed};

/// Environment variable overriding `telegram.bot_token`.
pub const BOT_TOKEN_ENV: &str = "PANELCAST_BOT_TOKEN";

/// Browser user agent presented to catalog sites.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Telegram caption limit, in characters.
pub const DEFAULT_CAPTION_LIMIT: usize = 1024;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ledger location (default: `<data_dir>/panelcast/panelcast.db`)
    pub database: Option<PathBuf>,
    pub telegram: TelegramConfig,
    pub poll: PollConfig,
    pub sources: SourcesConfig,
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_url: String,
    /// Chats that receive every new comic.
    pub subscribers: Vec<i64>,
    /// Chat that receives error reports.
    pub operator_id: Option<i64>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_url: "https://api.telegram.org".to_string(),
            subscribers: Vec::new(),
            operator_id: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Sleep between cycles (default: 300)
    pub interval_secs: u64,
    /// Per-request timeout for every outbound HTTP call (default: 30)
    pub http_timeout_secs: u64,
    /// Upper bound for a whole catalog fetch or token refresh (default: 60)
    pub fetch_timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            http_timeout_secs: 30,
            fetch_timeout_secs: 60,
        }
    }
}

impl PollConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub bilibili_url: String,
    pub kuaikan_url: String,
    pub user_agent: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            bilibili_url: "https://manga.bilibili.com".to_string(),
            kuaikan_url: "https://www.kuaikanmanhua.com".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SourcesConfig {
    pub fn base_url(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::Bilibili => &self.bilibili_url,
            SourceKind::Kuaikan => &self.kuaikan_url,
        }
    }

    /// Bootstrap rows, in polling order.
    pub fn seeds(&self) -> Vec<SourceSeed> {
        SourceKind::ALL
            .into_iter()
            .map(|kind| SourceSeed::new(kind, self.base_url(kind)))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// JPEG quality for re-encoded covers, 1-100 (default: 60)
    pub jpeg_quality: u8,
    /// Maximum caption length in characters (default: 1024)
    pub caption_limit: usize,
    /// Directory owned exclusively by panelcast for transient cover files
    pub scratch_dir: Option<PathBuf>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 60,
            caption_limit: DEFAULT_CAPTION_LIMIT,
            scratch_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, with the same defaulting
    /// and environment override rules as [`Config::load`].
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
                path: config_path.to_path_buf(),
                source: e,
            })?;

            toml::from_str::<Config>(&content).map_err(|e| ConfigError::Parse {
                path: config_path.to_path_buf(),
                source: e,
            })?
        } else {
            Self::create_default_config(config_path)?;
            Self::default()
        };

        if let Ok(token) = std::env::var(BOT_TOKEN_ENV) {
            if !token.trim().is_empty() {
                config.telegram.bot_token = token.trim().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path: `~/.config/panelcast/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("panelcast").join("config.toml"))
    }

    /// Reject values no cycle could work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.delivery.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "delivery.jpeg_quality must be between 1 and 100, got {}",
                self.delivery.jpeg_quality
            )));
        }
        if self.delivery.caption_limit == 0 {
            return Err(ConfigError::Invalid(
                "delivery.caption_limit must be positive".into(),
            ));
        }
        if self.poll.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll.interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Database path, falling back to the platform data directory.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.database {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        Ok(data_dir.join("panelcast").join("panelcast.db"))
    }

    /// Scratch directory for cover files, falling back to the platform cache.
    pub fn scratch_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref dir) = self.delivery.scratch_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir().ok_or(ConfigError::NoDataDir)?;
        Ok(cache_dir.join("panelcast").join("covers"))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# panelcast configuration
#
# The bot token can also be provided through PANELCAST_BOT_TOKEN.

# Ledger location. Defaults to <data dir>/panelcast/panelcast.db
# database = "/var/lib/panelcast/panelcast.db"

[telegram]
bot_token = ""
api_url = "https://api.telegram.org"

# Chat ids that receive every newly discovered comic
subscribers = []

# Chat id that receives error reports
# operator_id = 0

[poll]
# Seconds to sleep between cycles
interval_secs = 300

# Timeout for a single HTTP request
http_timeout_secs = 30

# Timeout for a whole catalog fetch or token refresh
fetch_timeout_secs = 60

[sources]
bilibili_url = "https://manga.bilibili.com"
kuaikan_url = "https://www.kuaikanmanhua.com"
user_agent = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"

[delivery]
# Re-encoded cover quality (1-100)
jpeg_quality = 60

# Captions and fallback messages are cut to this many characters
caption_limit = 1024

# Directory owned by panelcast for transient cover files.
# Defaults to <cache dir>/panelcast/covers
# scratch_dir = "/var/cache/panelcast/covers"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
