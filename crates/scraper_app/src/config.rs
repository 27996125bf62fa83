//! JSON configuration with per-key defaults.
//!
//! Loading never aborts startup: a missing file yields the defaults, and an
//! unreadable or malformed one yields the defaults plus a warning.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::{engine_warn, parse_level_name};
use log::LevelFilter;
use scraper_engine::FetchConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

const DEFAULT_TIMEOUT_SECS: f64 = 10.0;
const DEFAULT_MAX_RETRIES: i64 = 3;
const DEFAULT_RETRY_DELAY_SECS: f64 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not write config file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub scraping: ScrapingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub file_path: PathBuf,
    pub console_output: bool,
    pub file_log_format: String,
    pub console_log_format: String,
    pub max_file_size_mb: u64,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file_path: PathBuf::from("logs/scraper.log"),
            console_output: true,
            file_log_format: "%(asctime)s - %(levelname)s - %(message)s".to_string(),
            console_log_format: "%(levelname)s - %(message)s".to_string(),
            max_file_size_mb: 10,
        }
    }
}

impl LoggingSettings {
    pub fn level_filter(&self) -> LevelFilter {
        parse_level_name(&self.level).unwrap_or(LevelFilter::Info)
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// `timeout` and `retry_delay` are seconds and may be fractional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingSettings {
    pub timeout: f64,
    pub max_retries: i64,
    pub retry_delay: f64,
}

impl Default for ScrapingSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY_SECS,
        }
    }
}

impl Settings {
    /// Loads `path`, falling back to defaults on any failure.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(settings) => settings,
            Err(err) => {
                engine_warn!("{}; using default configuration", err);
                Self::default()
            }
        }
    }

    /// Loads `path`. A missing file is not an error and yields the defaults.
    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let settings: Settings =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(settings.normalized())
    }

    /// Writes the settings as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        let write = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write)?;
        }
        fs::write(path, content + "\n").map_err(write)
    }

    pub fn fetch_config(&self) -> FetchConfig {
        let scraping = &self.scraping;
        FetchConfig::new(
            seconds(scraping.timeout, DEFAULT_TIMEOUT_SECS),
            u32::try_from(scraping.max_retries.max(1)).unwrap_or(u32::MAX),
            seconds(scraping.retry_delay, 0.0),
        )
    }

    fn normalized(mut self) -> Self {
        if parse_level_name(&self.logging.level).is_none() {
            engine_warn!("Unknown log level {:?}, using INFO", self.logging.level);
            self.logging.level = "INFO".to_string();
        }

        let scraping = &mut self.scraping;
        if scraping.max_retries < 1 {
            engine_warn!("max_retries must be at least 1, got {}", scraping.max_retries);
            scraping.max_retries = 1;
        }
        if !scraping.timeout.is_finite() || scraping.timeout <= 0.0 {
            engine_warn!("Invalid timeout {}, using {}", scraping.timeout, DEFAULT_TIMEOUT_SECS);
            scraping.timeout = DEFAULT_TIMEOUT_SECS;
        }
        if !scraping.retry_delay.is_finite() || scraping.retry_delay < 0.0 {
            engine_warn!("Invalid retry_delay {}, using 0", scraping.retry_delay);
            scraping.retry_delay = 0.0;
        }
        self
    }
}

fn seconds(value: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(value)
        .or_else(|_| Duration::try_from_secs_f64(fallback))
        .unwrap_or_default()
}
