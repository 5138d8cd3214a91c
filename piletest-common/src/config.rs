//! Configuration loading for the pile test services
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (handled by the binary, passed in as overrides)
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Compiled defaults
//!
//! A missing or unreadable TOML file never stops startup; the service logs a
//! warning and continues with defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the HTTP bind address
pub const ENV_BIND_ADDRESS: &str = "PILETEST_BIND";

/// Environment variable overriding the OCR service base URL
pub const ENV_OCR_URL: &str = "PILETEST_OCR_URL";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Base URL of the OCR extraction service
    #[serde(default = "default_ocr_url")]
    pub ocr_url: String,

    /// Request timeout for extraction calls (seconds)
    #[serde(default = "default_ocr_timeout_secs")]
    pub ocr_timeout_secs: u64,

    /// Broadcast capacity of the report event bus
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            ocr_url: default_ocr_url(),
            ocr_timeout_secs: default_ocr_timeout_secs(),
            event_capacity: default_event_capacity(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:5730".to_string()
}

fn default_ocr_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_ocr_timeout_secs() -> u64 {
    120
}

fn default_event_capacity() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Apply environment variable overrides on top of file/default values
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(bind) = std::env::var(ENV_BIND_ADDRESS) {
            if !bind.trim().is_empty() {
                self.bind_address = bind.trim().to_string();
            }
        }
        if let Ok(url) = std::env::var(ENV_OCR_URL) {
            if !url.trim().is_empty() {
                self.ocr_url = url.trim().to_string();
            }
        }
        self
    }
}

/// Default configuration file location for the platform
///
/// `~/.config/piletest/config.toml` on Linux, the platform config dir elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("piletest").join("config.toml"))
}

/// Parse a TOML configuration file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Load configuration from `explicit` path or the platform default, falling
/// back to compiled defaults, then apply environment overrides
///
/// An explicitly requested file that cannot be read is an error; a missing
/// default file is not.
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let config = match explicit {
        Some(path) => {
            let config = read_toml_config(path)?;
            info!("Loaded configuration from {}", path.display());
            config
        }
        None => match default_config_path() {
            Some(path) if path.exists() => match read_toml_config(&path) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Ignoring unreadable config {}: {}", path.display(), e);
                    TomlConfig::default()
                }
            },
            _ => {
                info!("No configuration file found, using defaults");
                TomlConfig::default()
            }
        },
    };

    Ok(config.apply_env_overrides())
}
