//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files, with
//! environment variable overrides.
//!
//! Resolution order (later wins):
//! 1. Built-in defaults
//! 2. TOML file (`METER_BRIDGE_CONFIG`, default `config/default.toml`), if present
//! 3. Environment: `MONGO_URI`, `DB_NAME`, `COLLECTION_NAME`, `PORT_NAME`, `BAUD_RATE`

use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::{MeterBridgeError, Result};
use crate::ingest::frame::DEFAULT_DELIMITER;
use crate::ingest::timestamp::{parse_timezone, DEFAULT_TIMEZONE};
use crate::serial::{DEFAULT_BAUD_RATE, DEFAULT_PORT};

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "METER_BRIDGE_CONFIG";

/// Config file used when `METER_BRIDGE_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

const ENV_MONGO_URI: &str = "MONGO_URI";
const ENV_DB_NAME: &str = "DB_NAME";
const ENV_COLLECTION_NAME: &str = "COLLECTION_NAME";
const ENV_PORT_NAME: &str = "PORT_NAME";
const ENV_BAUD_RATE: &str = "BAUD_RATE";

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub timestamp: TimestampConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Frame terminator, exactly one byte
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

/// Document store configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub uri: String,

    #[serde(default)]
    pub database: String,

    #[serde(default)]
    pub collection: String,
}

/// Timestamp configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TimestampConfig {
    /// IANA timezone used for the `date` and `time` fields
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rotated log files; console only when unset
    #[serde(default)]
    pub dir: Option<String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            delimiter: default_delimiter(),
        }
    }
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self { timezone: default_timezone() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), dir: None }
    }
}

// Default value functions
fn default_serial_port() -> String { DEFAULT_PORT.to_string() }
fn default_baud_rate() -> u32 { DEFAULT_BAUD_RATE }
fn default_delimiter() -> String { (DEFAULT_DELIMITER as char).to_string() }
fn default_timezone() -> String { DEFAULT_TIMEZONE.to_string() }
fn default_log_level() -> String { "info".to_string() }

impl SerialConfig {
    /// The frame delimiter as a byte
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(DEFAULT_DELIMITER)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    ///
    /// Values are not validated here; [`Config::resolve`] validates after
    /// environment overrides are applied.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use meter_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// config.validate()?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Build the runtime configuration: file (if present), then environment
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn resolve<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            warn!("Config file {} not found, using defaults", path.display());
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (normally the process environment)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup(ENV_MONGO_URI) {
            self.store.uri = uri;
        }
        if let Some(database) = lookup(ENV_DB_NAME) {
            self.store.database = database;
        }
        if let Some(collection) = lookup(ENV_COLLECTION_NAME) {
            self.store.collection = collection;
        }
        if let Some(port) = lookup(ENV_PORT_NAME) {
            self.serial.port = port;
        }
        if let Some(raw) = lookup(ENV_BAUD_RATE) {
            match raw.trim().parse::<u32>() {
                Ok(baud_rate) if baud_rate > 0 => self.serial.baud_rate = baud_rate,
                _ => warn!(
                    "Ignoring invalid {}={:?}, keeping {}",
                    ENV_BAUD_RATE, raw, self.serial.baud_rate
                ),
            }
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is missing or unusable
    pub fn validate(&self) -> Result<()> {
        // Store location is mandatory; nothing can be persisted without it
        if self.store.uri.trim().is_empty() {
            return Err(MeterBridgeError::InvalidConfig(
                "store uri is required (set MONGO_URI)".to_string(),
            ));
        }

        if self.store.database.trim().is_empty() {
            return Err(MeterBridgeError::InvalidConfig(
                "store database is required (set DB_NAME)".to_string(),
            ));
        }

        if self.store.collection.trim().is_empty() {
            return Err(MeterBridgeError::InvalidConfig(
                "store collection is required (set COLLECTION_NAME)".to_string(),
            ));
        }

        if self.serial.port.is_empty() {
            return Err(MeterBridgeError::InvalidConfig(
                "serial port cannot be empty".to_string(),
            ));
        }

        if self.serial.baud_rate == 0 {
            return Err(MeterBridgeError::InvalidConfig(
                "baud_rate must be greater than 0".to_string(),
            ));
        }

        if self.serial.delimiter.len() != 1 {
            return Err(MeterBridgeError::InvalidConfig(format!(
                "delimiter must be exactly one byte, got {:?}",
                self.serial.delimiter
            )));
        }

        parse_timezone(&self.timestamp.timezone)?;

        Ok(())
    }
}
