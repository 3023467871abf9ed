//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use chrono::Local;
use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{ReceiverError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub logger: LoggerConfig,

    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

/// Serial port and reconnect configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

/// CSV log and packet buffer configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggerConfig {
    #[serde(default = "default_log_filename")]
    pub filename: String,

    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    #[serde(default = "default_max_packets_per_sensor")]
    pub max_packets_per_sensor: usize,

    #[serde(default = "default_gc_interval_secs")]
    pub gc_interval_secs: u64,
}

/// Diagnostic trace output
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DiagnosticsConfig {
    /// Directory for daily rolling trace files, empty for stdout only
    #[serde(default)]
    pub log_dir: String,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 9600 }
fn default_reconnect_delay_ms() -> u64 { 5000 }
fn default_max_reconnect_attempts() -> u32 { 5 }

fn default_log_filename() -> String {
    format!("cryoskills_log_{}.csv", Local::now().format("%Y%m%d_%H%M%S"))
}
fn default_retention_secs() -> u64 { 60 * 60 }
fn default_max_packets_per_sensor() -> usize { 256 }
fn default_gc_interval_secs() -> u64 { 60 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            filename: default_log_filename(),
            retention_secs: default_retention_secs(),
            max_packets_per_sensor: default_max_packets_per_sensor(),
            gc_interval_secs: default_gc_interval_secs(),
        }
    }
}

impl SerialConfig {
    /// Delay between a transport failure and the next connection attempt
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl LoggerConfig {
    /// Age after which buffered packets are swept
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Cadence of the buffer sweep
    pub fn gc_interval(&self) -> Duration {
        Duration::from_secs(self.gc_interval_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing sections and fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use cryoskills_receiver::config::Config;
    ///
    /// let config = Config::load("config/receiver.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if self.serial.baud_rate == 0 {
            return Err(invalid("baud_rate must be greater than 0"));
        }

        if self.serial.reconnect_delay_ms == 0 || self.serial.reconnect_delay_ms > 600_000 {
            return Err(invalid("reconnect_delay_ms must be between 1 and 600000"));
        }

        if self.serial.max_reconnect_attempts == 0 {
            return Err(invalid("max_reconnect_attempts must be greater than 0"));
        }

        if self.logger.filename.is_empty() {
            return Err(invalid("logger filename cannot be empty"));
        }

        if self.logger.retention_secs == 0 {
            return Err(invalid("retention_secs must be greater than 0"));
        }

        if self.logger.max_packets_per_sensor == 0 {
            return Err(invalid("max_packets_per_sensor must be greater than 0"));
        }

        if self.logger.gc_interval_secs == 0 {
            return Err(invalid("gc_interval_secs must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(msg: &str) -> ReceiverError {
    ReceiverError::Config(toml::de::Error::custom(msg))
}
