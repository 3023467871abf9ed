//! # Error Types
//!
//! Custom error types for the CryoSkills receiver using `thiserror`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the CryoSkills receiver
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// Byte source closed or failed mid-read
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Serial port could not be opened or configured
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Payload too short or carrying an unparseable timestamp
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    /// CSV log could not be written; the packet was not buffered
    #[error("Failed to write log file {}: {source}", path.display())]
    LogWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reconnect budget exhausted, session stopped
    #[error("Serial session failed permanently after {attempts} transport failures")]
    PermanentFailure { attempts: u32 },

    /// Sensor selection is neither `All` nor a hexadecimal id
    #[error("Invalid sensor selection: {0}")]
    InvalidSelection(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReceiverError {
    /// Whether this error should drive the session into a reconnect
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Serial(_) | Self::Io(_))
    }
}

/// Result type alias for the CryoSkills receiver
pub type Result<T> = std::result::Result<T, ReceiverError>;
