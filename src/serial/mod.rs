//! # Serial Communication Module
//!
//! Handles the serial link to the CryoSkills LoRa receiver Adalogger.
//!
//! This module handles:
//! - Opening the receiver port at the configured baud rate (8N1, no flow control)
//! - Abstracting the port behind `PortConnector` so sessions can be tested
//! - Running the reconnecting receive session (see [`session`])

pub mod port_trait;
pub mod session;

use async_trait::async_trait;
use tokio_serial::SerialPortBuilderExt;
use tracing::debug;

use crate::config::SerialConfig;
use crate::error::{ReceiverError, Result};
use port_trait::{BoxedPort, PortConnector};

/// Receiver serial port settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConnector {
    /// Device path (e.g., /dev/ttyUSB0 or COM12)
    port: String,
    /// Must match the receiver firmware
    baud_rate: u32,
}

impl SerialConnector {
    /// Create a connector for a port path and baud rate
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
        }
    }

    /// Device path
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Baud rate
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Open the port with receiver settings
    ///
    /// # Returns
    ///
    /// * `Result<SerialStream>` - Opened serial port
    fn open_port(&self) -> Result<tokio_serial::SerialStream> {
        debug!("Opening serial port {} at {} baud", self.port, self.baud_rate);

        let port = tokio_serial::new(&self.port, self.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| ReceiverError::Serial(format!("Failed to open {}: {}", self.port, e)))?;

        Ok(port)
    }
}

impl From<&SerialConfig> for SerialConnector {
    fn from(config: &SerialConfig) -> Self {
        Self::new(config.port.clone(), config.baud_rate)
    }
}

#[async_trait]
impl PortConnector for SerialConnector {
    async fn connect(&self) -> Result<BoxedPort> {
        let port = self.open_port()?;
        Ok(Box::new(port))
    }

    fn describe(&self) -> String {
        format!("{} @ {}", self.port, self.baud_rate)
    }
}
