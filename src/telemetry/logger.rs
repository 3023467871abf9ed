//! # CSV Telemetry Log
//!
//! Append-only CSV file mirroring every decoded packet. The header row is
//! written when the file is first created (or found empty); existing files
//! are only ever appended to.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ReceiverError, Result};
use crate::telemetry::types::TelemetryPacket;

/// Column names, in wire-layout order followed by the host timestamp
pub const CSV_COLUMNS: [&str; 17] = [
    "rssi",
    "receiver_timestamp",
    "packet_type",
    "packet_length",
    "packet_id",
    "sensor_id",
    "ds18b20_temperature",
    "pt1000_temperature",
    "raw_adc_value",
    "battery_voltage",
    "battery_current",
    "solar_panel_voltage",
    "solar_panel_current",
    "load_voltage",
    "load_current",
    "transmitter_timestamp",
    "local_timestamp",
];

/// Terminator after the header row
pub const HEADER_TERMINATOR: &str = "\n";

/// Terminator after every record row (LF then CR, as the receiver tooling expects)
pub const RECORD_TERMINATOR: &str = "\n\r";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const LOCAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Append-only CSV log at a fixed path
#[derive(Debug, Clone)]
pub struct CsvLog {
    path: PathBuf,
}

impl CsvLog {
    /// Create a log handle, writing the header if the file does not exist yet
    ///
    /// # Errors
    ///
    /// Returns `LogWrite` if the file cannot be created
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let log = Self {
            path: path.as_ref().to_path_buf(),
        };
        log.write_row(None)?;
        Ok(log)
    }

    /// Append one packet as a CSV row
    ///
    /// The file is re-opened for every record so that a log removed or
    /// rotated externally is recreated with a fresh header.
    ///
    /// # Errors
    ///
    /// Returns `LogWrite` if the file cannot be opened or written
    pub fn append(&self, packet: &TelemetryPacket) -> Result<()> {
        self.write_row(Some(&format_record(packet)))
    }

    fn write_row(&self, record: Option<&str>) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_error(e))?;

        let is_new = file.metadata().map_err(|e| self.write_error(e))?.len() == 0;

        let mut out = String::new();
        if is_new {
            out.push_str(&format_header());
            out.push_str(HEADER_TERMINATOR);
        }
        if let Some(record) = record {
            out.push_str(record);
            out.push_str(RECORD_TERMINATOR);
        }

        if !out.is_empty() {
            file.write_all(out.as_bytes()).map_err(|e| self.write_error(e))?;
        }
        Ok(())
    }

    fn write_error(&self, source: std::io::Error) -> ReceiverError {
        ReceiverError::LogWrite {
            path: self.path.clone(),
            source,
        }
    }
}

/// Header row (without terminator)
pub fn format_header() -> String {
    CSV_COLUMNS.join(",")
}

/// Record row for a packet (without terminator)
pub fn format_record(packet: &TelemetryPacket) -> String {
    [
        packet.rssi.to_string(),
        packet.receiver_timestamp.format(TIMESTAMP_FORMAT).to_string(),
        packet.packet_type.to_string(),
        packet.packet_length.to_string(),
        packet.packet_id.to_string(),
        packet.sensor_id.to_string(),
        packet.ds18b20_temperature.to_string(),
        packet.pt1000_temperature.to_string(),
        packet.raw_adc_value.to_string(),
        packet.battery_voltage.to_string(),
        packet.battery_current.to_string(),
        packet.solar_panel_voltage.to_string(),
        packet.solar_panel_current.to_string(),
        packet.load_voltage.to_string(),
        packet.load_current.to_string(),
        packet.transmitter_timestamp.format(TIMESTAMP_FORMAT).to_string(),
        packet.local_timestamp.format(LOCAL_TIMESTAMP_FORMAT).to_string(),
    ]
    .join(",")
}
