//! # Telemetry Types

use chrono::{DateTime, Local, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

use crate::error::ReceiverError;

/// One decoded CryoSkills radio packet
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryPacket {
    /// Signal strength at the receiver in dBm
    pub rssi: i32,

    /// Receiver clock when the packet arrived
    pub receiver_timestamp: NaiveDateTime,

    pub packet_type: u8,
    pub packet_length: u8,

    /// Transmitter sequence number, restarts with the transmitter
    pub packet_id: u32,

    /// Originating datalogger
    pub sensor_id: u32,

    /// Digital (DS18B20) temperature in °C
    pub ds18b20_temperature: f32,

    /// Analogue (PT1000) temperature in °C
    pub pt1000_temperature: f32,

    pub raw_adc_value: u32,

    pub battery_voltage: f32,
    pub battery_current: f32,
    pub solar_panel_voltage: f32,
    pub solar_panel_current: f32,
    pub load_voltage: f32,
    pub load_current: f32,

    /// Transmitter clock when the packet was sent
    pub transmitter_timestamp: NaiveDateTime,

    /// Host clock at decode time, never transmitted
    pub local_timestamp: DateTime<Local>,
}

impl TelemetryPacket {
    /// Solar panel power in watts
    pub fn solar_power(&self) -> f32 {
        self.solar_panel_voltage * self.solar_panel_current
    }
}

/// Which buffered packets a consumer wants to see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selection {
    All,
    Sensor(u32),
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "All"),
            Self::Sensor(id) => write!(f, "{:x}", id),
        }
    }
}

impl FromStr for Selection {
    type Err = ReceiverError;

    /// Parses `All` (any case) or a hexadecimal sensor id such as `1a`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }

        let digits = s.trim_start_matches("0x").trim_start_matches("0X");
        u32::from_str_radix(digits, 16)
            .map(Self::Sensor)
            .map_err(|e| ReceiverError::InvalidSelection(format!("'{}': {}", s, e)))
    }
}
