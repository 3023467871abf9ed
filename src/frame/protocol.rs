//! # Receiver Protocol Constants and Types
//!
//! Frame layout emitted by the receiver Adalogger:
//!
//! ```text
//! [0xC5][0xC5][len:u16 LE][ ... len - 4 bytes of payload ... ]
//! [0xC5][0xC5]['#'][' '][ comment text ... ]\n
//! ```

/// Frame magic marker (two bytes, both 0xC5)
pub const FRAME_MAGIC: [u8; 2] = [0xC5, 0xC5];

/// Length bytes announcing a comment line instead of a binary frame
pub const COMMENT_MARKER: [u8; 2] = *b"# ";

/// Marker + length field, counted by the frame length
pub const FRAME_HEADER_SIZE: usize = 4;

/// Width of the ASCII date fields
pub const TIMESTAMP_FIELD_SIZE: usize = 20;

// Payload offsets, relative to the first byte after the length field
pub const OFFSET_RSSI: usize = 0;
pub const OFFSET_RECEIVER_TIMESTAMP: usize = 4;
pub const OFFSET_PACKET_TYPE: usize = 24;
pub const OFFSET_PACKET_LENGTH: usize = 25;
pub const OFFSET_PACKET_ID: usize = 28;
pub const OFFSET_SENSOR_ID: usize = 32;
pub const OFFSET_DS18B20_TEMP: usize = 36;
pub const OFFSET_PT1000_TEMP: usize = 40;
pub const OFFSET_RAW_ADC: usize = 44;
pub const OFFSET_BATTERY_VOLTAGE: usize = 48;
pub const OFFSET_BATTERY_CURRENT: usize = 52;
pub const OFFSET_SOLAR_VOLTAGE: usize = 56;
pub const OFFSET_SOLAR_CURRENT: usize = 60;
pub const OFFSET_LOAD_VOLTAGE: usize = 64;
pub const OFFSET_LOAD_CURRENT: usize = 68;
pub const OFFSET_TRANSMITTER_TIMESTAMP: usize = 72;

/// Minimum payload size holding every field
pub const TELEMETRY_PAYLOAD_SIZE: usize = OFFSET_TRANSMITTER_TIMESTAMP + TIMESTAMP_FIELD_SIZE;

/// Date format used when the field is NUL padded (`dd-mm-yyyy HH:MM:SS\0`)
pub const TIMESTAMP_FORMAT_NUMERIC: &str = "%d-%m-%Y %H:%M:%S";

/// Date format with an abbreviated month name (`dd Mon yyyy HH:MM:SS`)
pub const TIMESTAMP_FORMAT_MONTH_NAME: &str = "%d %b %Y %H:%M:%S";

/// A unit of the receiver byte stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Human-readable line from the receiver, marker and terminator stripped
    Comment(String),

    /// Binary telemetry payload (`len - 4` bytes)
    Packet(Vec<u8>),
}

impl Frame {
    /// Returns true for comment frames
    pub fn is_comment(&self) -> bool {
        matches!(self, Self::Comment(_))
    }
}
