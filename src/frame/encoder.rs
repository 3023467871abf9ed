//! # Telemetry Payload Encoder
//!
//! Builds receiver payloads and frames from packets. The receiver never
//! transmits, so this exists for replaying logs and exercising the decoder.

use bytes::{BufMut, BytesMut};
use chrono::NaiveDateTime;

use super::protocol::*;
use crate::error::{ReceiverError, Result};
use crate::telemetry::types::TelemetryPacket;

/// Encode a packet into a payload (92 bytes)
///
/// Timestamps are written in the `dd-mm-yyyy HH:MM:SS\0` form.
/// `local_timestamp` is not part of the wire format and is dropped.
pub fn encode_packet(packet: &TelemetryPacket) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(TELEMETRY_PAYLOAD_SIZE);

    buf.put_i32_le(packet.rssi);
    put_timestamp(&mut buf, &packet.receiver_timestamp);
    buf.put_u8(packet.packet_type);
    buf.put_u8(packet.packet_length);
    buf.put_bytes(0, OFFSET_PACKET_ID - OFFSET_PACKET_LENGTH - 1);
    buf.put_u32_le(packet.packet_id);
    buf.put_u32_le(packet.sensor_id);
    buf.put_f32_le(packet.ds18b20_temperature);
    buf.put_f32_le(packet.pt1000_temperature);
    buf.put_u32_le(packet.raw_adc_value);
    buf.put_f32_le(packet.battery_voltage);
    buf.put_f32_le(packet.battery_current);
    buf.put_f32_le(packet.solar_panel_voltage);
    buf.put_f32_le(packet.solar_panel_current);
    buf.put_f32_le(packet.load_voltage);
    buf.put_f32_le(packet.load_current);
    put_timestamp(&mut buf, &packet.transmitter_timestamp);

    buf.to_vec()
}

/// Wrap a payload in a complete frame: magic + little-endian length + payload
///
/// # Errors
///
/// Returns error if the framed size does not fit the 16-bit length field
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>> {
    let length = u16::try_from(payload.len() + FRAME_HEADER_SIZE).map_err(|_| {
        ReceiverError::MalformedPacket(format!(
            "Payload size {} exceeds frame length field",
            payload.len()
        ))
    })?;

    let mut frame = Vec::with_capacity(length as usize);
    frame.extend_from_slice(&FRAME_MAGIC);
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Encode a receiver comment line (`# ` marker, LF terminated)
pub fn encode_comment(text: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + text.len() + 1);
    frame.extend_from_slice(&FRAME_MAGIC);
    frame.extend_from_slice(&COMMENT_MARKER);
    frame.extend_from_slice(text.as_bytes());
    frame.push(b'\n');
    frame
}

fn put_timestamp(buf: &mut BytesMut, timestamp: &NaiveDateTime) {
    let text = timestamp.format(TIMESTAMP_FORMAT_NUMERIC).to_string();
    let mut field = [0u8; TIMESTAMP_FIELD_SIZE];
    let len = text.len().min(TIMESTAMP_FIELD_SIZE - 1);
    field[..len].copy_from_slice(&text.as_bytes()[..len]);
    buf.put_slice(&field);
}
