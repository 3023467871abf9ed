//! # Telemetry Payload Decoder
//!
//! Decodes the fixed-layout binary payload of a receiver frame into a
//! [`TelemetryPacket`]. Integers and floats are little-endian.

use bytes::Buf;
use chrono::{DateTime, Local, NaiveDateTime};

use super::protocol::*;
use crate::error::{ReceiverError, Result};
use crate::telemetry::types::TelemetryPacket;

/// Decode a telemetry payload, stamping it with the current host time
///
/// # Arguments
///
/// * `payload` - Frame bytes following the length field
///
/// # Returns
///
/// * `Result<TelemetryPacket>` - Decoded packet
///
/// # Errors
///
/// Returns `MalformedPacket` if:
/// - Payload is shorter than `TELEMETRY_PAYLOAD_SIZE`
/// - Either timestamp matches neither accepted date format
pub fn decode_packet(payload: &[u8]) -> Result<TelemetryPacket> {
    decode_packet_at(payload, Local::now())
}

/// Decode a telemetry payload with an explicit host timestamp
pub fn decode_packet_at(
    payload: &[u8],
    local_timestamp: DateTime<Local>,
) -> Result<TelemetryPacket> {
    if payload.len() < TELEMETRY_PAYLOAD_SIZE {
        return Err(ReceiverError::MalformedPacket(format!(
            "Payload too short: expected at least {} bytes, got {}",
            TELEMETRY_PAYLOAD_SIZE,
            payload.len()
        )));
    }

    let receiver_timestamp = parse_timestamp(
        &payload[OFFSET_RECEIVER_TIMESTAMP..OFFSET_RECEIVER_TIMESTAMP + TIMESTAMP_FIELD_SIZE],
    )?;
    let transmitter_timestamp = parse_timestamp(
        &payload[OFFSET_TRANSMITTER_TIMESTAMP..OFFSET_TRANSMITTER_TIMESTAMP + TIMESTAMP_FIELD_SIZE],
    )?;

    let mut head = &payload[OFFSET_RSSI..OFFSET_RECEIVER_TIMESTAMP];
    let rssi = head.get_i32_le();

    let mut body = &payload[OFFSET_PACKET_TYPE..OFFSET_TRANSMITTER_TIMESTAMP];
    let packet_type = body.get_u8();
    let packet_length = body.get_u8();
    // Two bytes of struct padding before the packet id
    body.advance(OFFSET_PACKET_ID - OFFSET_PACKET_LENGTH - 1);

    Ok(TelemetryPacket {
        rssi,
        receiver_timestamp,
        packet_type,
        packet_length,
        packet_id: body.get_u32_le(),
        sensor_id: body.get_u32_le(),
        ds18b20_temperature: body.get_f32_le(),
        pt1000_temperature: body.get_f32_le(),
        raw_adc_value: body.get_u32_le(),
        battery_voltage: body.get_f32_le(),
        battery_current: body.get_f32_le(),
        solar_panel_voltage: body.get_f32_le(),
        solar_panel_current: body.get_f32_le(),
        load_voltage: body.get_f32_le(),
        load_current: body.get_f32_le(),
        transmitter_timestamp,
        local_timestamp,
    })
}

/// Parse a fixed-width ASCII date field
///
/// Accepts `dd-mm-yyyy HH:MM:SS` (usually NUL terminated) and
/// `dd Mon yyyy HH:MM:SS`. Trailing NUL padding and surrounding
/// whitespace are ignored.
pub fn parse_timestamp(field: &[u8]) -> Result<NaiveDateTime> {
    let text = std::str::from_utf8(field)
        .map_err(|e| ReceiverError::MalformedPacket(format!("Timestamp is not ASCII: {}", e)))?;
    let text = text.trim_end_matches('\0').trim();

    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT_NUMERIC)
        .or_else(|_| NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT_MONTH_NAME))
        .map_err(|e| {
            ReceiverError::MalformedPacket(format!("Unrecognised timestamp '{}': {}", text, e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encoder::encode_packet;
    use chrono::{NaiveDate, TimeZone};

    fn instant(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn sample_packet() -> TelemetryPacket {
        TelemetryPacket {
            rssi: -42,
            receiver_timestamp: instant(1, 10),
            packet_type: 1,
            packet_length: 64,
            packet_id: 7,
            sensor_id: 0x1A,
            ds18b20_temperature: -5.25,
            pt1000_temperature: -5.5,
            raw_adc_value: 2048,
            battery_voltage: 3.7,
            battery_current: 0.12,
            solar_panel_voltage: 5.5,
            solar_panel_current: 0.2,
            load_voltage: 3.3,
            load_current: 0.05,
            transmitter_timestamp: instant(1, 9),
            local_timestamp: Local.with_ymd_and_hms(2024, 2, 1, 10, 0, 1).unwrap(),
        }
    }

    #[test]
    fn test_decode_known_fields() {
        let packet = sample_packet();
        let payload = encode_packet(&packet);

        let decoded = decode_packet(&payload).unwrap();
        assert_eq!(decoded.rssi, -42);
        assert_eq!(decoded.sensor_id, 26);
        assert_eq!(decoded.packet_id, 7);
        assert_eq!(decoded.ds18b20_temperature, -5.25);
        assert_eq!(decoded.receiver_timestamp, instant(1, 10));
        assert_eq!(decoded.transmitter_timestamp, instant(1, 9));
    }

    fn varied_packets() -> Vec<TelemetryPacket> {
        let base = sample_packet();
        vec![
            base.clone(),
            TelemetryPacket {
                rssi: i32::MIN,
                packet_id: u32::MAX,
                sensor_id: u32::MAX,
                raw_adc_value: u32::MAX,
                ds18b20_temperature: f32::MIN,
                pt1000_temperature: f32::MAX,
                battery_voltage: f32::MIN_POSITIVE,
                ..base.clone()
            },
            TelemetryPacket {
                rssi: 0,
                receiver_timestamp: instant(29, 23),
                packet_type: u8::MAX,
                packet_length: 0,
                packet_id: 0,
                sensor_id: 0,
                ds18b20_temperature: -0.0,
                solar_panel_current: -1.0e-30,
                load_voltage: 1.0e30,
                transmitter_timestamp: instant(29, 0),
                ..base.clone()
            },
            TelemetryPacket {
                rssi: -137,
                receiver_timestamp: NaiveDate::from_ymd_opt(1999, 12, 31)
                    .unwrap()
                    .and_hms_opt(23, 59, 59)
                    .unwrap(),
                sensor_id: 0xDEAD_BEEF,
                ..base
            },
        ]
    }

    #[test]
    fn test_decode_matches_encoded_packet() {
        for packet in varied_packets() {
            let payload = encode_packet(&packet);
            let decoded = decode_packet_at(&payload, packet.local_timestamp).unwrap();
            assert_eq!(decoded, packet);
        }
    }

    #[test]
    fn test_decode_month_name_timestamps_match_encoded_packet() {
        for packet in varied_packets() {
            let mut payload = encode_packet(&packet);
            for (offset, ts) in [
                (OFFSET_RECEIVER_TIMESTAMP, packet.receiver_timestamp),
                (OFFSET_TRANSMITTER_TIMESTAMP, packet.transmitter_timestamp),
            ] {
                let text = ts.format(TIMESTAMP_FORMAT_MONTH_NAME).to_string();
                payload[offset..offset + TIMESTAMP_FIELD_SIZE].copy_from_slice(text.as_bytes());
            }

            let decoded = decode_packet_at(&payload, packet.local_timestamp).unwrap();
            assert_eq!(decoded, packet);
        }
    }

    #[test]
    fn test_decode_hand_built_payload() {
        let mut payload = vec![0u8; TELEMETRY_PAYLOAD_SIZE];
        payload[0..4].copy_from_slice(&(-90i32).to_le_bytes());
        payload[4..24].copy_from_slice(b"15-07-2023 23:59:58\0");
        payload[24] = 2;
        payload[25] = 80;
        payload[28..32].copy_from_slice(&1234u32.to_le_bytes());
        payload[32..36].copy_from_slice(&0xBEEFu32.to_le_bytes());
        payload[36..40].copy_from_slice(&21.5f32.to_le_bytes());
        payload[44..48].copy_from_slice(&4095u32.to_le_bytes());
        payload[68..72].copy_from_slice(&1.25f32.to_le_bytes());
        payload[72..92].copy_from_slice(b"15 Jul 2023 23:59:57");

        let decoded = decode_packet(&payload).unwrap();
        assert_eq!(decoded.rssi, -90);
        assert_eq!(decoded.packet_type, 2);
        assert_eq!(decoded.packet_length, 80);
        assert_eq!(decoded.packet_id, 1234);
        assert_eq!(decoded.sensor_id, 0xBEEF);
        assert_eq!(decoded.ds18b20_temperature, 21.5);
        assert_eq!(decoded.pt1000_temperature, 0.0);
        assert_eq!(decoded.raw_adc_value, 4095);
        assert_eq!(decoded.load_current, 1.25);
        assert_eq!(
            decoded.transmitter_timestamp,
            NaiveDate::from_ymd_opt(2023, 7, 15).unwrap().and_hms_opt(23, 59, 57).unwrap()
        );
    }

    #[test]
    fn test_decode_payload_too_short() {
        let payload = encode_packet(&sample_packet());
        let result = decode_packet(&payload[..TELEMETRY_PAYLOAD_SIZE - 1]);
        assert!(matches!(result, Err(ReceiverError::MalformedPacket(_))));
    }

    #[test]
    fn test_decode_empty_payload() {
        assert!(decode_packet(&[]).is_err());
    }

    #[test]
    fn test_decode_accepts_trailing_bytes() {
        let mut payload = encode_packet(&sample_packet());
        payload.extend_from_slice(&[0xAA; 8]);
        assert!(decode_packet(&payload).is_ok());
    }

    #[test]
    fn test_decode_bad_receiver_timestamp() {
        let mut payload = encode_packet(&sample_packet());
        payload[OFFSET_RECEIVER_TIMESTAMP..OFFSET_RECEIVER_TIMESTAMP + 20]
            .copy_from_slice(b"not a date at all!!\0");
        assert!(matches!(decode_packet(&payload), Err(ReceiverError::MalformedPacket(_))));
    }

    #[test]
    fn test_decode_bad_transmitter_timestamp() {
        let mut payload = encode_packet(&sample_packet());
        payload[OFFSET_TRANSMITTER_TIMESTAMP] = 0xFF;
        assert!(matches!(decode_packet(&payload), Err(ReceiverError::MalformedPacket(_))));
    }

    #[test]
    fn test_timestamp_formats_agree() {
        let numeric = parse_timestamp(b"01-02-2024 10:00:00\0").unwrap();
        let month_name = parse_timestamp(b"1 Feb 2024 10:00:00").unwrap();
        assert_eq!(numeric, month_name);
        assert_eq!(numeric, instant(1, 10));
    }

    #[test]
    fn test_timestamp_without_padding() {
        assert_eq!(parse_timestamp(b"01-02-2024 10:00:00").unwrap(), instant(1, 10));
        assert_eq!(parse_timestamp(b"01 Feb 2024 10:00:00").unwrap(), instant(1, 10));
    }

    #[test]
    fn test_timestamp_multiple_nul_padding() {
        assert_eq!(parse_timestamp(b"1 Feb 2024 10:00:00\0\0").unwrap(), instant(1, 10));
        assert_eq!(parse_timestamp(b"01-02-2024 10:00:00\0\0\0").unwrap(), instant(1, 10));
    }

    #[test]
    fn test_timestamp_rejects_garbage() {
        assert!(parse_timestamp(b"").is_err());
        assert!(parse_timestamp(b"2024-02-01T10:00:00").is_err());
        assert!(parse_timestamp(b"31-02-2024 10:00:00\0").is_err());
    }

    #[test]
    fn test_solar_power() {
        let packet = sample_packet();
        assert!((packet.solar_power() - 1.1).abs() < 1e-6);
    }
}
