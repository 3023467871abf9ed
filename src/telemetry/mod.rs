//! # Telemetry Module
//!
//! Decoded datalogger packets and their storage.
//!
//! This module handles:
//! - The `TelemetryPacket` record produced by the decoder
//! - Appending every packet to an append-only CSV log
//! - Keeping a bounded, age-limited history per sensor for consumers

pub mod types;
pub mod logger;
pub mod store;
