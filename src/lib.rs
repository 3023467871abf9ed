//! # CryoSkills Receiver Library
//!
//! Receive telemetry from CryoSkills environmental dataloggers via a LoRa
//! receiver on a serial port.
//!
//! This library provides the core of the receiver: byte-stream framing and
//! packet decoding, the reconnecting serial session, and the per-sensor
//! packet store with its CSV log.

pub mod config;
pub mod error;
pub mod frame;
pub mod serial;
pub mod telemetry;
