//! # Frame Module
//!
//! Wire format of the CryoSkills LoRa receiver stream.
//!
//! This module handles:
//! - Byte-level synchronization on the `0xC5 0xC5` magic marker
//! - Separating comment lines from binary telemetry frames
//! - Decoding the fixed-layout telemetry payload
//! - Encoding payloads and frames (fixtures and replay tooling)

pub mod protocol;
pub mod sync;
pub mod decoder;
pub mod encoder;
