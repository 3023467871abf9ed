//! # Sensor Buffer Store
//!
//! Durable CSV log plus a bounded, age-limited packet history per sensor.
//!
//! The store is shared between the serial worker (the only appender) and any
//! number of readers. Mutations (`append`, `garbage_collect`) are serialized
//! through the log mutex and then publish under the buffer write lock, so
//! readers always see either the state before or after a mutation.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::Path;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::debug;

use super::logger::{format_record, CsvLog};
use super::types::{Selection, TelemetryPacket};
use crate::error::Result;

/// Packets kept per sensor before the oldest is dropped
pub const DEFAULT_MAX_PACKETS_PER_SENSOR: usize = 256;

/// Age after which buffered packets are swept
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Shared log + per-sensor history
#[derive(Debug)]
pub struct SensorStore {
    log: Mutex<CsvLog>,
    buffers: RwLock<Buffers>,
    max_packets_per_sensor: usize,
    retention: Duration,
}

/// Per-sensor histories, each entry tagged with its arrival number
#[derive(Debug, Default)]
struct Buffers {
    next_seq: u64,
    by_sensor: HashMap<u32, VecDeque<Buffered>>,
}

#[derive(Debug)]
struct Buffered {
    seq: u64,
    packet: TelemetryPacket,
}

impl SensorStore {
    /// Open a store logging to `path` with default capacity and retention
    ///
    /// # Errors
    ///
    /// Returns `LogWrite` if the log file cannot be created
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_limits(path, DEFAULT_MAX_PACKETS_PER_SENSOR, DEFAULT_RETENTION)
    }

    /// Open a store with explicit limits
    ///
    /// A capacity of zero is treated as one.
    pub fn with_limits<P: AsRef<Path>>(
        path: P,
        max_packets_per_sensor: usize,
        retention: Duration,
    ) -> Result<Self> {
        Ok(Self {
            log: Mutex::new(CsvLog::open(path)?),
            buffers: RwLock::new(Buffers::default()),
            max_packets_per_sensor: max_packets_per_sensor.max(1),
            retention,
        })
    }

    /// Per-sensor capacity
    pub fn max_packets_per_sensor(&self) -> usize {
        self.max_packets_per_sensor
    }

    /// Retention window used by `garbage_collect`
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Log a packet and add it to its sensor's history
    ///
    /// The CSV row is written first; if that fails the packet is not
    /// buffered. A full history drops its oldest packet.
    ///
    /// # Errors
    ///
    /// Returns `LogWrite` if the CSV row could not be written
    pub fn append(&self, packet: TelemetryPacket) -> Result<()> {
        let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.append(&packet)?;
        debug!("{}", format_record(&packet));

        let mut buffers = self.buffers.write().unwrap_or_else(PoisonError::into_inner);
        let seq = buffers.next_seq;
        buffers.next_seq += 1;

        let history = buffers.by_sensor.entry(packet.sensor_id).or_default();
        while history.len() >= self.max_packets_per_sensor {
            history.pop_front();
        }
        history.push_back(Buffered { seq, packet });
        Ok(())
    }

    /// Remove every buffered packet older than the retention window
    ///
    /// # Arguments
    ///
    /// * `now` - Reference time; packets with `local_timestamp < now - retention` go
    ///
    /// # Returns
    ///
    /// * `usize` - Number of packets removed
    pub fn garbage_collect(&self, now: DateTime<Local>) -> usize {
        let _log = self.log.lock().unwrap_or_else(PoisonError::into_inner);

        // A window reaching past the representable range expires nothing
        let Some(cutoff) = chrono::Duration::from_std(self.retention)
            .ok()
            .and_then(|retention| now.checked_sub_signed(retention))
        else {
            return 0;
        };

        let mut removed = 0;
        let mut buffers = self.buffers.write().unwrap_or_else(PoisonError::into_inner);
        for (sensor_id, history) in buffers.by_sensor.iter_mut() {
            let before = history.len();
            history.retain(|entry| {
                let keep = entry.packet.local_timestamp >= cutoff;
                if !keep {
                    debug!(
                        "Deleting packet {} from sensor {:x}",
                        entry.packet.packet_id, sensor_id
                    );
                }
                keep
            });
            removed += before - history.len();
        }
        removed
    }

    /// Ids of all sensors seen so far
    pub fn sensor_ids(&self) -> BTreeSet<u32> {
        let buffers = self.buffers.read().unwrap_or_else(PoisonError::into_inner);
        buffers.by_sensor.keys().copied().collect()
    }

    /// Copy of the buffered packets for a selection
    ///
    /// A single sensor is returned in arrival order. `Selection::All`
    /// merges every sensor, also in arrival order.
    pub fn snapshot(&self, selection: Selection) -> Vec<TelemetryPacket> {
        let buffers = self.buffers.read().unwrap_or_else(PoisonError::into_inner);
        match selection {
            Selection::Sensor(id) => buffers
                .by_sensor
                .get(&id)
                .map(|history| history.iter().map(|entry| entry.packet.clone()).collect())
                .unwrap_or_default(),
            Selection::All => {
                // Host clock can step backwards, so order by arrival number
                let mut entries: Vec<&Buffered> = buffers.by_sensor.values().flatten().collect();
                entries.sort_unstable_by_key(|entry| entry.seq);
                entries.into_iter().map(|entry| entry.packet.clone()).collect()
            }
        }
    }

    /// Number of packets currently buffered for a sensor
    pub fn len(&self, sensor_id: u32) -> usize {
        let buffers = self.buffers.read().unwrap_or_else(PoisonError::into_inner);
        buffers.by_sensor.get(&sensor_id).map_or(0, VecDeque::len)
    }

    /// True when no packet has been buffered
    pub fn is_empty(&self) -> bool {
        let buffers = self.buffers.read().unwrap_or_else(PoisonError::into_inner);
        buffers.by_sensor.values().all(VecDeque::is_empty)
    }
}
