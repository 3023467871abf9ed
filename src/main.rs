//! # CryoSkills Receiver
//!
//! Log CryoSkills LoRa radio packets from CryoSkills dataloggers.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration, apply command line overrides
//!    - Set up logging with tracing subscriber (optionally to rolling files)
//!    - Open the CSV log and start the receiver session on its own task
//!
//! 2. **Main Loop**
//!    - Sweep expired packets from the buffers every `gc_interval_secs`
//!    - Report the watched selection after each sweep
//!    - Handle Ctrl+C for graceful shutdown
//!
//! 3. **Shutdown**
//!    - Stop the session, releasing the serial port
//!    - Exit non-zero if the session failed permanently
//!
//! Expected output:
//! ```text
//! INFO cryoskills_receiver: CryoSkills receiver v0.1.0 starting...
//! INFO cryoskills_receiver::serial::session: Connected to receiver on /dev/ttyUSB0 @ 9600
//! INFO cryoskills_receiver: 1a: packet 7
//! ```

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use cryoskills_receiver::config::{Config, DiagnosticsConfig};
use cryoskills_receiver::serial::session::{ReconnectPolicy, Session, SessionEvent};
use cryoskills_receiver::serial::SerialConnector;
use cryoskills_receiver::telemetry::store::SensorStore;
use cryoskills_receiver::telemetry::types::Selection;

/// Command line overrides for the configuration file
#[derive(Debug, Parser)]
#[command(
    name = "cryoskills-receiver",
    version,
    about = "Log CryoSkills LoRa radio packets from CryoSkills dataloggers"
)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial port of the receiver Adalogger (e.g. /dev/ttyUSB0, COM12)
    #[arg(long)]
    port: Option<String>,

    /// Baud rate, must match the receiver Adalogger
    #[arg(long)]
    baud: Option<u32>,

    /// CSV file to append decoded packets to
    #[arg(long)]
    filename: Option<String>,

    /// Sensor to summarise after each sweep (`All` or hex id)
    #[arg(long, default_value = "All")]
    watch: Selection,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(filename) = &self.filename {
            config.logger.filename = filename.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    let _trace_guard = init_tracing(&config.diagnostics);

    info!("CryoSkills receiver v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "Opening serial communication on port {} @ {}",
        config.serial.port, config.serial.baud_rate
    );
    info!("Log file output to {}", config.logger.filename);

    let store = Arc::new(SensorStore::with_limits(
        &config.logger.filename,
        config.logger.max_packets_per_sensor,
        config.logger.retention(),
    )?);

    let (events_tx, mut events) = mpsc::unbounded_channel();
    let handle = Session::new(
        SerialConnector::from(&config.serial),
        Arc::clone(&store),
        ReconnectPolicy::from(&config.serial),
    )
    .with_events(events_tx)
    .spawn();

    let mut state = handle.subscribe();
    let mut sweep = interval(config.logger.gc_interval());

    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = sweep.tick() => {
                let removed = store.garbage_collect(Local::now());
                if removed > 0 {
                    info!("Removed {} expired packets", removed);
                }
                report(&store, args.watch);
            }

            Some(event) = events.recv() => {
                if let SessionEvent::PacketStored { sensor_id, packet_id } = event {
                    info!("{:x}: packet {}", sensor_id, packet_id);
                }
            }

            _ = state.wait_for(|s| s.is_terminal()) => break,

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, closing log and releasing {}", config.serial.port);
                handle.stop();
                break;
            }
        }
    }

    handle.join().await?;
    Ok(())
}

/// Log a one-line summary of the buffered packets for a selection
fn report(store: &SensorStore, selection: Selection) {
    let sensors = store.sensor_ids();
    let packets = store.snapshot(selection);

    match packets.last() {
        Some(latest) => info!(
            "[{}] {} sensors, {} packets; latest {:x}: {:.2} C digital, {:.2} C analogue, \
             {:.2} W solar, {} dBm",
            selection,
            sensors.len(),
            packets.len(),
            latest.sensor_id,
            latest.ds18b20_temperature,
            latest.pt1000_temperature,
            latest.solar_power(),
            latest.rssi
        ),
        None if sensors.is_empty() => info!("[{}] waiting for packets", selection),
        None => warn!("[{}] no buffered packets ({} sensors known)", selection, sensors.len()),
    }
}

/// Install the tracing subscriber, teeing to daily rolling files when configured
fn init_tracing(diagnostics: &DiagnosticsConfig) -> Option<WorkerGuard> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    if diagnostics.log_dir.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return None;
    }

    let appender =
        tracing_appender::rolling::daily(&diagnostics.log_dir, "cryoskills-receiver.log");
    let (file_writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout.and(file_writer))
        .init();
    Some(guard)
}
