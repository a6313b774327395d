//! # Enviro Bridge
//!
//! Publish environmental sensor telemetry over CAN.
//!
//! This application publishes a snapshot of environmental sensor readings
//! as CAN frames via an SLCAN serial adapter, one frame per scheduler tick.

use anyhow::Result;
use std::time::Instant;
use tokio::time::{interval, Duration};
use tracing::{error, info};
use tracing_subscriber;

mod config;
mod error;
mod can;
mod clock;
mod bus;
mod publisher;
mod journal;

use bus::SlcanBus;
use can::protocol::SensorIds;
use clock::StdClock;
use config::Config;
use journal::SnapshotJournal;
use publisher::{PublishState, TelemetryPublisher, TelemetrySnapshot};

/// Configuration file consulted when no path argument is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// How often the frame-count status line is logged
const STATUS_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Placeholder readings until the I2C sensor front-end lands
///
/// The values are plausible room-environment numbers so downstream
/// consumers see realistic frames during bring-up.
// TODO: replace with live SHT30/SGP30/BMP384/BH1750 polling
fn placeholder_snapshot() -> TelemetrySnapshot {
    TelemetrySnapshot {
        temperature: Some(21.5),
        relative_humidity: Some(40.0),
        absolute_humidity: Some(7.6),
        air_quality_voc: Some(13),
        air_quality_co2eq: Some(400),
        light: Some(120),
        air_pressure: Some(1013.2),
    }
}

/// Main entry point for Enviro Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (path argument, default file, or built-ins)
///    - Open the SLCAN adapter and configure the CAN channel
///
/// 2. **Main Loop**
///    - Hand the current snapshot to the publisher and tick its state
///      machine once per loop iteration
///    - Journal the snapshot and log a status line at their configured
///      cadences
///    - Exit if the publisher trips its error breaker
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Stop the publish loop
///    - Log total frame count
///    - Clean exit
///
/// # Errors
///
/// Returns error if:
/// - The configuration file is invalid
/// - No SLCAN adapter is found or channel setup fails
/// - The snapshot journal cannot be written
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Enviro Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = if std::path::Path::new(&config_path).exists() {
        info!("Loading configuration from {}", config_path);
        Config::load(&config_path)?
    } else {
        info!("No configuration file at {}, using defaults", config_path);
        Config::default()
    };

    // Open the CAN adapter
    let bus = if config.serial.port.is_empty() {
        SlcanBus::open(config.can.bitrate).await?
    } else {
        SlcanBus::open_with_paths(
            &[config.serial.port.as_str()],
            config.serial.baud_rate,
            config.can.bitrate,
        )
        .await?
    };
    info!("CAN adapter opened at: {}", bus.device_path());

    let ids = SensorIds::from_base(config.can.base_address);
    let mut publisher = TelemetryPublisher::with_interval(
        bus,
        StdClock,
        ids,
        Duration::from_millis(config.publisher.send_interval_ms),
    );

    let mut journal = if config.journal.enabled {
        Some(SnapshotJournal::new(
            &config.journal.log_dir,
            config.journal.max_records_per_file,
            config.journal.max_files_to_keep,
        )?)
    } else {
        None
    };
    let journal_period = Duration::from_millis(config.journal.log_interval_ms);

    let snapshot = placeholder_snapshot();

    let mut tick_interval = interval(Duration::from_millis(config.publisher.tick_interval_ms));

    info!(
        "Starting telemetry publish loop ({}ms period, base address {})",
        config.publisher.send_interval_ms, config.can.base_address
    );
    info!("Press Ctrl+C to exit");

    let mut last_journal = Instant::now();
    let mut last_status = Instant::now();

    // Main publish loop
    loop {
        tokio::select! {
            // Advance the publisher once per tick
            _ = tick_interval.tick() => {
                publisher.update(snapshot);
                publisher.tick();

                if publisher.state() == PublishState::Fault {
                    error!(
                        "Publisher faulted after {} failed sends, exiting",
                        publisher.error_count()
                    );
                    break;
                }

                if let Some(journal) = journal.as_mut() {
                    if last_journal.elapsed() >= journal_period {
                        journal.append(&snapshot)?;
                        last_journal = Instant::now();
                    }
                }

                if last_status.elapsed() >= STATUS_LOG_INTERVAL {
                    info!("Sent {} frames so far", publisher.frames_sent());
                    last_status = Instant::now();
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total frames sent: {}", publisher.frames_sent());
                break;
            }
        }
    }

    Ok(())
}
