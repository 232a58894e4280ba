//! # Meter Bridge
//!
//! Ingest power-meter telemetry from a serial link into MongoDB.
//!
//! The meter prints one CSV line per measurement:
//!
//! ```text
//! voltage,current,power,energy,frequency,pf
//! ```
//!
//! Each valid line is stamped in the configured timezone and inserted as one
//! document.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};

use meter_bridge::config::{Config, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use meter_bridge::ingest::{FrameReader, IngestContext, IngestionLoop, TimestampProvider};
use meter_bridge::logging;
use meter_bridge::serial::TokioSerialOpener;
use meter_bridge::store::{Persister, StoreConnection};

/// How long pending writes get to finish once ingestion stops
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Main entry point for Meter Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load `.env`, then the config file and environment overrides
///    - Set up logging
///    - Connect to MongoDB (fatal on failure)
///
/// 2. **Main Loop**
///    - Open the serial port and ingest until it closes or fails
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Shutdown**
///    - Give in-flight writes up to [`SHUTDOWN_GRACE`] to finish
///    - Log ingest counters
///
/// # Errors
///
/// Returns error if:
/// - Configuration is missing the store URI, database or collection
/// - MongoDB cannot be reached at startup
/// - The serial port cannot be opened or fails while listening
///
/// # Examples
///
/// ```bash
/// MONGO_URI=mongodb://localhost:27017 DB_NAME=energy COLLECTION_NAME=readings \
///     PORT_NAME=/dev/ttyUSB0 cargo run --release
/// ```
///
/// Expected output:
/// ```text
/// INFO meter_bridge: Meter Bridge v0.1.0 starting...
/// INFO meter_bridge::store: Connected to MongoDB (database: energy, collection: readings)
/// INFO meter_bridge::ingest::pipeline: Serial port /dev/ttyUSB0 @ 115200 baud opened. Listening for data...
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::resolve(&config_path)
        .with_context(|| format!("loading configuration ({})", config_path))?;

    let _log_guard = logging::init(&config.logging);

    info!("Meter Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let connection = StoreConnection::connect(&config.store)
        .await
        .context("connecting to MongoDB")?;

    let context = IngestContext {
        opener: Box::new(TokioSerialOpener::from_config(&config.serial)),
        persister: Persister::new(Arc::new(connection.store())),
        timestamps: TimestampProvider::system(&config.timestamp.timezone)?,
    };
    let mut ingest = IngestionLoop::new(
        context,
        FrameReader::with_delimiter(config.serial.delimiter_byte()),
    );

    info!("Press Ctrl+C to exit");

    let outcome = tokio::select! {
        result = ingest.run() => result,

        // Handle Ctrl+C for graceful shutdown
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            Ok(())
        }
    };

    ingest.settle_within(SHUTDOWN_GRACE).await;

    let stats = ingest.stats();
    info!(
        "Total: {} frames received, {} rejected, {} saved, {} write failures",
        stats.frames_received, stats.frames_rejected, stats.records_persisted, stats.write_failures
    );

    if let Err(e) = outcome {
        error!("Ingestion stopped: {}", e);
        return Err(e.into());
    }

    Ok(())
}
