//! # Logging
//!
//! `tracing` subscriber setup. Console output always; a daily-rotated file
//! when `[logging] dir` is set. `RUST_LOG` overrides the configured level.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// File name prefix for rotated log files
pub const LOG_FILE_PREFIX: &str = "meter-bridge.log";

/// Build the level filter: `RUST_LOG` if set, else the configured directive
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = env_filter(config);

    match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();

            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_falls_back() {
        let config = LoggingConfig {
            level: "meter_bridge=[[[".to_string(),
            dir: None,
        };
        // Must not panic on a bad directive
        let _ = env_filter(&config);
    }

    #[test]
    fn test_configured_level() {
        let config = LoggingConfig {
            level: "meter_bridge=debug".to_string(),
            dir: None,
        };
        if std::env::var("RUST_LOG").is_err() {
            assert!(env_filter(&config).to_string().contains("meter_bridge"));
        }
    }
}
