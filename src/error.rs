//! # Error Types
//!
//! Custom error types for Meter Bridge using `thiserror`.
//!
//! Errors fall into two classes:
//! - Per-frame errors ([`ParseError`], [`StoreError::Write`]) are contained at the
//!   frame boundary, logged and skipped.
//! - Connection-level errors ([`StoreError::Connection`], serial open/runtime
//!   failures) stop the affected subsystem and are surfaced to the operator.

use thiserror::Error;

/// Rejection of a single frame by the record parser
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The frame did not split into exactly six comma-separated fields
    #[error("frame format error: expected {expected} fields, found {found}")]
    FieldCount {
        /// Fields a valid frame holds
        expected: usize,
        /// Fields actually present (0 for a blank frame)
        found: usize,
    },

    /// A field was not a finite floating point number
    #[error("numeric format error in field {index} ({field}): {value:?}")]
    NumericFormat {
        /// Zero-based field position
        index: usize,
        /// Field name (e.g. "voltage")
        field: &'static str,
        /// Raw field text as received
        value: String,
    },
}

/// Document store failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store unreachable or rejected the handshake
    #[error("store connection error: {0}")]
    Connection(String),

    /// A single document write failed
    #[error("store write error: {0}")]
    Write(String),
}

/// Main error type for Meter Bridge
#[derive(Debug, Error)]
pub enum MeterBridgeError {
    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration parsed but holds an unusable value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serial port could not be opened
    #[error("Serial open error: {0}")]
    SerialOpen(String),

    /// Serial link failed while listening
    #[error("Serial runtime error: {0}")]
    SerialRuntime(String),

    /// Document store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Unknown timezone name
    #[error("Unknown timezone: {0}")]
    Timezone(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Meter Bridge
pub type Result<T> = std::result::Result<T, MeterBridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_messages() {
        let err = ParseError::FieldCount { expected: 6, found: 5 };
        assert_eq!(err.to_string(), "frame format error: expected 6 fields, found 5");

        let err = ParseError::NumericFormat {
            index: 0,
            field: "voltage",
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "numeric format error in field 0 (voltage): \"abc\"");
    }

    #[test]
    fn test_store_error_converts_into_bridge_error() {
        let err: MeterBridgeError = StoreError::Connection("refused".to_string()).into();
        assert!(matches!(err, MeterBridgeError::Store(StoreError::Connection(_))));
        assert_eq!(err.to_string(), "Store error: store connection error: refused");
    }
}
