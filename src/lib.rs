//! # Meter Bridge Library
//!
//! Ingest power-meter telemetry from a serial link into MongoDB.
//!
//! This library provides the ingestion pipeline: framing the serial byte
//! stream, validating the six meter fields, stamping each reading in a fixed
//! timezone and writing it to the document store.

pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod serial;
pub mod store;
