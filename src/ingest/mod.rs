//! # Ingestion Module
//!
//! The serial-to-store pipeline.
//!
//! This module handles:
//! - Framing the raw byte stream into text lines ([`frame`])
//! - Parsing and validating the six meter fields ([`parser`])
//! - Stamping readings in the target timezone ([`timestamp`])
//! - Orchestrating the serial lifecycle and persistence ([`pipeline`])

pub mod frame;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod timestamp;

pub use frame::FrameReader;
pub use parser::{parse, Reading};
pub use pipeline::{IngestContext, IngestionLoop, LoopState, StatsSnapshot};
pub use record::Record;
pub use timestamp::{Clock, FixedClock, SystemClock, TimestampInfo, TimestampProvider};
