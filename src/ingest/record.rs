//! Persistable unit: a reading plus its timestamp.

use serde::Serialize;

use super::parser::Reading;
use super::timestamp::TimestampInfo;

/// A [`Reading`] stamped with [`TimestampInfo`]
///
/// Built once per valid frame and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    #[serde(flatten)]
    reading: Reading,
    #[serde(flatten)]
    stamp: TimestampInfo,
}

impl Record {
    pub fn new(reading: Reading, stamp: TimestampInfo) -> Self {
        Self { reading, stamp }
    }

    pub fn reading(&self) -> &Reading {
        &self.reading
    }

    pub fn stamp(&self) -> &TimestampInfo {
        &self.stamp
    }
}
