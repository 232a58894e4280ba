//! # Persister
//!
//! Writes one [`Record`] per call. No retry, no buffering: a failed write is
//! handed back to the caller untouched.
//!
//! Persisted document shape:
//!
//! ```text
//! { voltage, current, power, energy, frequency, pf,   // doubles
//!   timestamp,                                        // BSON date (UTC)
//!   date: "YYYY-MM-DD", time: "hh:mm:ss AM/PM" }
//! ```

use std::sync::Arc;

use mongodb::bson::{doc, DateTime as BsonDateTime, Document};

use super::DocumentStore;
use crate::error::StoreError;
use crate::ingest::record::Record;

/// Converts records to documents and writes them through a shared store handle
#[derive(Clone)]
pub struct Persister {
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for Persister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persister").finish_non_exhaustive()
    }
}

impl Persister {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Perform exactly one write attempt for `record`
    pub async fn save(&self, record: &Record) -> Result<(), StoreError> {
        self.store.insert_one(to_document(record)).await
    }
}

/// Build the stored document for a record
pub fn to_document(record: &Record) -> Document {
    let reading = record.reading();
    let stamp = record.stamp();

    doc! {
        "voltage": reading.voltage,
        "current": reading.current,
        "power": reading.power,
        "energy": reading.energy,
        "frequency": reading.frequency,
        "pf": reading.pf,
        "timestamp": BsonDateTime::from_millis(stamp.timestamp.timestamp_millis()),
        "date": stamp.date.as_str(),
        "time": stamp.time.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parser::Reading;
    use crate::ingest::timestamp::TimestampInfo;
    use crate::store::mocks::RecordingStore;
    use chrono::{TimeZone, Utc};

    fn sample_record() -> Record {
        Record::new(
            Reading {
                voltage: 230.5,
                current: 1.2,
                power: 276.6,
                energy: 1024.3,
                frequency: 50.0,
                pf: 0.98,
            },
            TimestampInfo {
                timestamp: Utc.with_ymd_and_hms(2024, 12, 8, 9, 4, 56).unwrap(),
                date: "2024-12-08".to_string(),
                time: "02:34:56 PM".to_string(),
            },
        )
    }

    #[test]
    fn test_document_shape() {
        let document = to_document(&sample_record());

        let keys: Vec<&str> = document.keys().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "voltage",
                "current",
                "power",
                "energy",
                "frequency",
                "pf",
                "timestamp",
                "date",
                "time",
            ]
        );
        assert_eq!(document.get_f64("voltage").unwrap(), 230.5);
        assert_eq!(document.get_f64("pf").unwrap(), 0.98);
        assert_eq!(document.get_str("date").unwrap(), "2024-12-08");
        assert_eq!(document.get_str("time").unwrap(), "02:34:56 PM");
        assert_eq!(
            document.get_datetime("timestamp").unwrap().timestamp_millis(),
            Utc.with_ymd_and_hms(2024, 12, 8, 9, 4, 56).unwrap().timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_save_writes_once() {
        let store = RecordingStore::new();
        let persister = Persister::new(Arc::new(store.clone()));

        persister.save(&sample_record()).await.unwrap();

        assert_eq!(store.get_attempts(), 1);
        assert_eq!(store.get_documents(), vec![to_document(&sample_record())]);
    }

    #[tokio::test]
    async fn test_save_reports_write_error_without_retry() {
        let store = RecordingStore::failing("not primary");
        let persister = Persister::new(Arc::new(store.clone()));

        let result = persister.save(&sample_record()).await;

        assert_eq!(result, Err(StoreError::Write("not primary".to_string())));
        assert_eq!(store.get_attempts(), 1);
        assert!(store.get_documents().is_empty());
    }
}
