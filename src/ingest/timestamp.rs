//! # Timestamp Provider
//!
//! Stamps each reading with the current instant and its wall-clock date and
//! time in a fixed target timezone.
//!
//! The date and time strings are formatted from the same converted instant,
//! so they can never disagree across a midnight boundary.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::{MeterBridgeError, Result};

/// Default target timezone (India Standard Time)
pub const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";

/// Calendar date format, e.g. `2024-12-08`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 12-hour clock format, e.g. `02:34:56 PM`
pub const TIME_FORMAT: &str = "%I:%M:%S %p";

/// Source of the current instant
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// Current instant in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// An instant plus its zone-local date and time strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimestampInfo {
    /// Absolute instant
    pub timestamp: DateTime<Utc>,
    /// Zone-local calendar date (`YYYY-MM-DD`)
    pub date: String,
    /// Zone-local 12-hour time (`hh:mm:ss AM/PM`)
    pub time: String,
}

impl TimestampInfo {
    /// Decompose `instant` into date and time strings in `tz`
    pub fn from_instant(instant: DateTime<Utc>, tz: Tz) -> Self {
        let local = instant.with_timezone(&tz);
        Self {
            timestamp: instant,
            date: local.format(DATE_FORMAT).to_string(),
            time: local.format(TIME_FORMAT).to_string(),
        }
    }
}

/// Produces [`TimestampInfo`] values from a [`Clock`]
#[derive(Clone)]
pub struct TimestampProvider {
    clock: Arc<dyn Clock>,
    tz: Tz,
}

impl std::fmt::Debug for TimestampProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampProvider")
            .field("tz", &self.tz)
            .finish_non_exhaustive()
    }
}

impl TimestampProvider {
    pub fn new(clock: Arc<dyn Clock>, tz: Tz) -> Self {
        Self { clock, tz }
    }

    /// Provider on the wall clock for the named IANA timezone
    ///
    /// # Errors
    ///
    /// Returns [`MeterBridgeError::Timezone`] if the name is unknown
    pub fn system(timezone: &str) -> Result<Self> {
        Ok(Self::new(Arc::new(SystemClock), parse_timezone(timezone)?))
    }

    /// Stamp the current instant
    pub fn now(&self) -> TimestampInfo {
        TimestampInfo::from_instant(self.clock.now(), self.tz)
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }
}

/// Resolve an IANA timezone name such as `Asia/Kolkata`
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| MeterBridgeError::Timezone(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};

    fn kolkata() -> Tz {
        parse_timezone(DEFAULT_TIMEZONE).unwrap()
    }

    fn instant(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_afternoon_in_kolkata() {
        let info = TimestampInfo::from_instant(instant("2024-12-08T09:04:56Z"), kolkata());

        assert_eq!(info.date, "2024-12-08");
        assert_eq!(info.time, "02:34:56 PM");
        assert_eq!(info.timestamp, instant("2024-12-08T09:04:56Z"));
    }

    #[test]
    fn test_date_rolls_over_before_utc_midnight() {
        // 19:00 UTC is 00:30 the next day in IST
        let info = TimestampInfo::from_instant(instant("2024-12-31T19:00:00Z"), kolkata());

        assert_eq!(info.date, "2025-01-01");
        assert_eq!(info.time, "12:30:00 AM");
    }

    #[test]
    fn test_noon_is_pm() {
        let info = TimestampInfo::from_instant(instant("2024-06-01T06:30:00Z"), kolkata());
        assert_eq!(info.time, "12:00:00 PM");
    }

    #[test]
    fn test_provider_reads_clock_once_per_stamp() {
        let mut clock = MockClock::new();
        clock
            .expect_now()
            .times(1)
            .returning(|| instant("2024-12-08T18:29:59Z"));

        let provider = TimestampProvider::new(Arc::new(clock), kolkata());
        let info = provider.now();

        assert_eq!(info.date, "2024-12-08");
        assert_eq!(info.time, "11:59:59 PM");
    }

    #[test]
    fn test_fixed_clock() {
        let at = instant("2024-12-08T09:04:56Z");
        let provider = TimestampProvider::new(Arc::new(FixedClock(at)), kolkata());

        assert_eq!(provider.now(), provider.now());
        assert_eq!(provider.now().timestamp, at);
        assert_eq!(provider.timezone(), kolkata());
    }

    #[test]
    fn test_date_and_time_round_trip_to_instant() {
        let tz = kolkata();
        let samples = [
            "2024-12-08T09:04:56.789Z",
            "2024-12-31T18:30:00Z",
            "2024-02-29T23:59:59.999Z",
            "1999-01-01T00:00:00Z",
        ];

        for s in samples {
            let info = TimestampInfo::from_instant(instant(s), tz);
            let naive = NaiveDateTime::parse_from_str(
                &format!("{} {}", info.date, info.time),
                &format!("{} {}", DATE_FORMAT, TIME_FORMAT),
            )
            .unwrap();
            let rebuilt = tz.from_local_datetime(&naive).single().unwrap().with_timezone(&Utc);

            assert_eq!(rebuilt.timestamp(), info.timestamp.timestamp(), "sample {}", s);
        }
    }

    #[test]
    fn test_other_timezone() {
        let tz = parse_timezone("America/New_York").unwrap();
        let info = TimestampInfo::from_instant(instant("2024-07-04T16:00:00Z"), tz);

        assert_eq!(info.date, "2024-07-04");
        assert_eq!(info.time, "12:00:00 PM");
    }

    #[test]
    fn test_unknown_timezone() {
        match parse_timezone("Mars/Olympus_Mons") {
            Err(MeterBridgeError::Timezone(name)) => assert_eq!(name, "Mars/Olympus_Mons"),
            other => panic!("Expected Timezone error, got: {:?}", other),
        }
        assert!(TimestampProvider::system("nowhere").is_err());
    }
}
