//! # Record Parser
//!
//! Converts one text frame into a [`Reading`].
//!
//! Frame layout (comma separated, fixed order):
//!
//! ```text
//! voltage,current,power,energy,frequency,pf
//! 230.5,1.2,276.6,1024.3,50.0,0.98
//! ```
//!
//! Only shape and number format are checked. Negative or extreme values are
//! accepted as-is.
//!
//! Each field must be a number in full: a unit suffix or other trailing text
//! (`230.5V`) rejects the frame rather than being cut off.

use serde::Serialize;

use crate::error::ParseError;

/// Field separator within a frame
pub const FIELD_SEPARATOR: char = ',';

/// Number of fields in a valid frame
pub const FIELD_COUNT: usize = 6;

/// Field names in frame order, as persisted
pub const FIELD_NAMES: [&str; FIELD_COUNT] =
    ["voltage", "current", "power", "energy", "frequency", "pf"];

/// One validated measurement from the meter
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    /// Line voltage (V)
    pub voltage: f64,
    /// Line current (A)
    pub current: f64,
    /// Active power (W)
    pub power: f64,
    /// Accumulated energy (Wh)
    pub energy: f64,
    /// Line frequency (Hz)
    pub frequency: f64,
    /// Power factor
    pub pf: f64,
}

/// Parse a frame into a [`Reading`]
///
/// Surrounding whitespace (including a trailing `\r`) is ignored, as is
/// whitespace around each field.
///
/// # Errors
///
/// - [`ParseError::FieldCount`] if the frame does not hold exactly six fields
/// - [`ParseError::NumericFormat`] for the first field that is not a finite number
///
/// # Examples
///
/// ```
/// use meter_bridge::ingest::parser::parse;
///
/// let reading = parse("230.5,1.2,276.6,1024.3,50.0,0.98").unwrap();
/// assert_eq!(reading.voltage, 230.5);
/// assert_eq!(reading.pf, 0.98);
/// ```
pub fn parse(frame: &str) -> Result<Reading, ParseError> {
    let frame = frame.trim();
    if frame.is_empty() {
        return Err(ParseError::FieldCount { expected: FIELD_COUNT, found: 0 });
    }

    let fields: Vec<&str> = frame.split(FIELD_SEPARATOR).collect();
    if fields.len() != FIELD_COUNT {
        return Err(ParseError::FieldCount {
            expected: FIELD_COUNT,
            found: fields.len(),
        });
    }

    let mut values = [0.0f64; FIELD_COUNT];
    for (index, raw) in fields.iter().enumerate() {
        values[index] = parse_field(index, raw)?;
    }

    let [voltage, current, power, energy, frequency, pf] = values;
    Ok(Reading { voltage, current, power, energy, frequency, pf })
}

fn parse_field(index: usize, raw: &str) -> Result<f64, ParseError> {
    let numeric_error = || ParseError::NumericFormat {
        index,
        field: FIELD_NAMES[index],
        value: raw.to_string(),
    };

    let value: f64 = raw.trim().parse().map_err(|_| numeric_error())?;
    if !value.is_finite() {
        return Err(numeric_error());
    }

    Ok(value)
}
