//! SubRip timestamp parsing and formatting.
//!
//! SRT timings use `HH:MM:SS,mmm`. Some producers emit a `.` instead of the
//! comma before the milliseconds; both are accepted on input, the comma form
//! is always written.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Millisecond-precision subtitle timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SrtTimestamp(u64);

impl SrtTimestamp {
    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

impl fmt::Display for SrtTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.0 / 3_600_000;
        let mins = (self.0 % 3_600_000) / 60_000;
        let secs = (self.0 % 60_000) / 1000;
        let millis = self.0 % 1000;
        write!(f, "{:02}:{:02}:{:02},{:03}", hours, mins, secs, millis)
    }
}

impl FromStr for SrtTimestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ts = s.trim();
        if ts.is_empty() {
            return Err(TimestampError::Empty);
        }

        let (clock, millis) = ts
            .rsplit_once(',')
            .or_else(|| ts.rsplit_once('.'))
            .ok_or_else(|| TimestampError::InvalidFormat(ts.to_string()))?;

        let parts: Vec<&str> = clock.split(':').collect();
        if parts.len() != 3 {
            return Err(TimestampError::InvalidFormat(ts.to_string()));
        }

        let hours = parse_component("hours", parts[0])?;
        let minutes = parse_component("minutes", parts[1])?;
        let seconds = parse_component("seconds", parts[2])?;
        let millis = parse_component("milliseconds", millis)?;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(TimestampError::OutOfRange(ts.to_string()));
        }

        hours
            .checked_mul(3_600_000)
            .and_then(|ms| ms.checked_add(minutes * 60_000 + seconds * 1000 + millis))
            .map(Self)
            .ok_or_else(|| TimestampError::OutOfRange(ts.to_string()))
    }
}

fn parse_component(name: &'static str, value: &str) -> Result<u64, TimestampError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimestampError::InvalidValue(name, value.to_string()));
    }
    value
        .parse()
        .map_err(|_| TimestampError::InvalidValue(name, value.to_string()))
}

/// Timestamp parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("Empty timestamp")]
    Empty,

    #[error("Invalid timestamp format: {0}")]
    InvalidFormat(String),

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("Timestamp component out of range: {0}")]
    OutOfRange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        let ts: SrtTimestamp = "01:02:03,456".parse().unwrap();
        assert_eq!(ts.as_millis(), 3_723_456);
        assert_eq!(ts.to_string(), "01:02:03,456");
    }

    #[test]
    fn test_dot_separator_accepted() {
        let ts: SrtTimestamp = "00:00:10.000".parse().unwrap();
        assert_eq!(ts.as_secs_f64(), 10.0);
        assert_eq!(ts.to_string(), "00:00:10,000");
    }

    #[test]
    fn test_invalid_timestamps() {
        assert_eq!("".parse::<SrtTimestamp>(), Err(TimestampError::Empty));
        assert!(matches!(
            "00:10,000".parse::<SrtTimestamp>(),
            Err(TimestampError::InvalidFormat(_))
        ));
        assert!(matches!(
            "00:61:00,000".parse::<SrtTimestamp>(),
            Err(TimestampError::OutOfRange(_))
        ));
        assert!(matches!(
            "00:aa:00,000".parse::<SrtTimestamp>(),
            Err(TimestampError::InvalidValue("minutes", _))
        ));
    }

    #[test]
    fn test_huge_hours_are_out_of_range() {
        assert!(matches!(
            "9999999999999999:00:00,000".parse::<SrtTimestamp>(),
            Err(TimestampError::OutOfRange(_))
        ));
        assert!(matches!(
            "99999999999999999999:00:00,000".parse::<SrtTimestamp>(),
            Err(TimestampError::InvalidValue("hours", _))
        ));

        let ts: SrtTimestamp = "100:00:00,000".parse().unwrap();
        assert_eq!(ts.to_string(), "100:00:00,000");
    }
}
