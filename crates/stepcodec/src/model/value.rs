//! Scalar value types with no direct Rust primitive counterpart.

use std::fmt;
use std::str::FromStr;

use bytemuck::{Pod, Zeroable};

use crate::error::{Error, Result};
use crate::limits::NANOS_PER_DAY;
use crate::util::datetime::{
    DateTimeParseError, format_date_rfc3339, format_datetime_rfc3339, format_time_rfc3339,
    parse_date_rfc3339, parse_datetime_rfc3339, parse_time_rfc3339,
};

/// A calendar date, stored as days since 1970-01-01.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Date {
    days_since_epoch: i64,
}

impl Date {
    /// The Unix epoch, 1970-01-01.
    pub const EPOCH: Date = Date { days_since_epoch: 0 };

    pub fn from_days_since_epoch(days: i64) -> Self {
        Self { days_since_epoch: days }
    }

    pub fn days_since_epoch(&self) -> i64 {
        self.days_since_epoch
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_date_rfc3339(self.days_since_epoch))
    }
}

impl FromStr for Date {
    type Err = DateTimeParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_date_rfc3339(s).map(Date::from_days_since_epoch)
    }
}

/// A time of day, stored as nanoseconds since midnight.
///
/// Always within `[0, 86_400 * 10^9)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Time {
    nanos_since_midnight: i64,
}

impl Time {
    pub const MIDNIGHT: Time = Time { nanos_since_midnight: 0 };

    /// Creates a time, rejecting values outside a single day.
    pub fn from_nanos_since_midnight(nanos: i64) -> Result<Self> {
        if !(0..NANOS_PER_DAY).contains(&nanos) {
            return Err(Error::InvalidValue {
                type_name: "time",
                value: nanos as i128,
            });
        }
        Ok(Self {
            nanos_since_midnight: nanos,
        })
    }

    /// Creates a time from clock components.
    pub fn from_hms_nano(hours: u32, minutes: u32, seconds: u32, nanos: u32) -> Result<Self> {
        let total = i128::from(hours) * 3_600_000_000_000
            + i128::from(minutes) * 60_000_000_000
            + i128::from(seconds) * 1_000_000_000
            + i128::from(nanos);
        match i64::try_from(total) {
            Ok(total) => Self::from_nanos_since_midnight(total),
            Err(_) => Err(Error::InvalidValue {
                type_name: "time",
                value: total,
            }),
        }
    }

    pub fn nanos_since_midnight(&self) -> i64 {
        self.nanos_since_midnight
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_time_rfc3339(self.nanos_since_midnight))
    }
}

impl FromStr for Time {
    type Err = DateTimeParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let nanos = parse_time_rfc3339(s)?;
        Ok(Self {
            nanos_since_midnight: nanos,
        })
    }
}

/// An instant, stored as nanoseconds since the Unix epoch (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DateTime {
    nanos_since_epoch: i64,
}

impl DateTime {
    pub const EPOCH: DateTime = DateTime { nanos_since_epoch: 0 };

    pub fn from_nanos_since_epoch(nanos: i64) -> Self {
        Self {
            nanos_since_epoch: nanos,
        }
    }

    /// Combines a date and a time of day.
    pub fn from_date_time(date: Date, time: Time) -> Result<Self> {
        date.days_since_epoch
            .checked_mul(NANOS_PER_DAY)
            .and_then(|n| n.checked_add(time.nanos_since_midnight))
            .map(Self::from_nanos_since_epoch)
            .ok_or_else(|| Error::OutOfRange {
                type_name: "datetime",
                value: date.days_since_epoch as i128 * NANOS_PER_DAY as i128
                    + time.nanos_since_midnight as i128,
            })
    }

    pub fn nanos_since_epoch(&self) -> i64 {
        self.nanos_since_epoch
    }

    pub fn date(&self) -> Date {
        Date::from_days_since_epoch(self.nanos_since_epoch.div_euclid(NANOS_PER_DAY))
    }

    pub fn time(&self) -> Time {
        Time {
            nanos_since_midnight: self.nanos_since_epoch.rem_euclid(NANOS_PER_DAY),
        }
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_datetime_rfc3339(self.nanos_since_epoch))
    }
}

impl FromStr for DateTime {
    type Err = DateTimeParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_datetime_rfc3339(s).map(DateTime::from_nanos_since_epoch)
    }
}

macro_rules! complex_type {
    ($(#[$meta:meta])* $name:ident, $float:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
        #[repr(C)]
        pub struct $name {
            pub re: $float,
            pub im: $float,
        }

        impl $name {
            pub const fn new(re: $float, im: $float) -> Self {
                Self { re, im }
            }
        }

        impl From<($float, $float)> for $name {
            fn from((re, im): ($float, $float)) -> Self {
                Self { re, im }
            }
        }
    };
}

complex_type!(
    /// A complex number with `f32` parts, encoded as two little-endian floats.
    Complex32,
    f32
);
complex_type!(
    /// A complex number with `f64` parts, encoded as two little-endian doubles.
    Complex64,
    f64
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_rejects_out_of_day() {
        assert!(Time::from_nanos_since_midnight(-1).is_err());
        assert!(Time::from_nanos_since_midnight(NANOS_PER_DAY).is_err());
        assert!(Time::from_nanos_since_midnight(NANOS_PER_DAY - 1).is_ok());
        assert!(Time::from_hms_nano(24, 0, 0, 0).is_err());
        assert!(Time::from_hms_nano(u32::MAX, 0, 0, 0).is_err());
        assert!(matches!(
            Time::from_hms_nano(u32::MAX, u32::MAX, u32::MAX, u32::MAX),
            Err(Error::InvalidValue { type_name: "time", .. })
        ));
        assert_eq!(
            Time::from_hms_nano(0, 0, 0, 999_999_999).unwrap().nanos_since_midnight(),
            999_999_999
        );
    }

    #[test]
    fn test_extreme_values_display() {
        assert!(!Date::from_days_since_epoch(i64::MAX).to_string().is_empty());
        assert!(!Date::from_days_since_epoch(i64::MIN).to_string().is_empty());
        assert_eq!(DateTime::from_nanos_since_epoch(i64::MIN).to_string(), "1677-09-21T00:12:43.145224192Z");
    }

    #[test]
    fn test_non_ascii_parse_is_an_error() {
        assert!("00:00:0\u{e9}".parse::<Time>().is_err());
        assert!("2024-03-15T00:00:0\u{e9}".parse::<DateTime>().is_err());
    }

    #[test]
    fn test_datetime_splits_before_epoch() {
        let dt: DateTime = "1969-12-31T23:00:00Z".parse().unwrap();
        assert_eq!(dt.date().days_since_epoch(), -1);
        assert_eq!(dt.time(), Time::from_hms_nano(23, 0, 0, 0).unwrap());
        assert_eq!(DateTime::from_date_time(dt.date(), dt.time()).unwrap(), dt);
    }

    #[test]
    fn test_display_parse() {
        let date: Date = "2024-03-15".parse().unwrap();
        assert_eq!(date.to_string(), "2024-03-15");
        let time: Time = "08:15:00.25".parse().unwrap();
        assert_eq!(time.to_string(), "08:15:00.25");
    }

    #[test]
    #[cfg(target_endian = "little")]
    fn test_complex_layout() {
        assert_eq!(std::mem::size_of::<Complex32>(), 8);
        assert_eq!(std::mem::size_of::<Complex64>(), 16);
        let c = Complex32::new(1.5, -2.0);
        assert_eq!(bytemuck::bytes_of(&c), &[1.5f32.to_le_bytes(), (-2.0f32).to_le_bytes()].concat()[..]);
    }
}
