//! RFC 3339 parsing and formatting for the temporal value types.
//!
//! Converts between RFC 3339 strings and the wire representations:
//! - Date: days since the Unix epoch (1970-01-01)
//! - Time: nanoseconds since midnight
//! - DateTime: nanoseconds since the Unix epoch, UTC

use thiserror::Error;

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;
const NANOS_PER_DAY: i64 = 24 * NANOS_PER_HOUR;

/// Error type for RFC 3339 parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DateTimeParseError {
    pub message: String,
}

impl DateTimeParseError {
    fn new(what: &str, input: &str) -> Self {
        Self {
            message: format!("Invalid {}: {}", what, input),
        }
    }
}

/// Parses a timezone offset (Z, +HH:MM, -HH:MM) into minutes east of UTC.
fn parse_timezone_offset(offset: &str) -> Result<i64, DateTimeParseError> {
    if offset == "Z" || offset == "z" {
        return Ok(0);
    }

    let bytes = offset.as_bytes();
    if bytes.len() != 6 || bytes[3] != b':' {
        return Err(DateTimeParseError::new("timezone offset", offset));
    }

    let sign = match bytes[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return Err(DateTimeParseError::new("timezone offset", offset)),
    };

    let hours = parse_digits(&offset[1..3]).ok_or_else(|| DateTimeParseError::new("timezone offset", offset))?;
    let minutes = parse_digits(&offset[4..6]).ok_or_else(|| DateTimeParseError::new("timezone offset", offset))?;

    if hours > 23 || minutes > 59 {
        return Err(DateTimeParseError::new("timezone offset", offset));
    }

    Ok(sign * (hours * 60 + minutes))
}

/// Parses a run of ASCII digits.
fn parse_digits(s: &str) -> Option<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parses fractional seconds into nanoseconds, truncating past 9 digits.
fn parse_fractional_seconds(frac: &str) -> i64 {
    let digits = &frac[..frac.len().min(9)];
    let mut nanos: i64 = digits.parse().unwrap_or(0);
    for _ in digits.len()..9 {
        nanos *= 10;
    }
    nanos
}

/// Formats nanoseconds as fractional seconds, omitting trailing zeros.
fn format_fractional_seconds(nanos: i64) -> String {
    if nanos == 0 {
        return String::new();
    }
    let digits = format!("{:09}", nanos);
    format!(".{}", digits.trim_end_matches('0'))
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn days_in_month(year: i64, month: i64) -> i64 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Days since the Unix epoch for a civil date (Howard Hinnant's algorithm).
///
/// Saturates at the bounds of `i64` for years too far from the epoch.
pub fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = i128::from(year) - i128::from(month <= 2);
    let m = i128::from(month);
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + i128::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    let days = era * 146097 + doe - 719468;
    days.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Civil date `(year, month, day)` for a day count since the Unix epoch.
///
/// Defined for every `i64`; the arithmetic is widened to `i128`.
pub fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = i128::from(days) + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    // |year| is below |days| / 365 + 1, so it fits in i64.
    ((if m <= 2 { y + 1 } else { y }) as i64, m, d)
}

/// Splits `YYYY-MM-DD` into validated components.
fn parse_date_part(date: &str, input: &str) -> Result<(i64, u32, u32), DateTimeParseError> {
    let bytes = date.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(DateTimeParseError::new("RFC 3339 date", input));
    }

    let year = parse_digits(&date[..4]).ok_or_else(|| DateTimeParseError::new("year", input))?;
    let month = parse_digits(&date[5..7]).ok_or_else(|| DateTimeParseError::new("month", input))?;
    let day = parse_digits(&date[8..10]).ok_or_else(|| DateTimeParseError::new("day", input))?;

    if !(1..=12).contains(&month) {
        return Err(DateTimeParseError::new("month", input));
    }
    if day < 1 || day > days_in_month(year, month) {
        return Err(DateTimeParseError::new("day", input));
    }

    Ok((year, month as u32, day as u32))
}

/// Splits `HH:MM:SS[.fffffffff][offset]` into nanoseconds since midnight and
/// an optional offset suffix.
fn parse_time_part<'a>(time: &'a str, input: &str) -> Result<(i64, Option<&'a str>), DateTimeParseError> {
    let bytes = time.as_bytes();
    if bytes.len() < 8 || !bytes[..8].is_ascii() || bytes[2] != b':' || bytes[5] != b':' {
        return Err(DateTimeParseError::new("RFC 3339 time", input));
    }

    let hours = parse_digits(&time[..2]).ok_or_else(|| DateTimeParseError::new("hours", input))?;
    let minutes = parse_digits(&time[3..5]).ok_or_else(|| DateTimeParseError::new("minutes", input))?;
    let seconds = parse_digits(&time[6..8]).ok_or_else(|| DateTimeParseError::new("seconds", input))?;

    if hours > 23 {
        return Err(DateTimeParseError::new("hours", input));
    }
    if minutes > 59 {
        return Err(DateTimeParseError::new("minutes", input));
    }
    if seconds > 59 {
        return Err(DateTimeParseError::new("seconds", input));
    }

    let rest = &time[8..];
    let (nanos, offset) = if let Some(frac) = rest.strip_prefix('.') {
        let end = frac
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(frac.len());
        if end == 0 {
            return Err(DateTimeParseError::new("fractional seconds", input));
        }
        let offset = (end < frac.len()).then(|| &frac[end..]);
        (parse_fractional_seconds(&frac[..end]), offset)
    } else if rest.is_empty() {
        (0, None)
    } else {
        (0, Some(rest))
    };

    let total = hours * NANOS_PER_HOUR + minutes * NANOS_PER_MINUTE + seconds * NANOS_PER_SECOND + nanos;
    Ok((total, offset))
}

// =====================
// DATE functions
// =====================

/// Parses an RFC 3339 full-date (`YYYY-MM-DD`) into days since the Unix epoch.
pub fn parse_date_rfc3339(date_str: &str) -> Result<i64, DateTimeParseError> {
    let (year, month, day) = parse_date_part(date_str, date_str)?;
    Ok(days_from_civil(year, month, day))
}

/// Formats days since the Unix epoch as `YYYY-MM-DD`.
pub fn format_date_rfc3339(days: i64) -> String {
    let (year, month, day) = civil_from_days(days);
    format!("{:04}-{:02}-{:02}", year, month, day)
}

// =====================
// TIME functions
// =====================

/// Parses an RFC 3339 partial-time (`HH:MM:SS[.fffffffff]`) into nanoseconds
/// since midnight. Offsets are not accepted for local times of day.
pub fn parse_time_rfc3339(time_str: &str) -> Result<i64, DateTimeParseError> {
    let (nanos, offset) = parse_time_part(time_str, time_str)?;
    if offset.is_some() {
        return Err(DateTimeParseError::new("RFC 3339 time", time_str));
    }
    Ok(nanos)
}

/// Formats nanoseconds since midnight as `HH:MM:SS[.fffffffff]`.
pub fn format_time_rfc3339(time_nanos: i64) -> String {
    let time_nanos = time_nanos.rem_euclid(NANOS_PER_DAY);
    let hours = time_nanos / NANOS_PER_HOUR;
    let minutes = time_nanos % NANOS_PER_HOUR / NANOS_PER_MINUTE;
    let seconds = time_nanos % NANOS_PER_MINUTE / NANOS_PER_SECOND;
    let frac = format_fractional_seconds(time_nanos % NANOS_PER_SECOND);
    format!("{:02}:{:02}:{:02}{}", hours, minutes, seconds, frac)
}

// =====================
// DATETIME functions
// =====================

/// Parses an RFC 3339 date-time into nanoseconds since the Unix epoch (UTC).
///
/// A missing offset is read as UTC. Accepts `T`, `t` or a space as separator.
pub fn parse_datetime_rfc3339(datetime_str: &str) -> Result<i64, DateTimeParseError> {
    if datetime_str.len() < 19 || !datetime_str.is_char_boundary(10) || !datetime_str.is_char_boundary(11) {
        return Err(DateTimeParseError::new("RFC 3339 datetime", datetime_str));
    }
    if !matches!(datetime_str.as_bytes()[10], b'T' | b't' | b' ') {
        return Err(DateTimeParseError::new("RFC 3339 datetime", datetime_str));
    }

    let (year, month, day) = parse_date_part(&datetime_str[..10], datetime_str)?;
    let (time_nanos, offset) = parse_time_part(&datetime_str[11..], datetime_str)?;
    let offset_min = match offset {
        Some(s) => parse_timezone_offset(s)?,
        None => 0,
    };

    let days = days_from_civil(year, month, day);
    days.checked_mul(NANOS_PER_DAY)
        .and_then(|n| n.checked_add(time_nanos))
        .and_then(|n| n.checked_sub(offset_min * NANOS_PER_MINUTE))
        .ok_or_else(|| DateTimeParseError::new("RFC 3339 datetime (out of range)", datetime_str))
}

/// Formats nanoseconds since the Unix epoch as an RFC 3339 UTC date-time.
pub fn format_datetime_rfc3339(epoch_nanos: i64) -> String {
    let days = epoch_nanos.div_euclid(NANOS_PER_DAY);
    let time_nanos = epoch_nanos.rem_euclid(NANOS_PER_DAY);
    format!(
        "{}T{}Z",
        format_date_rfc3339(days),
        format_time_rfc3339(time_nanos)
    )
}
