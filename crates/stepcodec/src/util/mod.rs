//! Utility modules.

pub mod datetime;

pub use datetime::{
    DateTimeParseError, format_date_rfc3339, format_datetime_rfc3339, format_time_rfc3339,
    parse_date_rfc3339, parse_datetime_rfc3339, parse_time_rfc3339,
};
