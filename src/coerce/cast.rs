//! Per-value cast rules.

use chrono::{NaiveDate, NaiveDateTime};

use crate::model::{DataType, Value};

/// Default chrono format for date columns.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Tokens read as `true` by boolean columns (compared case-insensitively).
pub const TRUE_TOKENS: [&str; 5] = ["1", "true", "t", "y", "yes"];

/// Boolean coercion: a fixed token set is true, everything else is false.
pub fn parse_bool(raw: Option<&str>) -> bool {
    raw.map(str::trim)
        .is_some_and(|s| TRUE_TOKENS.iter().any(|t| t.eq_ignore_ascii_case(s)))
}

/// Cast a present raw value. Returns `None` when it does not conform.
pub fn cast_value(raw: &str, data_type: DataType, date_format: Option<&str>) -> Option<Value> {
    let trimmed = raw.trim();
    match data_type {
        DataType::Int => parse_int(trimmed).map(Value::Int),
        DataType::Float => trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::float),
        DataType::Text => Some(Value::Text(raw.to_string())),
        DataType::Date => {
            parse_date(trimmed, date_format.unwrap_or(DEFAULT_DATE_FORMAT)).map(Value::Date)
        }
        DataType::Bool => Some(Value::Bool(parse_bool(Some(trimmed)))),
    }
}

fn parse_int(s: &str) -> Option<i64> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(i);
    }
    // Integral floats such as "3.0" come out of tools that widen int columns
    // holding missing values.
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn parse_date(s: &str, format: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, format) {
        return Some(date);
    }
    [" %H:%M:%S", "T%H:%M:%S", " %H:%M:%S%.f", "T%H:%M:%S%.f"]
        .iter()
        .find_map(|time| NaiveDateTime::parse_from_str(s, &format!("{}{}", format, time)).ok())
        .map(|dt| dt.date())
}
