//! Centralised value coercion.
//!
//! All "turn this dynamically-typed value into the type I asked for" logic
//! lives here, so consumers never scatter casts. Each helper returns `None`
//! when the value cannot be represented in the requested type; callers fall
//! back to their default in that case.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::value::Value;

/// Timestamp formats tried, in order, after RFC 3339 and RFC 2822.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Coerce a text value.
///
/// Numbers and booleans format in their natural decimal form; containers
/// and time values are not representable.
pub fn to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Int(int) => Some(int.to_string()),
        Value::Uint(uint) => Some(uint.to_string()),
        Value::Float(float) => Some(float.to_string()),
        _ => None,
    }
}

/// Coerce a signed integer: text numerals parse, floats truncate,
/// booleans map to 1/0.
pub fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Int(int) => Some(*int),
        Value::Uint(uint) => i64::try_from(*uint).ok(),
        Value::Float(float) => float_to_i64(*float),
        Value::Bool(flag) => Some(i64::from(*flag)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Coerce an unsigned integer; negative inputs are not representable.
pub fn to_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Uint(uint) => Some(*uint),
        Value::Int(int) => u64::try_from(*int).ok(),
        Value::Float(float) => {
            let truncated = float_to_i64(*float)?;
            u64::try_from(truncated).ok()
        }
        Value::Bool(flag) => Some(u64::from(*flag)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Coerce a floating point value.
pub fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float(float) => Some(*float),
        Value::Int(int) => Some(*int as f64),
        Value::Uint(uint) => Some(*uint as f64),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Coerce a boolean: native booleans, the integers 0/1, and the usual
/// textual spellings (`true`/`True`/`TRUE`/`t`/`1` plus their false duals).
pub fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Int(0) | Value::Uint(0) => Some(false),
        Value::Int(1) | Value::Uint(1) => Some(true),
        Value::String(text) => match text.trim() {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Coerce a duration: native durations pass, text is parsed with the
/// `humantime` grammar ("1h30m", "250ms", ...), and bare integers are
/// interpreted as nanoseconds.
pub fn to_duration(value: &Value) -> Option<Duration> {
    match value {
        Value::Duration(duration) => Some(*duration),
        Value::Int(nanos) => u64::try_from(*nanos).ok().map(Duration::from_nanos),
        Value::Uint(nanos) => Some(Duration::from_nanos(*nanos)),
        Value::String(text) => {
            let text = text.trim();
            if let Ok(nanos) = text.parse::<u64>() {
                return Some(Duration::from_nanos(nanos));
            }
            humantime::parse_duration(text).ok()
        }
        _ => None,
    }
}

/// Coerce an absolute timestamp: native timestamps pass, text is parsed
/// against a battery of formats (RFC 3339, RFC 2822, date-time and
/// date-only), and bare integers are interpreted as Unix seconds.
pub fn to_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Timestamp(timestamp) => Some(*timestamp),
        Value::Int(seconds) => DateTime::from_timestamp(*seconds, 0),
        Value::Uint(seconds) => {
            let seconds = i64::try_from(*seconds).ok()?;
            DateTime::from_timestamp(seconds, 0)
        }
        Value::String(text) => parse_timestamp(text.trim()),
        _ => None,
    }
}

/// Coerce a text sequence: untyped sequences are stringified element-wise,
/// and a scalar text becomes a one-element sequence.
pub fn to_string_vec(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::StringArray(items) => Some(items.clone()),
        Value::IntArray(items) => Some(items.iter().map(|item| item.to_string()).collect()),
        Value::Array(items) => items.iter().map(to_string).collect(),
        Value::String(text) => Some(vec![text.clone()]),
        _ => None,
    }
}

/// Coerce an integer sequence.
pub fn to_int_vec(value: &Value) -> Option<Vec<i64>> {
    match value {
        Value::IntArray(items) => Some(items.clone()),
        Value::StringArray(items) => items
            .iter()
            .map(|item| item.trim().parse().ok())
            .collect(),
        Value::Array(items) => items.iter().map(to_i64).collect(),
        _ => None,
    }
}

/// Coerce `value` into the same shape as `like`, returning `None` when the
/// value cannot be represented.
///
/// Defaults of a non-coercible shape (nested maps, untyped arrays, null)
/// leave the value untouched.
pub(crate) fn coerce_like(value: &Value, like: &Value) -> Option<Value> {
    match like {
        Value::String(_) => to_string(value).map(Value::String),
        Value::Int(_) => to_i64(value).map(Value::Int),
        Value::Uint(_) => to_u64(value).map(Value::Uint),
        Value::Float(_) => to_f64(value).map(Value::Float),
        Value::Bool(_) => to_bool(value).map(Value::Bool),
        Value::Duration(_) => to_duration(value).map(Value::Duration),
        Value::Timestamp(_) => to_timestamp(value).map(Value::Timestamp),
        Value::StringArray(_) => to_string_vec(value).map(Value::StringArray),
        Value::IntArray(_) => to_int_vec(value).map(Value::IntArray),
        _ => Some(value.clone()),
    }
}

fn float_to_i64(float: f64) -> Option<i64> {
    if !float.is_finite() {
        return None;
    }
    let truncated = float.trunc();
    if truncated < i64::MIN as f64 || truncated > i64::MAX as f64 {
        return None;
    }
    Some(truncated as i64)
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in TIMESTAMP_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed.and_utc());
        }
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(parsed.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}
