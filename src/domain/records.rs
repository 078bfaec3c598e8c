//! Loosely-typed upstream records.
//!
//! Records are kept as JSON objects; these helpers read the few fields the
//! dashboard interprets (id, status, dates, amounts).

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

pub type Record = Value;

/// Row status codes used across every feature.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Deleted,
    Active,
    Inactive,
}

impl RecordStatus {
    pub fn code(self) -> i64 {
        match self {
            Self::Deleted => 0,
            Self::Active => 1,
            Self::Inactive => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Deleted),
            1 => Some(Self::Active),
            2 => Some(Self::Inactive),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" | "1" => Some(Self::Active),
            "inactive" | "2" => Some(Self::Inactive),
            "deleted" | "0" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// Status a toggle button moves to.
    pub fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive | Self::Deleted => Self::Active,
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Deleted => "deleted",
            Self::Active => "active",
            Self::Inactive => "inactive",
        };
        f.write_str(s)
    }
}

/// Render a scalar field as text for searching and facet matching.
pub fn field_text(record: &Record, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read an integer field that may arrive as a number or a numeric string.
pub fn field_i64(record: &Record, field: &str) -> Option<i64> {
    match record.get(field)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn field_decimal(record: &Record, field: &str) -> Option<Decimal> {
    match record.get(field)? {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok())),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

pub fn record_status(record: &Record, field: &str) -> Option<RecordStatus> {
    field_i64(record, field).and_then(RecordStatus::from_code)
}

/// Upstream ids are numbers on some endpoints and strings on others.
pub fn record_id(record: &Record) -> Option<String> {
    field_text(record, "id").or_else(|| field_text(record, "_id"))
}

/// Calendar day of a date field.
pub fn field_date(record: &Record, field: &str) -> Option<NaiveDate> {
    match record.get(field)? {
        Value::String(s) => parse_day(s),
        Value::Number(n) => n.as_i64().and_then(day_from_epoch),
        _ => None,
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS[.fff]`,
/// `YYYY-MM-DD` and epoch seconds or milliseconds.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    s.parse::<i64>().ok().and_then(day_from_epoch)
}

fn day_from_epoch(value: i64) -> Option<NaiveDate> {
    // Anything past year 2286 in seconds is treated as milliseconds.
    let dt = if value.abs() >= 10_000_000_000 {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }?;
    Some(dt.date_naive())
}
