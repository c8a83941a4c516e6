//! Result value normalization.
//!
//! Each driver surfaces its own native types for the same logical SQL type: a
//! `DATE` column is a [`NaiveDate`] from Postgres and MySQL but plain text from
//! SQLite. [`normalize`] folds all of them into the four transport-safe
//! scalars of [`NormalizedValue`].

use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value as decoded from a database row, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Decimal(BigDecimal),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeTz(DateTime<FixedOffset>),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
    /// Engine-specific value already rendered as text by the driver.
    Other(String),
}

/// A transport-safe scalar.
///
/// Serializes as the bare JSON value (`null`, a string, a number, a boolean).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizedValue {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl NormalizedValue {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the numeric value as f64, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Returns the string slice, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    fn from_f64(v: f64) -> Self {
        // NaN and infinities have no JSON number form.
        serde_json::Number::from_f64(v)
            .map(Self::Number)
            .unwrap_or_else(|| Self::String(v.to_string()))
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// Appends a six-digit fraction to `base` unless the value falls on a whole second.
fn with_micros(base: &str, value: &impl Timelike) -> String {
    if value.nanosecond() / 1_000 == 0 {
        base.to_string()
    } else {
        format!("{base}%.6f")
    }
}

/// Converts a native value into its transport-safe form.
///
/// Decimals become the nearest `f64`, which loses precision for values that
/// need more than 15-17 significant digits.
pub fn normalize(value: NativeValue) -> NormalizedValue {
    match value {
        NativeValue::Null => NormalizedValue::Null,
        NativeValue::Bool(b) => NormalizedValue::Bool(b),
        NativeValue::Int(i) => NormalizedValue::Number(i.into()),
        NativeValue::UInt(u) => NormalizedValue::Number(u.into()),
        NativeValue::Float(f) => NormalizedValue::from_f64(f),
        NativeValue::Text(s) | NativeValue::Other(s) => NormalizedValue::String(s),
        NativeValue::Decimal(d) => {
            let text = d.to_string();
            match text.parse::<f64>() {
                Ok(f) => NormalizedValue::from_f64(f),
                Err(_) => NormalizedValue::String(text),
            }
        }
        NativeValue::Date(d) => NormalizedValue::String(d.format("%Y-%m-%d").to_string()),
        NativeValue::Time(t) => {
            NormalizedValue::String(t.format(&with_micros("%H:%M:%S", &t)).to_string())
        }
        NativeValue::DateTime(dt) => {
            NormalizedValue::String(dt.format(&with_micros("%Y-%m-%dT%H:%M:%S", &dt)).to_string())
        }
        NativeValue::DateTimeTz(dt) => {
            let pattern = format!("{}%:z", with_micros("%Y-%m-%dT%H:%M:%S", &dt));
            NormalizedValue::String(dt.format(&pattern).to_string())
        }
        NativeValue::Uuid(u) => NormalizedValue::String(u.to_string()),
        NativeValue::Json(v) => NormalizedValue::String(v.to_string()),
        NativeValue::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => NormalizedValue::String(text),
            Err(e) => NormalizedValue::String(format!("\\x{}", hex::encode(e.into_bytes()))),
        },
    }
}
