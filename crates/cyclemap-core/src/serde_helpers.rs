//! Lenient decoders for tracker payloads.
//!
//! Tracker exports are loosely typed: ids arrive as numbers or strings,
//! efforts as numeric strings, collections as `null`. These helpers keep a
//! single malformed field or record from failing the whole payload.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Collections that are missing, `null` or not an array decode as empty.
/// Elements that fail to decode are dropped individually.
pub mod lenient_vec {
    use super::*;

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(decode_collection(value))
    }
}

fn decode_collection<T: DeserializeOwned>(value: Value) -> Vec<T> {
    match value {
        Value::Array(items) => {
            let total = items.len();
            let decoded: Vec<T> = items
                .into_iter()
                .enumerate()
                .filter_map(|(index, item)| match serde_json::from_value::<T>(item) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(index, error = %e, "Skipping malformed record");
                        None
                    }
                })
                .collect();
            if decoded.len() != total {
                warn!(
                    kept = decoded.len(),
                    total, "Dropped malformed records from collection"
                );
            }
            decoded
        }
        Value::Null => Vec::new(),
        other => {
            warn!(kind = value_kind(&other), "Expected an array, using an empty collection");
            Vec::new()
        }
    }
}

/// Optional list from a UI control. A single value is a one-element list,
/// bad elements are dropped, and anything else is `None`.
pub mod lenient_list {
    use super::*;

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => None,
            items @ Value::Array(_) => Some(decode_collection(items)),
            single => match serde_json::from_value::<T>(single) {
                Ok(value) => Some(vec![value]),
                Err(e) => {
                    warn!(error = %e, "Ignoring malformed list value");
                    None
                }
            },
        })
    }
}

/// Optional nested value; `null` and values that fail to decode are `None`.
pub mod lenient_option {
    use super::*;

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => None,
            value => match serde_json::from_value::<T>(value) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(error = %e, "Ignoring malformed field");
                    None
                }
            },
        })
    }
}

/// Display text. Numbers and booleans are rendered; `null` and structured
/// values are empty.
pub mod lenient_string {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
    }
}

/// String form of a scalar JSON value.
pub(crate) fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Required identifier; numbers are accepted and rendered as strings.
pub mod lenient_id {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(serde::de::Error::custom(format!(
                "identifier must be a string or number, got {}",
                value_kind(&other)
            ))),
        }
    }
}

/// Optional identifier; `null`, blank strings and non-scalar values become `None`.
pub mod optional_id {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }
}

/// Effort in weeks. Numbers, numeric strings and `null` are accepted;
/// anything unparseable or non-finite is zero.
pub mod effort_weeks {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let effort = match &value {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            _ => 0.0,
        };
        Ok(if effort.is_finite() { effort } else { 0.0 })
    }
}

/// Calendar date from `YYYY-MM-DD` or RFC 3339; unparseable values are absent.
pub mod lenient_date {
    use super::*;
    use chrono::{DateTime, NaiveDate};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => parse(&s),
            _ => None,
        })
    }

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
            .or_else(|| {
                raw.get(..10)
                    .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
            })
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
