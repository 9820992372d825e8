//! Property bags
//!
//! Every entity carries a string-keyed bag of scalar values. Bags are ordered
//! maps so that serialized documents and store snapshots compare stably.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered property bag
pub type Properties = BTreeMap<String, PropertyValue>;

/// A scalar property value
///
/// Nested objects, arrays and nulls are rejected at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Int(i64),
    Double(f64),
    String(String),
}

impl PropertyValue {
    /// Returns the string payload, if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(v) => write!(f, "{}", v),
            PropertyValue::Double(v) => write!(f, "{}", v),
            PropertyValue::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double(value)
    }
}

/// Union `incoming` into `existing`
///
/// Incoming values win on conflicts, except for keys listed in `immutable`
/// that are already present in `existing`. Returns `true` if `existing`
/// changed.
pub fn union_properties(existing: &mut Properties, incoming: &Properties, immutable: &[&str]) -> bool {
    let mut changed = false;

    for (key, value) in incoming {
        if immutable.contains(&key.as_str()) && existing.contains_key(key) {
            continue;
        }
        if existing.get(key) != Some(value) {
            existing.insert(key.clone(), value.clone());
            changed = true;
        }
    }

    changed
}
