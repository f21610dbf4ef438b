use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Longest key or value kept when metadata filtering is on.
pub const MAX_FILTERED_LENGTH: usize = 8192;

/// An ordered metadata table.
pub type MetadataTable = BTreeMap<String, MetadataValue>;

/// A metadata value: a scalar, or a list of scalars recorded under one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<MetadataValue>),
}

impl MetadataValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetadataValue::Int(v) => Some(*v),
            MetadataValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        self.as_int().and_then(|v| usize::try_from(v).ok())
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Int(v) => Some(*v as f64),
            MetadataValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(v) => Some(*v),
            MetadataValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, MetadataValue::List(_))
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(v) => write!(f, "{}", v),
            MetadataValue::Int(v) => write!(f, "{}", v),
            MetadataValue::Float(v) => write!(f, "{}", v),
            MetadataValue::Text(v) => f.write_str(v),
            MetadataValue::List(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Bool(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Int(v)
    }
}

impl From<i32> for MetadataValue {
    fn from(v: i32) -> Self {
        MetadataValue::Int(v as i64)
    }
}

impl From<u32> for MetadataValue {
    fn from(v: u32) -> Self {
        MetadataValue::Int(v as i64)
    }
}

impl From<usize> for MetadataValue {
    fn from(v: usize) -> Self {
        MetadataValue::Int(v as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::Text(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        MetadataValue::Text(v)
    }
}

// =============================================================================
// Filtering and flattening
// =============================================================================

/// Strip markup characters and their entity forms from a string.
pub fn sanitize(text: &str) -> String {
    text.replace("&lt;", "")
        .replace("&gt;", "")
        .replace("&amp;", "")
        .replace(['<', '>', '&'], "")
        .trim()
        .to_string()
}

/// Apply metadata filtering to a key/value pair.
///
/// Returns `None` when the pair must be dropped: list values, over-long keys
/// or values, keys without any letter, and values that are blank once
/// sanitized.
pub fn filter_entry(key: &str, value: &MetadataValue) -> Option<(String, MetadataValue)> {
    if value.is_list() {
        return None;
    }
    if key.len() > MAX_FILTERED_LENGTH {
        return None;
    }

    let key = sanitize(key);
    if !key.chars().any(|c| c.is_alphabetic()) {
        return None;
    }

    let value = match value {
        MetadataValue::Text(text) => {
            if text.len() > MAX_FILTERED_LENGTH {
                return None;
            }
            let clean = sanitize(text);
            if clean.is_empty() {
                return None;
            }
            MetadataValue::Text(clean)
        }
        other => other.clone(),
    };

    Some((key, value))
}

/// Render list values as numbered scalar keys (`key #01`, `key #02`, ...).
///
/// The number width grows with the list length so that keys sort in order.
pub fn flatten_table(table: &MetadataTable) -> MetadataTable {
    let mut flat = MetadataTable::new();
    for (key, value) in table {
        match value {
            MetadataValue::List(values) => {
                let width = values.len().to_string().len().max(2);
                for (i, item) in values.iter().enumerate() {
                    flat.insert(
                        format!("{} #{:0width$}", key, i + 1, width = width),
                        item.clone(),
                    );
                }
            }
            other => {
                flat.insert(key.clone(), other.clone());
            }
        }
    }
    flat
}
