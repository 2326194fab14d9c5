use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Scalar metadata value attached to an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(v) => write!(f, "{v}"),
            MetadataValue::Int(v) => write!(f, "{v}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::Str(v) => write!(f, "{v:?}"),
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

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::Str(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        MetadataValue::Str(v)
    }
}

/// Metadata value plus free-form comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub value: MetadataValue,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

impl MetadataEntry {
    pub fn new(value: impl Into<MetadataValue>, comment: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            comment: comment.into(),
        }
    }
}

/// Key to entry map, ordered by key.
pub type Metadata = BTreeMap<String, MetadataEntry>;
