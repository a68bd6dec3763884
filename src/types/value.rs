//! Tagged value union and per-field type conversion.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{AdapterError, Result};

/// Value of one observation property.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// The data item is unavailable; no value carried.
    Unavailable,
    String(String),
    Integer(i64),
    Double(f64),
    /// Space-separated doubles, e.g. a time-series waveform or a 3D point.
    Vector(Vec<f64>),
    DataSet(DataSet),
}

impl Value {
    /// Convert a raw token into the type a requirement field declares.
    ///
    /// `is_table` selects nested-table parsing for `DATA_SET` fields.
    pub fn convert(token: &str, expected: ValueType, is_table: bool) -> Result<Self> {
        match expected {
            ValueType::String => Ok(Value::String(token.to_string())),
            ValueType::Integer => token
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| AdapterError::conversion("INTEGER", token)),
            ValueType::Double => token
                .trim()
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|_| AdapterError::conversion("DOUBLE", token)),
            ValueType::Vector => {
                let mut values = Vec::new();
                for part in token.split_ascii_whitespace() {
                    let value = part
                        .parse::<f64>()
                        .map_err(|_| AdapterError::conversion("VECTOR", token))?;
                    values.push(value);
                }
                Ok(Value::Vector(values))
            }
            ValueType::DataSet => {
                crate::parser::parse_data_set(token, is_table).map(Value::DataSet)
            }
        }
    }

    /// The double carried by `Double`, if any.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(value) => Some(*value),
            _ => None,
        }
    }

    /// The string carried by `String`, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }
}

/// Expected conversion target of a requirement field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Integer,
    Double,
    Vector,
    DataSet,
}

impl ValueType {
    /// Protocol-facing name used in conversion diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ValueType::String => "STRING",
            ValueType::Integer => "INTEGER",
            ValueType::Double => "DOUBLE",
            ValueType::Vector => "VECTOR",
            ValueType::DataSet => "DATA_SET",
        }
    }
}

/// One parsed data set or table: entry keys to values.
pub type DataSet = BTreeMap<String, DataSetValue>;

/// Value of one data-set entry.
///
/// `Removed` is an explicit empty value: the upstream is retracting the key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DataSetValue {
    String(String),
    Integer(i64),
    Double(f64),
    /// Nested table row; only produced for Table data items.
    Table(DataSet),
    Removed,
}

impl DataSetValue {
    /// Type a bare (unquoted) entry value: integer first, then double,
    /// otherwise string. Quoted values skip this and stay strings.
    pub fn from_bare(raw: &str) -> Self {
        if raw.is_empty() {
            return DataSetValue::Removed;
        }
        if let Ok(value) = raw.parse::<i64>() {
            return DataSetValue::Integer(value);
        }
        if let Ok(value) = raw.parse::<f64>() {
            return DataSetValue::Double(value);
        }
        DataSetValue::String(raw.to_string())
    }
}
