//! Tracked field values

use serde_json::Value;
use std::fmt;

/// A single rendered timestamp
///
/// Patterns that render to nothing but digits (e.g. `X` for epoch seconds)
/// are stored as integers so they stay numeric in YAML.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stamp {
    Integer(i64),
    Text(String),
}

impl Stamp {
    /// Classify rendered output as integer or text
    pub fn from_rendered(text: String) -> Self {
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(number) = text.parse::<i64>() {
                return Self::Integer(number);
            }
        }
        Self::Text(text)
    }

    /// Read a stamp back out of a metadata value
    ///
    /// Only strings and integers qualify; anything else was not written by us.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Number(number) => number.as_i64().map(Self::Integer),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Integer(number) => Value::from(*number),
            Self::Text(text) => Value::String(text.clone()),
        }
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(number) => write!(f, "{}", number),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<Stamp> for Value {
    fn from(stamp: Stamp) -> Self {
        stamp.to_value()
    }
}

/// New value for the tracked field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Plain last-modified timestamp
    Scalar(Stamp),
    /// History log, entries kept exactly as stored so foreign values survive
    Log(Vec<Value>),
}

impl FieldValue {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Scalar(stamp) => stamp.to_value(),
            Self::Log(entries) => Value::Array(entries.clone()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}
