//! Field kinds and decoded values

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire representation of a single payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// 8-bit unsigned integer
    UInt8,
    /// 16-bit unsigned integer, little-endian
    UInt16,
    /// 16-bit signed integer, little-endian
    Int16,
    /// 32-bit unsigned integer, little-endian
    UInt32,
    /// Fixed-width ASCII string, NUL padded
    Ascii(usize),
    /// One byte compared against a marker value; true when equal
    Flag(u8),
    /// 16-bit firmware version word rendered as `V{d0}.{d1}.{d2}`
    Version,
}

impl FieldKind {
    /// Returns the size in bytes this field occupies in a payload.
    pub const fn size(&self) -> usize {
        match self {
            FieldKind::UInt8 | FieldKind::Flag(_) => 1,
            FieldKind::UInt16 | FieldKind::Int16 | FieldKind::Version => 2,
            FieldKind::UInt32 => 4,
            FieldKind::Ascii(len) => *len,
        }
    }
}

/// Runtime value of a decoded telemetry field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Numeric view; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}
