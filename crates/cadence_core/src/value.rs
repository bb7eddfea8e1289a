//! Animatable values.
//!
//! The timing core only understands a closed set of value kinds. Numeric
//! kinds blend through an eased fraction; `Bool` and `Text` step at the end
//! of a segment. Anything richer lives behind a property endpoint supplied
//! by the scene layer.

use thiserror::Error;

/// Discriminant for the value kinds the timing core understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Double,
    Int,
    Long,
    Bool,
    Text,
}

/// A value carried by a key frame or held by a property endpoint.
#[derive(Clone, Debug, PartialEq)]
pub enum AnimValue {
    Double(f64),
    Int(i32),
    Long(i64),
    /// Thresholds at the end of a segment, never blends.
    Bool(bool),
    /// Step fallback for values with no numeric blend.
    Text(String),
}

impl AnimValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            AnimValue::Double(_) => ValueKind::Double,
            AnimValue::Int(_) => ValueKind::Int,
            AnimValue::Long(_) => ValueKind::Long,
            AnimValue::Bool(_) => ValueKind::Bool,
            AnimValue::Text(_) => ValueKind::Text,
        }
    }

    /// Numeric view used by the track evaluator; `None` for `Bool`/`Text`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AnimValue::Double(v) => Some(*v),
            AnimValue::Int(v) => Some(*v as f64),
            AnimValue::Long(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl From<f64> for AnimValue {
    fn from(v: f64) -> Self {
        AnimValue::Double(v)
    }
}

impl From<i32> for AnimValue {
    fn from(v: i32) -> Self {
        AnimValue::Int(v)
    }
}

impl From<i64> for AnimValue {
    fn from(v: i64) -> Self {
        AnimValue::Long(v)
    }
}

impl From<bool> for AnimValue {
    fn from(v: bool) -> Self {
        AnimValue::Bool(v)
    }
}

impl From<String> for AnimValue {
    fn from(v: String) -> Self {
        AnimValue::Text(v)
    }
}

impl From<&str> for AnimValue {
    fn from(v: &str) -> Self {
        AnimValue::Text(v.to_owned())
    }
}

/// Error produced by a property endpoint rejecting a write.
#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("value kind mismatch: property holds {expected:?}, write was {actual:?}")]
    KindMismatch {
        expected: ValueKind,
        actual: ValueKind,
    },
    #[error("property rejected write: {0}")]
    Rejected(String),
}
