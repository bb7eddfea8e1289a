//! Construction-time validation failures.
//!
//! Everything here fails fast at build time; nothing is silently clamped.
//! Evaluation-time failures travel as [`cadence_core::PropertyError`] and
//! are isolated per animation by the frame clock.

use std::time::Duration;

use cadence_core::ValueKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnimationError {
    #[error("spline control point {name}={value} must be finite")]
    SplineControlNotFinite { name: &'static str, value: f64 },

    #[error("spline control point {name}={value} must lie in [0, 1]")]
    SplineControlOutOfRange { name: &'static str, value: f64 },

    #[error("tangent interpolator value {0} must be finite")]
    TangentValueNotFinite(f64),

    #[error("two key frames share the time offset {0:?}")]
    DuplicateKeyFrameTime(Duration),

    #[error("key values for one property mix {first:?} and {second:?} values")]
    MismatchedValueKinds { first: ValueKind, second: ValueKind },

    #[error("playback rate {0} must be finite and non-zero")]
    InvalidRate(f64),

    #[error("cycle count {0} must be positive or INDEFINITE")]
    InvalidCycleCount(i32),
}
