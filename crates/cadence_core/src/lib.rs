//! Cadence Core
//!
//! Foundational primitives for the Cadence timing engine:
//!
//! - **Animatable Values**: a closed tagged value type with documented
//!   blending rules per kind
//! - **Property Endpoints**: the read/write capability the scene layer
//!   implements at the boundary
//! - **Tick Units**: the fixed 6000-ticks-per-second time base
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{AnimValue, SharedProperty};
//!
//! let opacity = SharedProperty::new(1.0);
//! opacity.target().set(AnimValue::Double(0.5)).unwrap();
//! assert_eq!(opacity.value(), AnimValue::Double(0.5));
//! ```

pub mod property;
pub mod time;
pub mod value;

pub use property::{PropertyTarget, SharedProperty};
pub use time::{duration_from_ticks, ticks_f64, ticks_from_duration, TICKS_PER_SECOND};
pub use value::{AnimValue, PropertyError, ValueKind};
