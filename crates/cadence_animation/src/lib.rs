//! Timed animation for Cadence: interpolators, key frames, timelines, and
//! the frame clock that pulses them.
//!
//! A [`Timeline`] interpolates [`SharedProperty`](cadence_core::SharedProperty)
//! values between [`KeyFrame`] offsets. Timelines can be stepped directly, or
//! registered with a [`FrameClock`] that advances everything from one pulse
//! and takes commands from any thread through [`TimelineHandle`]s.
//!
//! ```
//! use std::time::Duration;
//! use cadence_animation::{FrameClock, KeyFrame, Timeline};
//! use cadence_core::{AnimValue, SharedProperty};
//!
//! let opacity = SharedProperty::new(0.0);
//! let target = opacity.target();
//!
//! let fade_in = Timeline::builder()
//!     .keyframe(KeyFrame::at(Duration::ZERO).value(&target, 0.0).build())
//!     .keyframe(KeyFrame::at(Duration::from_secs(1)).value(&target, 10.0).build())
//!     .build()?;
//!
//! let mut clock = FrameClock::new();
//! let handle = clock.register(fade_in);
//!
//! handle.play();
//! clock.tick(Duration::from_millis(500));
//! assert_eq!(opacity.value(), AnimValue::Double(5.0));
//! # Ok::<(), cadence_animation::AnimationError>(())
//! ```

pub mod clock;
pub mod error;
pub mod interpolator;
pub mod keyframe;
pub mod timeline;

pub use clock::{
    FrameClock, PulseDriver, TimelineHandle, TimelineId, TimerHandle, TimerId,
    DEFAULT_FRAME_INTERVAL,
};
pub use error::AnimationError;
pub use interpolator::{Interpolator, SplineInterpolator, TangentInterpolator};
pub use keyframe::{KeyFrame, KeyFrameBuilder, KeyValue, OnReached};
pub use timeline::{OnFinished, Status, Timeline, TimelineBuilder, INDEFINITE};
