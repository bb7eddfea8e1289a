//! Key values and key frames.
//!
//! A key value binds one property endpoint to the value it reaches at the
//! owning key frame's offset, optionally overriding the timeline's default
//! interpolator. Both types are immutable once built.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cadence_core::{ticks_from_duration, AnimValue, PropertyTarget};
use smallvec::SmallVec;

use crate::interpolator::Interpolator;

/// Callback invoked on the pulse thread when a key frame's offset is crossed.
pub type OnReached = Arc<dyn Fn() + Send + Sync>;

/// Binds a property endpoint to its value at the owning key frame's offset.
#[derive(Clone)]
pub struct KeyValue {
    target: Arc<dyn PropertyTarget>,
    end_value: AnimValue,
    interpolator: Option<Interpolator>,
}

impl KeyValue {
    pub fn new(target: Arc<dyn PropertyTarget>, value: impl Into<AnimValue>) -> Self {
        Self {
            target,
            end_value: value.into(),
            interpolator: None,
        }
    }

    pub fn with_interpolator(
        target: Arc<dyn PropertyTarget>,
        value: impl Into<AnimValue>,
        interpolator: Interpolator,
    ) -> Self {
        Self {
            target,
            end_value: value.into(),
            interpolator: Some(interpolator),
        }
    }

    pub fn target(&self) -> &Arc<dyn PropertyTarget> {
        &self.target
    }

    pub fn end_value(&self) -> &AnimValue {
        &self.end_value
    }

    pub fn interpolator(&self) -> Option<&Interpolator> {
        self.interpolator.as_ref()
    }

    /// Property identity: two key values animate the same property iff they
    /// hold the same endpoint allocation.
    pub(crate) fn target_key(&self) -> usize {
        Arc::as_ptr(&self.target) as *const () as usize
    }
}

impl fmt::Debug for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyValue")
            .field("target", &self.target_key())
            .field("end_value", &self.end_value)
            .field("interpolator", &self.interpolator)
            .finish()
    }
}

/// A set of property values reached together at one time offset.
pub struct KeyFrame {
    offset: Duration,
    values: SmallVec<[KeyValue; 4]>,
    on_reached: Option<OnReached>,
}

impl KeyFrame {
    /// Start building a key frame at the given offset from timeline start.
    pub fn at(offset: Duration) -> KeyFrameBuilder {
        KeyFrameBuilder {
            offset,
            values: SmallVec::new(),
            on_reached: None,
        }
    }

    pub fn offset(&self) -> Duration {
        self.offset
    }

    pub fn values(&self) -> &[KeyValue] {
        &self.values
    }

    pub fn on_reached(&self) -> Option<&OnReached> {
        self.on_reached.as_ref()
    }

    pub(crate) fn offset_ticks(&self) -> i64 {
        ticks_from_duration(self.offset)
    }
}

impl fmt::Debug for KeyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyFrame")
            .field("offset", &self.offset)
            .field("values", &self.values)
            .field("on_reached", &self.on_reached.is_some())
            .finish()
    }
}

/// Builder for [`KeyFrame`].
pub struct KeyFrameBuilder {
    offset: Duration,
    values: SmallVec<[KeyValue; 4]>,
    on_reached: Option<OnReached>,
}

impl KeyFrameBuilder {
    /// Add a value reached at this frame, easing with the timeline default.
    pub fn value(self, target: &Arc<dyn PropertyTarget>, value: impl Into<AnimValue>) -> Self {
        self.push(KeyValue::new(target.clone(), value))
    }

    /// Add a value with a per-key-value interpolator override.
    pub fn value_with(
        self,
        target: &Arc<dyn PropertyTarget>,
        value: impl Into<AnimValue>,
        interpolator: Interpolator,
    ) -> Self {
        self.push(KeyValue::with_interpolator(
            target.clone(),
            value,
            interpolator,
        ))
    }

    /// Add an already-constructed key value.
    pub fn key_value(self, value: KeyValue) -> Self {
        self.push(value)
    }

    /// Run a callback on the pulse thread whenever this offset is crossed.
    pub fn on_reached(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_reached = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> KeyFrame {
        KeyFrame {
            offset: self.offset,
            values: self.values,
            on_reached: self.on_reached,
        }
    }

    fn push(mut self, value: KeyValue) -> Self {
        // Two values for the same property in one frame: last wins.
        if let Some(existing) = self
            .values
            .iter_mut()
            .find(|v| v.target_key() == value.target_key())
        {
            *existing = value;
        } else {
            self.values.push(value);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::SharedProperty;

    #[test]
    fn test_builder_collects_values() {
        let x = SharedProperty::new(0.0);
        let y = SharedProperty::new(0.0);
        let xt = x.target();
        let yt = y.target();

        let frame = KeyFrame::at(Duration::from_millis(300))
            .value(&xt, 10.0)
            .value_with(&yt, 20.0, Interpolator::Discrete)
            .build();

        assert_eq!(frame.offset(), Duration::from_millis(300));
        assert_eq!(frame.offset_ticks(), 1800);
        assert_eq!(frame.values().len(), 2);
        assert_eq!(frame.values()[0].end_value(), &AnimValue::Double(10.0));
        assert_eq!(
            frame.values()[1].interpolator(),
            Some(&Interpolator::Discrete)
        );
    }

    #[test]
    fn test_same_target_last_wins() {
        let x = SharedProperty::new(0.0);
        let xt = x.target();

        let frame = KeyFrame::at(Duration::ZERO)
            .value(&xt, 1.0)
            .value(&xt, 2.0)
            .build();

        assert_eq!(frame.values().len(), 1);
        assert_eq!(frame.values()[0].end_value(), &AnimValue::Double(2.0));
    }

    #[test]
    fn test_identity_distinguishes_properties() {
        let x = SharedProperty::new(0.0);
        let y = SharedProperty::new(0.0);
        let a = KeyValue::new(x.target(), 1.0);
        let b = KeyValue::new(x.target(), 2.0);
        let c = KeyValue::new(y.target(), 3.0);

        assert_eq!(a.target_key(), b.target_key());
        assert_ne!(a.target_key(), c.target_key());
    }
}
