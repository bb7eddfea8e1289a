//! Interpolators: eased-fraction curves and value blending.
//!
//! A closed set of curve kinds instead of an open class hierarchy. Numeric
//! values blend through [`Interpolator::curve`]; `Bool` and `Text` values
//! always step at the end of a segment regardless of the curve.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use cadence_core::{ticks_from_duration, AnimValue};

use crate::error::AnimationError;

/// SMIL ease-both acceleration/deceleration share.
const EASE_BOTH_SHARE: f64 = 0.2;

/// Easing curve applied between two key values.
#[derive(Clone)]
pub enum Interpolator {
    /// Constant-speed blend.
    Linear,
    /// Holds the start value until the fraction reaches 1.0.
    Discrete,
    /// Cubic Bezier easing curve in the unit square.
    Spline(SplineInterpolator),
    /// Tangent-based segment; see [`TangentInterpolator`].
    Tangent(TangentInterpolator),
    /// Accelerates through the first 20% and decelerates through the last.
    EaseBoth,
    /// Caller-supplied fraction curve; compared by pointer identity.
    Custom(Arc<dyn Fn(f64) -> f64 + Send + Sync>),
}

impl Interpolator {
    /// Validated cubic Bezier easing curve.
    ///
    /// The x coordinates must lie in [0, 1] so the curve stays a function of
    /// time; y coordinates only need to be finite, which permits overshoot.
    pub fn spline(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self, AnimationError> {
        Ok(Interpolator::Spline(SplineInterpolator::new(
            x1, y1, x2, y2,
        )?))
    }

    /// Tangent interpolator with identical in and out tangents.
    pub fn tangent(duration: Duration, value: f64) -> Result<Self, AnimationError> {
        Ok(Interpolator::Tangent(TangentInterpolator::new(
            duration, value,
        )?))
    }

    /// Tangent interpolator with distinct in and out tangents.
    pub fn tangent_split(
        in_duration: Duration,
        in_value: f64,
        out_duration: Duration,
        out_value: f64,
    ) -> Result<Self, AnimationError> {
        Ok(Interpolator::Tangent(TangentInterpolator::new_split(
            in_duration,
            in_value,
            out_duration,
            out_value,
        )?))
    }

    /// Wrap a caller-supplied fraction curve.
    pub fn custom(curve: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Interpolator::Custom(Arc::new(curve))
    }

    /// Map a progress fraction to an eased fraction.
    ///
    /// Callers clamp the fraction to [0, 1] before invocation; the curve
    /// itself does not clamp, and splines may overshoot mid-curve.
    pub fn curve(&self, t: f64) -> f64 {
        match self {
            Interpolator::Linear => t,
            Interpolator::Discrete => {
                if t < 1.0 {
                    0.0
                } else {
                    1.0
                }
            }
            Interpolator::Spline(spline) => spline.evaluate(t),
            // A tangent curve needs both segment endpoints; on its own it
            // degrades to a constant-speed blend. The track evaluator
            // special-cases tangent segments.
            Interpolator::Tangent(_) => t,
            Interpolator::EaseBoth => ease_both(t),
            Interpolator::Custom(f) => f(t),
        }
    }

    /// Blend two values at the given local fraction.
    ///
    /// Endpoints are exact for every curve and value kind: fraction 0 yields
    /// `start`, fraction 1 yields `end`. `Bool` and `Text` threshold at
    /// fraction 1.0; mismatched kinds degrade to the same step rather than
    /// failing mid-pulse.
    pub fn interpolate(&self, start: &AnimValue, end: &AnimValue, fraction: f64) -> AnimValue {
        if fraction <= 0.0 {
            return start.clone();
        }
        if fraction >= 1.0 {
            return end.clone();
        }
        match (start, end) {
            (AnimValue::Double(a), AnimValue::Double(b)) => {
                AnimValue::Double(a + (b - a) * self.curve(fraction))
            }
            (AnimValue::Int(a), AnimValue::Int(b)) => {
                let delta = (*b as f64 - *a as f64) * self.curve(fraction);
                AnimValue::Int(a + delta.round() as i32)
            }
            (AnimValue::Long(a), AnimValue::Long(b)) => {
                let delta = (*b as f64 - *a as f64) * self.curve(fraction);
                AnimValue::Long(a + delta.round() as i64)
            }
            _ => start.clone(),
        }
    }
}

impl Default for Interpolator {
    fn default() -> Self {
        Interpolator::Linear
    }
}

impl fmt::Debug for Interpolator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interpolator::Linear => write!(f, "Linear"),
            Interpolator::Discrete => write!(f, "Discrete"),
            Interpolator::Spline(s) => f.debug_tuple("Spline").field(s).finish(),
            Interpolator::Tangent(t) => f.debug_tuple("Tangent").field(t).finish(),
            Interpolator::EaseBoth => write!(f, "EaseBoth"),
            Interpolator::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl PartialEq for Interpolator {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Interpolator::Linear, Interpolator::Linear) => true,
            (Interpolator::Discrete, Interpolator::Discrete) => true,
            (Interpolator::EaseBoth, Interpolator::EaseBoth) => true,
            (Interpolator::Spline(a), Interpolator::Spline(b)) => a == b,
            (Interpolator::Tangent(a), Interpolator::Tangent(b)) => a == b,
            (Interpolator::Custom(a), Interpolator::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Interpolator {}

impl Hash for Interpolator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Interpolator::Spline(s) => s.hash(state),
            Interpolator::Tangent(t) => t.hash(state),
            Interpolator::Custom(f) => (Arc::as_ptr(f) as *const () as usize).hash(state),
            _ => {}
        }
    }
}

/// SMIL 1.0 ease-both: quadratic acceleration and deceleration ramps around
/// a constant-speed middle.
fn ease_both(t: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let a = EASE_BOTH_SHARE;
    let scale = 1.0 / (1.0 - a);
    if t < a {
        scale * t * t / (2.0 * a)
    } else if t > 1.0 - a {
        1.0 - scale * (1.0 - t) * (1.0 - t) / (2.0 * a)
    } else {
        scale * (t - a / 2.0)
    }
}

/// Cubic Bezier easing defined by two control points in the unit square.
///
/// Animations deduplicate interpolators, so equality and hashing are
/// structural on the four control parameters.
#[derive(Clone, Copy, Debug)]
pub struct SplineInterpolator {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

impl SplineInterpolator {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self, AnimationError> {
        for (name, value) in [("x1", x1), ("y1", y1), ("x2", x2), ("y2", y2)] {
            if !value.is_finite() {
                return Err(AnimationError::SplineControlNotFinite { name, value });
            }
        }
        for (name, value) in [("x1", x1), ("x2", x2)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AnimationError::SplineControlOutOfRange { name, value });
            }
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    pub fn x1(&self) -> f64 {
        self.x1
    }

    pub fn y1(&self) -> f64 {
        self.y1
    }

    pub fn x2(&self) -> f64 {
        self.x2
    }

    pub fn y2(&self) -> f64 {
        self.y2
    }

    /// Invert the Bezier's X parametrization to find t with X(t) == fraction,
    /// then return Y(t).
    ///
    /// Newton-Raphson with a bisection fallback for flat slopes.
    pub fn evaluate(&self, fraction: f64) -> f64 {
        // Endpoints are always exact
        if fraction <= 0.0 {
            return 0.0;
        }
        if fraction >= 1.0 {
            return 1.0;
        }

        let x = fraction;
        let mut p = x; // initial guess
        for _ in 0..8 {
            let err = bezier_sample(p, self.x1, self.x2) - x;
            if err.abs() < 1e-7 {
                return bezier_sample(p, self.y1, self.y2);
            }
            let slope = bezier_slope(p, self.x1, self.x2);
            if slope.abs() < 1e-7 {
                break; // slope too flat, switch to bisection
            }
            p -= err / slope;
        }

        let mut lo = 0.0_f64;
        let mut hi = 1.0_f64;
        p = x;
        for _ in 0..32 {
            let val = bezier_sample(p, self.x1, self.x2);
            if (val - x).abs() < 1e-7 {
                break;
            }
            if val < x {
                lo = p;
            } else {
                hi = p;
            }
            p = (lo + hi) * 0.5;
        }

        bezier_sample(p, self.y1, self.y2)
    }
}

impl PartialEq for SplineInterpolator {
    fn eq(&self, other: &Self) -> bool {
        self.x1.to_bits() == other.x1.to_bits()
            && self.y1.to_bits() == other.y1.to_bits()
            && self.x2.to_bits() == other.x2.to_bits()
            && self.y2.to_bits() == other.y2.to_bits()
    }
}

impl Eq for SplineInterpolator {}

impl Hash for SplineInterpolator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x1.to_bits().hash(state);
        self.y1.to_bits().hash(state);
        self.x2.to_bits().hash(state);
        self.y2.to_bits().hash(state);
    }
}

/// Evaluate cubic Bezier at parameter t: B(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    // Horner form: (((1-3p2+3p1)t + 3p2-6p1)t + 3p1) * t
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

/// Derivative of the Bezier X/Y polynomial at parameter t.
#[inline]
fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * t + 2.0 * b) * t + c
}

/// Tangent-based (Catmull-Rom-like) interpolation parameters.
///
/// Tangents are (duration, value) pairs anchored at the owning key value: the
/// in-tangent describes how a segment arrives, the out-tangent how the next
/// segment departs. Durations are stored in the internal 6000/s tick unit
/// (milliseconds × 6), so chained short key frames do not drift.
#[derive(Clone, Copy, Debug)]
pub struct TangentInterpolator {
    in_ticks: i64,
    in_value: f64,
    out_ticks: i64,
    out_value: f64,
}

impl TangentInterpolator {
    /// Short form: the out tangent mirrors the in tangent.
    pub fn new(duration: Duration, value: f64) -> Result<Self, AnimationError> {
        Self::new_split(duration, value, duration, value)
    }

    /// Full form with distinct in and out tangents.
    pub fn new_split(
        in_duration: Duration,
        in_value: f64,
        out_duration: Duration,
        out_value: f64,
    ) -> Result<Self, AnimationError> {
        for value in [in_value, out_value] {
            if !value.is_finite() {
                return Err(AnimationError::TangentValueNotFinite(value));
            }
        }
        Ok(Self {
            in_ticks: ticks_from_duration(in_duration),
            in_value,
            out_ticks: ticks_from_duration(out_duration),
            out_value,
        })
    }

    /// In-tangent duration in ticks (1 tick = 1/6 ms).
    pub fn in_ticks(&self) -> i64 {
        self.in_ticks
    }

    pub fn in_value(&self) -> f64 {
        self.in_value
    }

    /// Out-tangent duration in ticks.
    pub fn out_ticks(&self) -> i64 {
        self.out_ticks
    }

    pub fn out_value(&self) -> f64 {
        self.out_value
    }
}

impl PartialEq for TangentInterpolator {
    fn eq(&self, other: &Self) -> bool {
        self.in_ticks == other.in_ticks
            && self.out_ticks == other.out_ticks
            && self.in_value.to_bits() == other.in_value.to_bits()
            && self.out_value.to_bits() == other.out_value.to_bits()
    }
}

impl Eq for TangentInterpolator {}

impl Hash for TangentInterpolator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.in_ticks.hash(state);
        self.in_value.to_bits().hash(state);
        self.out_ticks.hash(state);
        self.out_value.to_bits().hash(state);
    }
}
