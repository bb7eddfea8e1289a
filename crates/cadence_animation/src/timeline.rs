//! Timeline state machine and per-property track evaluation.
//!
//! A timeline owns an ordered set of key frames and, for any position inside
//! its cycle, computes which interpolated values apply to each targeted
//! property. Positions are tracked in the 6000/s tick unit; one write per
//! property per pulse, coalesced at the final position of the tick.

use std::fmt;
use std::time::Duration;

use cadence_core::{
    duration_from_ticks, ticks_f64, AnimValue, PropertyError, PropertyTarget, ValueKind,
};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::debug;

use crate::error::AnimationError;
use crate::interpolator::Interpolator;
use crate::keyframe::{KeyFrame, OnReached};

/// Cycle count for unbounded playback.
pub const INDEFINITE: i32 = -1;

/// Playback status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Stopped,
    Paused,
    Running,
}

impl Status {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Status::Stopped => 0,
            Status::Paused => 1,
            Status::Running => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Status::Paused,
            2 => Status::Running,
            _ => Status::Stopped,
        }
    }
}

/// Callback fired on the pulse thread when the last cycle completes.
pub type OnFinished = Box<dyn FnMut() + Send>;

/// One interpolation point of a per-property track.
struct TrackPoint {
    ticks: i64,
    value: AnimValue,
    interpolator: Option<Interpolator>,
}

/// All points targeting one property, ascending by tick offset.
struct Track {
    target: Arc<dyn PropertyTarget>,
    points: Vec<TrackPoint>,
}

impl Track {
    /// Value this track pins at the given position, or `None` while the
    /// position is still ahead of the first defining frame (the property is
    /// untouched until then; no pre-play snapshot is taken).
    fn sample(&self, pos: f64, default: &Interpolator) -> Option<AnimValue> {
        let first = self.points.first()?;
        if pos < first.ticks as f64 {
            return None;
        }
        let next_idx = match self.points.iter().position(|p| p.ticks as f64 >= pos) {
            Some(idx) => idx,
            // Past the last defining frame: hold its value.
            None => return Some(self.points[self.points.len() - 1].value.clone()),
        };
        if next_idx == 0 {
            return Some(self.points[0].value.clone());
        }
        let prev = &self.points[next_idx - 1];
        let next = &self.points[next_idx];
        let span = (next.ticks - prev.ticks) as f64;
        let fraction = (pos - prev.ticks as f64) / span;
        Some(blend_segment(prev, next, fraction, default))
    }
}

/// Blend one bracketed segment; the arriving key value's interpolator wins,
/// falling back to the timeline default. Segments touching a tangent
/// interpolator on either end take the Hermite path.
fn blend_segment(
    prev: &TrackPoint,
    next: &TrackPoint,
    fraction: f64,
    default: &Interpolator,
) -> AnimValue {
    let arriving = next.interpolator.as_ref().unwrap_or(default);
    let tangent_involved = matches!(arriving, Interpolator::Tangent(_))
        || matches!(prev.interpolator, Some(Interpolator::Tangent(_)));
    if tangent_involved {
        if let (Some(a), Some(b)) = (prev.value.as_f64(), next.value.as_f64()) {
            let v = hermite_segment(prev, next, a, b, fraction, arriving);
            return numeric_like(&prev.value, v);
        }
    }
    arriving.interpolate(&prev.value, &next.value, fraction)
}

/// Cubic Hermite over one segment, boundary slopes taken from the tangent
/// (duration, value) pairs in tick units; a missing tangent on either side
/// falls back to the chord slope (Catmull-Rom flavor).
fn hermite_segment(
    prev: &TrackPoint,
    next: &TrackPoint,
    a: f64,
    b: f64,
    fraction: f64,
    arriving: &Interpolator,
) -> f64 {
    if fraction <= 0.0 {
        return a;
    }
    if fraction >= 1.0 {
        return b;
    }
    let seg = (next.ticks - prev.ticks) as f64;
    let chord = b - a;
    let m0 = match &prev.interpolator {
        Some(Interpolator::Tangent(t)) if t.out_ticks() > 0 => {
            (t.out_value() - a) / t.out_ticks() as f64 * seg
        }
        _ => chord,
    };
    let m1 = match arriving {
        Interpolator::Tangent(t) if t.in_ticks() > 0 => {
            (b - t.in_value()) / t.in_ticks() as f64 * seg
        }
        _ => chord,
    };
    let f2 = fraction * fraction;
    let f3 = f2 * fraction;
    (2.0 * f3 - 3.0 * f2 + 1.0) * a
        + (f3 - 2.0 * f2 + fraction) * m0
        + (-2.0 * f3 + 3.0 * f2) * b
        + (f3 - f2) * m1
}

/// Rebuild an `AnimValue` of the same numeric kind as `like`.
fn numeric_like(like: &AnimValue, v: f64) -> AnimValue {
    match like {
        AnimValue::Int(_) => AnimValue::Int(v.round() as i32),
        AnimValue::Long(_) => AnimValue::Long(v.round() as i64),
        _ => AnimValue::Double(v),
    }
}

/// Key frame offset plus its reached callback, kept for crossing detection.
struct FrameMarker {
    ticks: i64,
    on_reached: Option<OnReached>,
}

/// Builder for [`Timeline`].
pub struct TimelineBuilder {
    keyframes: Vec<KeyFrame>,
    cycle_count: i32,
    auto_reverse: bool,
    rate: f64,
    default_interpolator: Interpolator,
    on_finished: Option<OnFinished>,
}

impl Default for TimelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self {
            keyframes: Vec::new(),
            cycle_count: 1,
            auto_reverse: false,
            rate: 1.0,
            default_interpolator: Interpolator::Linear,
            on_finished: None,
        }
    }

    /// Add a key frame; frames may be added in any order.
    pub fn keyframe(mut self, frame: KeyFrame) -> Self {
        self.keyframes.push(frame);
        self
    }

    /// Number of cycles to play, or [`INDEFINITE`].
    pub fn cycle_count(mut self, count: i32) -> Self {
        self.cycle_count = count;
        self
    }

    /// Alternate playback direction each cycle instead of restarting.
    pub fn auto_reverse(mut self, enabled: bool) -> Self {
        self.auto_reverse = enabled;
        self
    }

    /// Signed playback speed; negative rates play backward.
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Interpolator used by key values without an explicit override.
    pub fn default_interpolator(mut self, interpolator: Interpolator) -> Self {
        self.default_interpolator = interpolator;
        self
    }

    /// Run a callback on the pulse thread when the last cycle completes.
    pub fn on_finished(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_finished = Some(Box::new(callback));
        self
    }

    pub fn build(mut self) -> Result<Timeline, AnimationError> {
        if !self.rate.is_finite() || self.rate == 0.0 {
            return Err(AnimationError::InvalidRate(self.rate));
        }
        if self.cycle_count != INDEFINITE && self.cycle_count <= 0 {
            return Err(AnimationError::InvalidCycleCount(self.cycle_count));
        }

        self.keyframes.sort_by_key(KeyFrame::offset_ticks);
        for pair in self.keyframes.windows(2) {
            if pair[0].offset_ticks() == pair[1].offset_ticks() {
                return Err(AnimationError::DuplicateKeyFrameTime(pair[1].offset()));
            }
        }

        let mut frames = Vec::with_capacity(self.keyframes.len());
        let mut tracks: Vec<Track> = Vec::new();
        let mut track_index: FxHashMap<usize, (usize, ValueKind)> = FxHashMap::default();

        for frame in &self.keyframes {
            frames.push(FrameMarker {
                ticks: frame.offset_ticks(),
                on_reached: frame.on_reached().cloned(),
            });
            for value in frame.values() {
                let kind = value.end_value().kind();
                let point = TrackPoint {
                    ticks: frame.offset_ticks(),
                    value: value.end_value().clone(),
                    interpolator: value.interpolator().cloned(),
                };
                match track_index.get(&value.target_key()) {
                    Some(&(idx, first_kind)) => {
                        if first_kind != kind {
                            return Err(AnimationError::MismatchedValueKinds {
                                first: first_kind,
                                second: kind,
                            });
                        }
                        tracks[idx].points.push(point);
                    }
                    None => {
                        track_index.insert(value.target_key(), (tracks.len(), kind));
                        tracks.push(Track {
                            target: value.target().clone(),
                            points: vec![point],
                        });
                    }
                }
            }
        }

        let duration_ticks = frames.last().map(|f| f.ticks).unwrap_or(0);

        Ok(Timeline {
            frames,
            tracks,
            duration_ticks,
            cycle_count: self.cycle_count,
            auto_reverse: self.auto_reverse,
            rate: self.rate,
            default_interpolator: self.default_interpolator,
            on_finished: self.on_finished,
            status: Status::Stopped,
            position: 0.0,
            forward: true,
            completed_cycles: 0,
            just_started: false,
        })
    }
}

/// A time-ordered set of key frames with playback state.
///
/// A timeline may be driven directly through [`Timeline::advance`] on a
/// single thread, or registered with a
/// [`FrameClock`](crate::clock::FrameClock) which drives all registered
/// timelines from one pulse and accepts control from any thread.
pub struct Timeline {
    frames: Vec<FrameMarker>,
    tracks: Vec<Track>,
    /// Cycle length in ticks; the offset of the last key frame.
    duration_ticks: i64,
    cycle_count: i32,
    auto_reverse: bool,
    rate: f64,
    default_interpolator: Interpolator,
    on_finished: Option<OnFinished>,
    status: Status,
    /// Position within the current cycle, in ticks.
    position: f64,
    /// Direction of the current cycle; auto-reverse flips it.
    forward: bool,
    completed_cycles: i32,
    /// Makes the first leg of the next step inclusive of its start offset.
    just_started: bool,
}

impl Timeline {
    pub fn builder() -> TimelineBuilder {
        TimelineBuilder::new()
    }

    /// Start or resume playback. Resuming from a pause keeps the position;
    /// starting from a stop rewinds to the direction-appropriate bound.
    pub fn play(&mut self) {
        match self.status {
            Status::Running => {}
            Status::Paused => {
                self.status = Status::Running;
                debug!("timeline resumed");
            }
            Status::Stopped => {
                self.completed_cycles = 0;
                self.forward = true;
                self.position = if self.rate >= 0.0 {
                    0.0
                } else {
                    self.duration_ticks as f64
                };
                self.just_started = true;
                self.status = Status::Running;
                debug!("timeline started");
            }
        }
    }

    /// Freeze the position. No-op unless running.
    pub fn pause(&mut self) {
        if self.status == Status::Running {
            self.status = Status::Paused;
            debug!("timeline paused");
        }
    }

    /// Reset to the cycle start. Writes already applied are not rolled back.
    /// No-op when already stopped.
    pub fn stop(&mut self) {
        if self.status != Status::Stopped {
            self.status = Status::Stopped;
            self.position = 0.0;
            self.forward = true;
            self.completed_cycles = 0;
            self.just_started = false;
            debug!("timeline stopped");
        }
    }

    /// Move the playhead, clamped into the cycle. Takes effect on the next
    /// evaluation; fires no reached callbacks.
    pub fn seek(&mut self, offset: Duration) {
        self.position = ticks_f64(offset).clamp(0.0, self.duration_ticks as f64);
        self.just_started = false;
    }

    /// Change the signed playback speed.
    pub fn set_rate(&mut self, rate: f64) -> Result<(), AnimationError> {
        if !rate.is_finite() || rate == 0.0 {
            return Err(AnimationError::InvalidRate(rate));
        }
        self.rate = rate;
        Ok(())
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Playhead position within the current cycle.
    pub fn current_time(&self) -> Duration {
        Duration::from_secs_f64(self.position.max(0.0) / ticks_f64(Duration::from_secs(1)))
    }

    /// Cycle length, the offset of the last key frame.
    pub fn duration(&self) -> Duration {
        duration_from_ticks(self.duration_ticks)
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn cycle_count(&self) -> i32 {
        self.cycle_count
    }

    pub fn auto_reverse(&self) -> bool {
        self.auto_reverse
    }

    /// Advance by one pulse delta and apply property writes.
    ///
    /// Returns whether any property changed. A write failure leaves the
    /// timeline running; the frame clock force-stops it instead so the error
    /// policy stays in one place.
    pub fn advance(&mut self, delta: Duration) -> Result<bool, PropertyError> {
        self.step(ticks_f64(delta))
    }

    /// Stop without firing the finished callback; used when evaluation fails.
    pub(crate) fn force_stop(&mut self) {
        self.status = Status::Stopped;
        self.just_started = false;
        debug!("timeline force-stopped after evaluation failure");
    }

    pub(crate) fn step(&mut self, delta_ticks: f64) -> Result<bool, PropertyError> {
        if self.status != Status::Running {
            return Ok(false);
        }

        // Zero-length timeline: everything happens on the first pulse.
        if self.duration_ticks == 0 {
            if !self.just_started {
                return Ok(false);
            }
            self.just_started = false;
            for marker in &self.frames {
                if let Some(callback) = &marker.on_reached {
                    callback();
                }
            }
            let changed = self.apply_writes()?;
            self.finish();
            return Ok(changed);
        }

        let dur = self.duration_ticks as f64;
        let mut v = self.rate * if self.forward { 1.0 } else { -1.0 };
        // Monotonic legs travelled this pulse, for reached-callback crossing
        // detection across cycle boundaries.
        let mut legs: SmallVec<[(f64, f64, bool); 4]> = SmallVec::new();
        let mut leg_start = self.position;
        let mut include_start = self.just_started;
        self.just_started = false;
        let mut pos = self.position + v * delta_ticks;
        let mut finished = false;

        loop {
            if v > 0.0 && pos >= dur {
                legs.push((leg_start, dur, include_start));
                self.completed_cycles = self.completed_cycles.saturating_add(1);
                if self.cycles_exhausted() {
                    pos = dur;
                    finished = true;
                    break;
                }
                if self.auto_reverse {
                    self.forward = !self.forward;
                    v = -v;
                    pos = 2.0 * dur - pos;
                    leg_start = dur;
                    include_start = false;
                } else {
                    pos -= dur;
                    leg_start = 0.0;
                    include_start = true;
                }
            } else if v < 0.0 && pos <= 0.0 {
                legs.push((leg_start, 0.0, include_start));
                self.completed_cycles = self.completed_cycles.saturating_add(1);
                if self.cycles_exhausted() {
                    pos = 0.0;
                    finished = true;
                    break;
                }
                if self.auto_reverse {
                    self.forward = !self.forward;
                    v = -v;
                    pos = -pos;
                    leg_start = 0.0;
                    include_start = false;
                } else {
                    pos += dur;
                    leg_start = dur;
                    include_start = true;
                }
            } else {
                legs.push((leg_start, pos, include_start));
                break;
            }
        }

        self.fire_reached(&legs);
        self.position = pos;
        let changed = self.apply_writes()?;

        if finished {
            self.finish();
        }
        Ok(changed)
    }

    fn cycles_exhausted(&self) -> bool {
        self.cycle_count != INDEFINITE && self.completed_cycles >= self.cycle_count
    }

    fn finish(&mut self) {
        self.status = Status::Stopped;
        debug!(cycles = self.completed_cycles, "timeline finished");
        if let Some(callback) = self.on_finished.as_mut() {
            callback();
        }
    }

    /// Fire reached callbacks for every frame offset a leg crossed, in
    /// playback order. Leg starts are exclusive unless flagged, so an offset
    /// landed on exactly does not refire on the next pulse.
    fn fire_reached(&self, legs: &[(f64, f64, bool)]) {
        for &(from, to, inclusive) in legs {
            if to >= from {
                for marker in &self.frames {
                    let k = marker.ticks as f64;
                    let after_start = if inclusive { k >= from } else { k > from };
                    if after_start && k <= to {
                        if let Some(callback) = &marker.on_reached {
                            callback();
                        }
                    }
                }
            } else {
                for marker in self.frames.iter().rev() {
                    let k = marker.ticks as f64;
                    let before_start = if inclusive { k <= from } else { k < from };
                    if before_start && k >= to {
                        if let Some(callback) = &marker.on_reached {
                            callback();
                        }
                    }
                }
            }
        }
    }

    /// One coalesced write per targeted property at the current position.
    fn apply_writes(&self) -> Result<bool, PropertyError> {
        let mut changed = false;
        for track in &self.tracks {
            if let Some(value) = track.sample(self.position, &self.default_interpolator) {
                if track.target.get() != value {
                    track.target.set(value)?;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("status", &self.status)
            .field("position_ticks", &self.position)
            .field("duration_ticks", &self.duration_ticks)
            .field("rate", &self.rate)
            .field("cycle_count", &self.cycle_count)
            .field("auto_reverse", &self.auto_reverse)
            .field("tracks", &self.tracks.len())
            .finish()
    }
}
