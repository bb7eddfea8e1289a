//! Cycle, auto-reverse, and callback semantics across whole playbacks.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cadence_animation::{Interpolator, KeyFrame, Status, Timeline, INDEFINITE};
use cadence_core::{AnimValue, SharedProperty};

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

fn ramp(prop: &SharedProperty, from: f64, to: f64, over: Duration) -> cadence_animation::TimelineBuilder {
    let target = prop.target();
    Timeline::builder()
        .keyframe(KeyFrame::at(Duration::ZERO).value(&target, from).build())
        .keyframe(KeyFrame::at(over).value(&target, to).build())
}

#[test]
fn two_autoreverse_cycles_land_back_at_start() -> anyhow::Result<()> {
    let prop = SharedProperty::new(0.0);
    let mut tl = ramp(&prop, 0.0, 10.0, secs(3.0))
        .cycle_count(2)
        .auto_reverse(true)
        .build()?;
    tl.play();

    tl.advance(secs(1.5))?;
    assert_eq!(prop.value(), AnimValue::Double(5.0));
    assert_eq!(tl.status(), Status::Running);

    // 4.5s total: 1.5s into the reverse cycle, descending through 5 again
    tl.advance(secs(3.0))?;
    assert_eq!(prop.value(), AnimValue::Double(5.0));
    assert_eq!(tl.status(), Status::Running);

    // 6s total: exactly at the end of the second cycle
    tl.advance(secs(1.5))?;
    assert_eq!(prop.value(), AnimValue::Double(0.0));
    assert_eq!(tl.status(), Status::Stopped);
    Ok(())
}

#[test]
fn non_reversing_finish_holds_the_end_value() {
    let prop = SharedProperty::new(0.0);
    let mut tl = ramp(&prop, 0.0, 10.0, secs(1.0))
        .cycle_count(2)
        .build()
        .unwrap();
    tl.play();

    tl.advance(secs(5.0)).unwrap();
    assert_eq!(tl.status(), Status::Stopped);
    assert_eq!(prop.value(), AnimValue::Double(10.0));
}

#[test]
fn indefinite_timeline_keeps_running() {
    let prop = SharedProperty::new(0.0);
    let mut tl = ramp(&prop, 0.0, 10.0, secs(1.0))
        .cycle_count(INDEFINITE)
        .build()
        .unwrap();
    tl.play();

    for _ in 0..49 {
        tl.advance(secs(0.5)).unwrap();
        assert_eq!(tl.status(), Status::Running);
    }
    // 24.5s into 1s cycles: halfway up the 25th
    assert_eq!(prop.value(), AnimValue::Double(5.0));
}

#[test]
fn wrap_refires_the_start_frame_each_cycle() {
    let starts = Arc::new(AtomicU32::new(0));
    let counter = starts.clone();
    let prop = SharedProperty::new(0.0);
    let target = prop.target();
    let mut tl = Timeline::builder()
        .keyframe(
            KeyFrame::at(Duration::ZERO)
                .value(&target, 0.0)
                .on_reached(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .build(),
        )
        .keyframe(KeyFrame::at(secs(1.0)).value(&target, 10.0).build())
        .cycle_count(3)
        .build()
        .unwrap();
    tl.play();

    // One big pulse spanning all three cycles: the start frame fires at
    // play and once per wrap
    tl.advance(secs(3.5)).unwrap();
    assert_eq!(tl.status(), Status::Stopped);
    assert_eq!(starts.load(Ordering::SeqCst), 3);
}

#[test]
fn autoreverse_does_not_refire_the_boundary_frame() {
    let ends = Arc::new(AtomicU32::new(0));
    let counter = ends.clone();
    let prop = SharedProperty::new(0.0);
    let target = prop.target();
    let mut tl = Timeline::builder()
        .keyframe(KeyFrame::at(Duration::ZERO).value(&target, 0.0).build())
        .keyframe(
            KeyFrame::at(secs(1.0))
                .value(&target, 10.0)
                .on_reached(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .build(),
        )
        .cycle_count(2)
        .auto_reverse(true)
        .build()
        .unwrap();
    tl.play();

    // Through the reflection in one pulse: the end frame is reached once,
    // not once per direction
    tl.advance(secs(1.5)).unwrap();
    assert_eq!(ends.load(Ordering::SeqCst), 1);
    assert_eq!(prop.value(), AnimValue::Double(5.0));
}

#[test]
fn mid_frame_callbacks_fire_in_travel_order() {
    let order: Arc<std::sync::Mutex<Vec<u32>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
    let prop = SharedProperty::new(0.0);
    let target = prop.target();

    let first = order.clone();
    let second = order.clone();
    let mut tl = Timeline::builder()
        .keyframe(KeyFrame::at(Duration::ZERO).value(&target, 0.0).build())
        .keyframe(
            KeyFrame::at(secs(0.25))
                .on_reached(move || first.lock().unwrap().push(1))
                .build(),
        )
        .keyframe(
            KeyFrame::at(secs(0.75))
                .on_reached(move || second.lock().unwrap().push(2))
                .build(),
        )
        .keyframe(KeyFrame::at(secs(1.0)).value(&target, 10.0).build())
        .cycle_count(2)
        .auto_reverse(true)
        .build()
        .unwrap();
    tl.play();

    // Forward through both markers, reflect, and come back through 0.75
    tl.advance(secs(1.5)).unwrap();
    assert_eq!(order.lock().unwrap().as_slice(), &[1, 2, 2]);
}

#[test]
fn negative_rate_with_autoreverse_bounces_off_zero() {
    let prop = SharedProperty::new(0.0);
    let mut tl = ramp(&prop, 0.0, 10.0, secs(1.0))
        .rate(-1.0)
        .cycle_count(2)
        .auto_reverse(true)
        .build()
        .unwrap();
    tl.play();
    assert_eq!(tl.current_time(), secs(1.0));

    // 1.25s from the end: reflected at zero, now 0.25s up the second cycle
    tl.advance(secs(1.25)).unwrap();
    assert_eq!(prop.value(), AnimValue::Double(2.5));
    assert_eq!(tl.status(), Status::Running);
}

#[test]
fn double_speed_rate_halves_wall_time() {
    let prop = SharedProperty::new(0.0);
    let mut tl = ramp(&prop, 0.0, 10.0, secs(2.0)).rate(2.0).build().unwrap();
    tl.play();

    tl.advance(secs(0.5)).unwrap();
    assert_eq!(prop.value(), AnimValue::Double(5.0));
    tl.advance(secs(0.5)).unwrap();
    assert_eq!(prop.value(), AnimValue::Double(10.0));
    assert_eq!(tl.status(), Status::Stopped);
}

#[test]
fn eased_cycle_still_hits_exact_endpoints() {
    let prop = SharedProperty::new(0.0);
    let target = prop.target();
    let ease = Interpolator::spline(0.25, 0.1, 0.25, 1.0).unwrap();
    let mut tl = Timeline::builder()
        .keyframe(KeyFrame::at(Duration::ZERO).value(&target, 0.0).build())
        .keyframe(
            KeyFrame::at(secs(1.0))
                .value_with(&target, 10.0, ease)
                .build(),
        )
        .cycle_count(2)
        .auto_reverse(true)
        .build()
        .unwrap();
    tl.play();

    tl.advance(secs(1.0)).unwrap();
    assert_eq!(prop.value(), AnimValue::Double(10.0));
    tl.advance(secs(1.0)).unwrap();
    assert_eq!(prop.value(), AnimValue::Double(0.0));
    assert_eq!(tl.status(), Status::Stopped);
}

#[test]
fn restart_after_finish_replays_from_zero() {
    let finishes = Arc::new(AtomicU32::new(0));
    let counter = finishes.clone();
    let prop = SharedProperty::new(0.0);
    let target = prop.target();
    let mut tl = Timeline::builder()
        .keyframe(KeyFrame::at(Duration::ZERO).value(&target, 0.0).build())
        .keyframe(KeyFrame::at(secs(1.0)).value(&target, 10.0).build())
        .on_finished(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    tl.play();
    tl.advance(secs(2.0)).unwrap();
    assert_eq!(finishes.load(Ordering::SeqCst), 1);

    tl.play();
    assert_eq!(tl.current_time(), Duration::ZERO);
    tl.advance(secs(0.5)).unwrap();
    assert_eq!(prop.value(), AnimValue::Double(5.0));
    tl.advance(secs(1.0)).unwrap();
    assert_eq!(finishes.load(Ordering::SeqCst), 2);
}
