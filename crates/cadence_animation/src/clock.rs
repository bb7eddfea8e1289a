//! Frame clock, control handles, and the pulse driver.
//!
//! All registered timelines and frame timers advance on one thread, the
//! thread that calls [`FrameClock::tick`]. Control from other threads goes
//! through cloneable handles whose commands queue on a channel and apply at
//! the next tick boundary, so timeline internals need no locks. Handles read
//! playback status from atomic cells the clock publishes once per tick;
//! between ticks those reads may be one pulse stale.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use slotmap::{new_key_type, SlotMap};
use tracing::{debug, warn};

use crate::timeline::{Status, Timeline};

new_key_type! {
    pub struct TimelineId;
    pub struct TimerId;
}

/// Pulse interval of the spawned driver thread, about 60 per second.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// Callback invoked every pulse with the time elapsed since it was started.
pub type TimerCallback = Box<dyn FnMut(Duration) + Send>;

enum Command {
    Play(TimelineId),
    Pause(TimelineId),
    Stop(TimelineId),
    Seek(TimelineId, Duration),
    SetRate(TimelineId, f64),
    StartTimer(TimerId),
    StopTimer(TimerId),
}

struct TimelineSlot {
    timeline: Timeline,
    status_cell: Arc<AtomicU8>,
}

struct TimerSlot {
    callback: TimerCallback,
    running: bool,
    elapsed: Duration,
    running_cell: Arc<AtomicBool>,
}

/// Owns all timelines and frame timers and advances them from one thread.
///
/// Register everything up front, hand the clock to a [`PulseDriver`] (or call
/// [`tick`](FrameClock::tick) yourself from an event loop), and control
/// playback through the returned handles.
pub struct FrameClock {
    timelines: SlotMap<TimelineId, TimelineSlot>,
    timers: SlotMap<TimerId, TimerSlot>,
    commands: Receiver<Command>,
    sender: Sender<Command>,
    on_render: Option<Box<dyn FnMut() + Send>>,
}

impl FrameClock {
    pub fn new() -> Self {
        let (sender, commands) = mpsc::channel();
        Self {
            timelines: SlotMap::with_key(),
            timers: SlotMap::with_key(),
            commands,
            sender,
            on_render: None,
        }
    }

    /// Register a timeline; the returned handle controls it from any thread.
    pub fn register(&mut self, timeline: Timeline) -> TimelineHandle {
        let status_cell = Arc::new(AtomicU8::new(timeline.status().to_u8()));
        let id = self.timelines.insert(TimelineSlot {
            timeline,
            status_cell: status_cell.clone(),
        });
        debug!(?id, "timeline registered");
        TimelineHandle {
            id,
            sender: self.sender.clone(),
            status: status_cell,
        }
    }

    /// Take a timeline back out of the clock. Outstanding handle commands for
    /// it are dropped at the next tick.
    pub fn remove(&mut self, id: TimelineId) -> Option<Timeline> {
        self.timelines.remove(id).map(|slot| {
            slot.status_cell
                .store(slot.timeline.status().to_u8(), Ordering::Release);
            slot.timeline
        })
    }

    pub fn timeline(&self, id: TimelineId) -> Option<&Timeline> {
        self.timelines.get(id).map(|slot| &slot.timeline)
    }

    pub fn timeline_mut(&mut self, id: TimelineId) -> Option<&mut Timeline> {
        self.timelines.get_mut(id).map(|slot| &mut slot.timeline)
    }

    /// Register a per-pulse callback; it runs every tick while started and
    /// receives the time accumulated since it was started.
    pub fn add_timer(&mut self, callback: impl FnMut(Duration) + Send + 'static) -> TimerHandle {
        let running_cell = Arc::new(AtomicBool::new(false));
        let id = self.timers.insert(TimerSlot {
            callback: Box::new(callback),
            running: false,
            elapsed: Duration::ZERO,
            running_cell: running_cell.clone(),
        });
        TimerHandle {
            id,
            sender: self.sender.clone(),
            running: running_cell,
        }
    }

    pub fn remove_timer(&mut self, id: TimerId) -> bool {
        match self.timers.remove(id) {
            Some(slot) => {
                slot.running_cell.store(false, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Run a callback at the end of every tick in which a property changed.
    pub fn on_render(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_render = Some(Box::new(callback));
    }

    /// Advance the clock by one pulse: apply queued handle commands, step
    /// every running timeline and timer, publish status cells, and fire the
    /// render callback if any property changed.
    ///
    /// A timeline whose evaluation fails or panics is stopped and logged;
    /// the rest of the tick proceeds. Returns whether any property changed.
    pub fn tick(&mut self, delta: Duration) -> bool {
        self.drain_commands();

        let mut changed = false;
        for (id, slot) in self.timelines.iter_mut() {
            if slot.timeline.status() != Status::Running {
                continue;
            }
            match panic::catch_unwind(AssertUnwindSafe(|| slot.timeline.advance(delta))) {
                Ok(Ok(wrote)) => changed |= wrote,
                Ok(Err(err)) => {
                    warn!(?id, %err, "timeline property write failed, stopping it");
                    slot.timeline.force_stop();
                }
                Err(_) => {
                    warn!(?id, "timeline callback panicked, stopping it");
                    slot.timeline.force_stop();
                }
            }
        }

        for (id, timer) in self.timers.iter_mut() {
            if !timer.running {
                continue;
            }
            timer.elapsed += delta;
            let elapsed = timer.elapsed;
            let callback = &mut timer.callback;
            if panic::catch_unwind(AssertUnwindSafe(|| callback(elapsed))).is_err() {
                warn!(?id, "frame timer panicked, stopping it");
                timer.running = false;
            }
        }

        self.publish();

        if changed {
            if let Some(render) = self.on_render.as_mut() {
                render();
            }
        }
        changed
    }

    /// Whether any timeline or timer still wants pulses.
    pub fn has_active(&self) -> bool {
        self.timelines
            .iter()
            .any(|(_, slot)| slot.timeline.status() == Status::Running)
            || self.timers.iter().any(|(_, timer)| timer.running)
    }

    pub fn timeline_count(&self) -> usize {
        self.timelines.len()
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Play(id) => {
                    if let Some(slot) = self.timelines.get_mut(id) {
                        slot.timeline.play();
                    }
                }
                Command::Pause(id) => {
                    if let Some(slot) = self.timelines.get_mut(id) {
                        slot.timeline.pause();
                    }
                }
                Command::Stop(id) => {
                    if let Some(slot) = self.timelines.get_mut(id) {
                        slot.timeline.stop();
                    }
                }
                Command::Seek(id, offset) => {
                    if let Some(slot) = self.timelines.get_mut(id) {
                        slot.timeline.seek(offset);
                    }
                }
                Command::SetRate(id, rate) => {
                    if let Some(slot) = self.timelines.get_mut(id) {
                        if let Err(err) = slot.timeline.set_rate(rate) {
                            warn!(?id, %err, "ignoring rate change");
                        }
                    }
                }
                Command::StartTimer(id) => {
                    if let Some(timer) = self.timers.get_mut(id) {
                        timer.running = true;
                        timer.elapsed = Duration::ZERO;
                    }
                }
                Command::StopTimer(id) => {
                    if let Some(timer) = self.timers.get_mut(id) {
                        timer.running = false;
                    }
                }
            }
        }
    }

    /// One publish per tick; handle reads between ticks see the last value.
    fn publish(&self) {
        for (_, slot) in self.timelines.iter() {
            slot.status_cell
                .store(slot.timeline.status().to_u8(), Ordering::Release);
        }
        for (_, timer) in self.timers.iter() {
            timer.running_cell.store(timer.running, Ordering::Release);
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Cross-thread control for one registered timeline.
///
/// Commands queue and take effect at the next tick; [`status`] reads the
/// value published at the last tick boundary, never blocking on the pulse
/// thread.
///
/// [`status`]: TimelineHandle::status
#[derive(Clone)]
pub struct TimelineHandle {
    id: TimelineId,
    sender: Sender<Command>,
    status: Arc<AtomicU8>,
}

impl TimelineHandle {
    pub fn id(&self) -> TimelineId {
        self.id
    }

    pub fn play(&self) {
        let _ = self.sender.send(Command::Play(self.id));
    }

    pub fn pause(&self) {
        let _ = self.sender.send(Command::Pause(self.id));
    }

    pub fn stop(&self) {
        let _ = self.sender.send(Command::Stop(self.id));
    }

    pub fn seek(&self, offset: Duration) {
        let _ = self.sender.send(Command::Seek(self.id, offset));
    }

    /// Change the playback rate. Invalid rates are rejected and logged when
    /// the command is applied.
    pub fn set_rate(&self, rate: f64) {
        let _ = self.sender.send(Command::SetRate(self.id, rate));
    }

    /// Playback status as of the last completed tick.
    pub fn status(&self) -> Status {
        Status::from_u8(self.status.load(Ordering::Acquire))
    }
}

/// Cross-thread control for one frame timer.
#[derive(Clone)]
pub struct TimerHandle {
    id: TimerId,
    sender: Sender<Command>,
    running: Arc<AtomicBool>,
}

impl TimerHandle {
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Start the timer from zero elapsed at the next tick.
    pub fn start(&self) {
        let _ = self.sender.send(Command::StartTimer(self.id));
    }

    pub fn stop(&self) {
        let _ = self.sender.send(Command::StopTimer(self.id));
    }

    /// Whether the timer was running as of the last completed tick.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Owns a background thread that ticks a [`FrameClock`] at a fixed interval.
pub struct PulseDriver {
    thread: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl PulseDriver {
    /// Move the clock onto a pulse thread ticking at
    /// [`DEFAULT_FRAME_INTERVAL`].
    pub fn spawn(clock: FrameClock) -> Self {
        Self::spawn_with_interval(clock, DEFAULT_FRAME_INTERVAL)
    }

    pub fn spawn_with_interval(mut clock: FrameClock, interval: Duration) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();
        let thread = thread::spawn(move || {
            let mut last = Instant::now();
            while !flag.load(Ordering::Relaxed) {
                thread::sleep(interval);
                let now = Instant::now();
                clock.tick(now - last);
                last = now;
            }
            debug!("pulse thread shut down");
        });
        Self {
            thread: Some(thread),
            shutdown,
        }
    }

    /// Stop the pulse thread and wait for its current tick to finish.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for PulseDriver {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
