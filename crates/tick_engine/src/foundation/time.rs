//! Time management: the fixed-timestep clock and its time/scheduling seams
//!
//! The [`Clock`] turns irregular real-time samples into a sequence of
//! fixed-size simulation ticks using an accumulator
//! (<https://gafferongames.com/post/fix_your_timestep/>). Where real time comes
//! from and when the next sample is taken are injected through
//! [`TimeSource`] and [`FrameScheduler`], so the same clock runs against the
//! wall clock in a game and against a virtual clock in tests.

use crate::events::EventEmitter;
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Default number of simulation ticks per second
pub const DEFAULT_FPS: u32 = 60;

/// Default clamp applied to a single real-time frame, in seconds
pub const DEFAULT_MAX_FRAME_DELTA: f64 = 0.25;

/// Default ratio of simulated time to real time
pub const DEFAULT_TIMESCALE: f64 = 1.0;

// Absorbs float drift when the accumulator holds an exact multiple of the step.
const STEP_EPSILON: f64 = 1e-9;

/// Payload of one fixed simulation step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickEvent {
    /// Simulated seconds covered by this tick (`timescale / fps`)
    pub delta: f64,
    /// Total simulated seconds including this tick
    pub elapsed: f64,
    /// Sequence number of this tick, starting at 1
    pub tick: u64,
}

/// Source of monotonic real time, in seconds
pub trait TimeSource {
    /// Current time in seconds since an arbitrary origin
    fn now(&self) -> f64;
}

/// Decides when the clock gets its next sampling opportunity
pub trait FrameScheduler {
    /// Wait for (or arrange) the next sample. Returns false when no further
    /// sample will happen, which stops the clock.
    fn schedule_next(&mut self) -> bool;

    /// Cancel any pending sample
    fn cancel(&mut self) {}
}

/// Wall-clock time based on [`Instant`]
#[derive(Debug, Clone)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    /// Create a time source whose origin is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Virtual clock advanced by hand
///
/// Clones share the same underlying time, so a test can keep one handle and
/// give the other to the engine.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    now: Rc<Cell<f64>>,
}

impl ManualTimeSource {
    /// Create a virtual clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `seconds`
    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }

    /// Jump to an absolute time
    pub fn set(&self, seconds: f64) {
        self.now.set(seconds);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

/// Scheduler that sleeps the calling thread until the next frame is due
#[derive(Debug)]
pub struct SleepScheduler {
    interval: Duration,
    last: Option<Instant>,
}

impl SleepScheduler {
    /// Sample at most once per `interval`
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Sample at most `rate` times per second
    pub fn with_rate(rate: u32) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / f64::from(rate.max(1))))
    }
}

impl FrameScheduler for SleepScheduler {
    fn schedule_next(&mut self) -> bool {
        let now = Instant::now();
        if let Some(last) = self.last {
            let spent = now.duration_since(last);
            if spent < self.interval {
                std::thread::sleep(self.interval - spent);
            }
        }
        self.last = Some(Instant::now());
        true
    }

    fn cancel(&mut self) {
        self.last = None;
    }
}

/// Scheduler with a fixed budget of frames, for tests and scripted runs
#[derive(Debug, Clone)]
pub struct ManualScheduler {
    remaining: Option<u64>,
}

impl ManualScheduler {
    /// Allow `frames` further samples after the current one
    pub fn frames(frames: u64) -> Self {
        Self {
            remaining: Some(frames),
        }
    }

    /// Never decline a sample
    pub fn unbounded() -> Self {
        Self { remaining: None }
    }

    /// Samples left, `None` when unbounded
    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }
}

impl FrameScheduler for ManualScheduler {
    fn schedule_next(&mut self) -> bool {
        match self.remaining {
            None => true,
            Some(0) => false,
            Some(n) => {
                self.remaining = Some(n - 1);
                true
            }
        }
    }

    fn cancel(&mut self) {
        self.remaining = Some(0);
    }
}

/// Events published by the [`Clock`]
#[derive(Debug, Default)]
pub struct ClockEvents {
    /// Fired once per fixed step
    pub tick: EventEmitter<TickEvent>,
}

/// Fixed-timestep clock
///
/// Every sample adds the (clamped) real time since the previous sample to an
/// accumulator, then drains it in whole `1 / fps` steps. Leftover time stays
/// in the accumulator and is exposed as an interpolation factor for
/// presentation code.
///
/// The timescale only changes the simulated time a tick stands for; ticks are
/// still paid for in real `1 / fps` steps, so the tick rate stays fixed in
/// slow motion and fast forward alike.
pub struct Clock {
    fps: u32,
    max_frame_delta: f64,
    timescale: f64,
    elapsed: f64,
    real_elapsed: f64,
    accumulated: f64,
    ticks: u64,
    last_sample: Option<f64>,
    started: bool,
    time_source: Box<dyn TimeSource>,
    scheduler: Box<dyn FrameScheduler>,
    events: ClockEvents,
}

impl Clock {
    /// Create a stopped clock ticking `fps` times per second against wall time
    pub fn new(fps: u32) -> Self {
        let fps = fps.max(1);
        Self {
            fps,
            max_frame_delta: DEFAULT_MAX_FRAME_DELTA,
            timescale: DEFAULT_TIMESCALE,
            elapsed: 0.0,
            real_elapsed: 0.0,
            accumulated: 0.0,
            ticks: 0,
            last_sample: None,
            started: false,
            time_source: Box::new(SystemTimeSource::new()),
            scheduler: Box::new(SleepScheduler::with_rate(fps)),
            events: ClockEvents::default(),
        }
    }

    /// Builder pattern: set the per-frame clamp in seconds
    pub fn with_max_frame_delta(mut self, max_frame_delta: f64) -> Self {
        self.max_frame_delta = max_frame_delta.max(0.0);
        self
    }

    /// Builder pattern: set the timescale
    pub fn with_timescale(mut self, timescale: f64) -> Self {
        self.set_timescale(timescale);
        self
    }

    /// Set the ratio of simulated to real time, e.g. `0.5` for slow motion
    ///
    /// Negative or non-finite values are ignored.
    pub fn set_timescale(&mut self, timescale: f64) {
        if timescale.is_finite() && timescale >= 0.0 {
            self.timescale = timescale;
        } else {
            log::warn!("Ignoring invalid timescale {}", timescale);
        }
    }

    /// Ratio of simulated to real time
    pub fn timescale(&self) -> f64 {
        self.timescale
    }

    /// Builder pattern: replace the real-time source
    pub fn with_time_source(mut self, time_source: Box<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    /// Builder pattern: replace the frame scheduler
    pub fn with_scheduler(mut self, scheduler: Box<dyn FrameScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Start sampling. Starting an already started clock does nothing.
    ///
    /// The sampling baseline is reset, so time spent before `start` never
    /// turns into ticks.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.last_sample = Some(self.time_source.now());
        log::info!("Clock started at {} ticks/s", self.fps);
    }

    /// Stop sampling and cancel the pending schedule. Idempotent.
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.scheduler.cancel();
        self.started = false;
        self.last_sample = None;
        log::info!("Clock stopped after {} ticks", self.ticks);
    }

    /// Whether the clock is sampling
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Take one real-time sample and produce the ticks it pays for
    ///
    /// Afterwards the scheduler is asked for the next sampling opportunity;
    /// if it declines, the clock stops. A stopped clock produces no ticks.
    pub fn tick(&mut self) -> Vec<TickEvent> {
        if !self.started {
            return Vec::new();
        }

        let now = self.time_source.now();
        let frame_time = self.last_sample.map_or(0.0, |last| now - last);
        self.last_sample = Some(now);

        let ticks = self.advance(frame_time);

        if !self.scheduler.schedule_next() {
            log::debug!("Frame scheduler declined the next sample");
            self.stop();
        }

        ticks
    }

    /// Feed an explicit real-time frame duration into the accumulator
    ///
    /// This is the deterministic core of [`Clock::tick`]: negative or
    /// non-finite durations count as zero and anything above the clamp counts
    /// as the clamp. Each produced tick is also published on
    /// [`ClockEvents::tick`].
    pub fn advance(&mut self, frame_time: f64) -> Vec<TickEvent> {
        let mut frame_time = if frame_time.is_finite() {
            frame_time.max(0.0)
        } else {
            0.0
        };
        if frame_time > self.max_frame_delta {
            log::debug!(
                "Frame time {:.3}s clamped to {:.3}s",
                frame_time,
                self.max_frame_delta
            );
            frame_time = self.max_frame_delta;
        }

        self.real_elapsed += frame_time;
        self.accumulated += frame_time;

        let step = self.fixed_time_step();
        let delta = step * self.timescale;
        let mut ticks = Vec::new();
        while self.accumulated + STEP_EPSILON >= step {
            self.accumulated = (self.accumulated - step).max(0.0);
            self.ticks += 1;
            self.elapsed += delta;

            let event = TickEvent {
                delta,
                elapsed: self.elapsed,
                tick: self.ticks,
            };
            log::trace!("tick {} (elapsed {:.4}s)", event.tick, event.elapsed);
            self.events.tick.emit(&event);
            ticks.push(event);
        }

        ticks
    }

    /// Simulation ticks per second
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Size of one tick in seconds
    pub fn fixed_time_step(&self) -> f64 {
        1.0 / f64::from(self.fps)
    }

    /// Per-frame clamp in seconds
    pub fn max_frame_delta(&self) -> f64 {
        self.max_frame_delta
    }

    /// Real time waiting in the accumulator, always below one step
    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }

    /// Progress through the next pending tick, in `0..=1`
    pub fn interpolation_factor(&self) -> f64 {
        (self.accumulated / self.fixed_time_step()).min(1.0)
    }

    /// Total simulated seconds, the sum of every tick's delta
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Total clamped real seconds that were sampled
    pub fn real_elapsed(&self) -> f64 {
        self.real_elapsed
    }

    /// Number of ticks produced so far
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Clock event emitters
    pub fn events(&self) -> &ClockEvents {
        &self.events
    }

    /// Mutable clock event emitters, for subscribing
    pub fn events_mut(&mut self) -> &mut ClockEvents {
        &mut self.events
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(DEFAULT_FPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::RefCell;

    fn manual_clock(fps: u32, frames: u64) -> (Clock, ManualTimeSource) {
        let time = ManualTimeSource::new();
        let clock = Clock::new(fps)
            .with_time_source(Box::new(time.clone()))
            .with_scheduler(Box::new(ManualScheduler::frames(frames)));
        (clock, time)
    }

    #[test]
    fn test_single_step_produces_one_tick() {
        let mut clock = Clock::new(60);
        let step = clock.fixed_time_step();

        for expected in 1..=3 {
            let ticks = clock.advance(step);
            assert_eq!(ticks.len(), 1);
            assert_eq!(ticks[0].tick, expected);
            assert_relative_eq!(ticks[0].delta, step);
        }
        assert_relative_eq!(clock.elapsed(), 3.0 * step);
    }

    #[test]
    fn test_timescale_scales_delta_not_tick_rate() {
        let mut clock = Clock::new(60).with_timescale(0.5);
        let step = clock.fixed_time_step();

        let ticks = clock.advance(2.0 * step);
        assert_eq!(ticks.len(), 2);
        assert_relative_eq!(ticks[0].delta, step * 0.5);
        assert_relative_eq!(clock.elapsed(), step);

        clock.set_timescale(2.0);
        let ticks = clock.advance(step);
        assert_eq!(ticks.len(), 1);
        assert_relative_eq!(ticks[0].delta, step * 2.0);
        assert_relative_eq!(clock.elapsed(), 3.0 * step);
        assert_relative_eq!(clock.real_elapsed(), 3.0 * step);

        clock.set_timescale(-1.0);
        clock.set_timescale(f64::NAN);
        assert_relative_eq!(clock.timescale(), 2.0);
    }

    #[test]
    fn test_partial_frames_accumulate() {
        let mut clock = Clock::new(10);

        assert!(clock.advance(0.04).is_empty());
        assert!(clock.advance(0.04).is_empty());
        let ticks = clock.advance(0.04);

        assert_eq!(ticks.len(), 1);
        assert_relative_eq!(clock.accumulated(), 0.02, epsilon = 1e-9);
        assert_relative_eq!(clock.interpolation_factor(), 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_large_frame_is_clamped() {
        let mut clock = Clock::new(60).with_max_frame_delta(0.25);

        // A ten second stall only pays for a quarter second of simulation
        let ticks = clock.advance(10.0);

        assert_eq!(ticks.len(), 15);
        assert_relative_eq!(clock.real_elapsed(), 0.25);
    }

    #[test]
    fn test_negative_and_nan_frames_are_ignored() {
        let mut clock = Clock::new(60);
        assert!(clock.advance(-1.0).is_empty());
        assert!(clock.advance(f64::NAN).is_empty());
        assert_eq!(clock.real_elapsed(), 0.0);
    }

    #[test]
    fn test_tick_count_matches_clamped_time() {
        let mut clock = Clock::new(30).with_max_frame_delta(0.1);
        let samples = [0.016, 0.5, 0.0, 0.033, 0.07, 0.002, 0.25, 0.011, 0.09];

        let mut clamped_total = 0.0;
        let mut tick_total = 0;
        for sample in samples {
            clamped_total += f64::min(sample, 0.1);
            tick_total += clock.advance(sample).len();
        }

        let simulated = tick_total as f64 * clock.fixed_time_step();
        assert!(simulated <= clamped_total + 1e-6);
        assert!(clamped_total - simulated < clock.fixed_time_step());
        assert_relative_eq!(clamped_total - simulated, clock.accumulated(), epsilon = 1e-6);
    }

    #[test]
    fn test_tick_events_are_emitted() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut clock = Clock::new(60);
        let sink = Rc::clone(&seen);
        clock.events_mut().tick.on(move |event| sink.borrow_mut().push(event.tick));

        clock.advance(clock.fixed_time_step() * 2.0);

        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_start_is_idempotent_and_resets_baseline() {
        let (mut clock, time) = manual_clock(60, 10);

        time.advance(5.0);
        clock.start();
        clock.start();
        assert!(clock.is_started());

        // Time before start never becomes ticks
        assert!(clock.tick().is_empty());

        time.advance(1.0 / 60.0);
        assert_eq!(clock.tick().len(), 1);
    }

    #[test]
    fn test_stopped_clock_does_not_tick() {
        let (mut clock, time) = manual_clock(60, 10);
        clock.start();
        clock.stop();
        clock.stop();

        time.advance(1.0);
        assert!(clock.tick().is_empty());
        assert!(!clock.is_started());
    }

    #[test]
    fn test_scheduler_budget_stops_clock() {
        let (mut clock, time) = manual_clock(60, 2);
        clock.start();

        let mut samples = 0;
        while clock.is_started() {
            time.advance(1.0 / 60.0);
            clock.tick();
            samples += 1;
        }

        assert_eq!(samples, 3);
        assert_eq!(clock.tick_count(), 3);
    }

    #[test]
    fn test_manual_scheduler_cancel() {
        let mut scheduler = ManualScheduler::unbounded();
        assert!(scheduler.schedule_next());
        scheduler.cancel();
        assert!(!scheduler.schedule_next());
        assert_eq!(scheduler.remaining(), Some(0));
    }
}
