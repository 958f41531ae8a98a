//! Self-rescheduling frame loop.
//!
//! A terminal has no native redraw callback, so the loop paces itself to a
//! fixed cadence and hands each tick the elapsed time since the previous one.
//! Time comes from a `Clock` so tests can drive the loop deterministically.

use std::time::{Duration, Instant};

/// Upper bound on a single step. A stalled host (suspended terminal, debugger)
/// resumes with one bounded step instead of a huge jump.
pub const MAX_DT: f32 = 0.1;

pub trait Clock {
    /// Monotonic time since the clock was created.
    fn now(&self) -> Duration;
    fn sleep_until(&self, deadline: Duration);
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock { origin: Instant::now() }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep_until(&self, deadline: Duration) {
        let now = self.now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }
}

/// Test clock: time only moves when told to, and sleeping jumps straight to
/// the deadline.
#[cfg(test)]
#[derive(Default)]
pub struct ManualClock {
    now: std::cell::Cell<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        ManualClock::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep_until(&self, deadline: Duration) {
        if deadline > self.now.get() {
            self.now.set(deadline);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTick {
    pub now: Duration,
    /// Seconds since the previous tick, clamped to `MAX_DT`. Zero on the first.
    pub dt: f32,
    pub frame: u64,
}

pub struct FrameLoop<C: Clock> {
    clock: C,
    interval: Duration,
    next_deadline: Option<Duration>,
    last: Option<Duration>,
    frame: u64,
    cancelled: bool,
}

impl<C: Clock> FrameLoop<C> {
    pub fn new(clock: C, fps: u32) -> Self {
        let fps = fps.clamp(1, 240);
        FrameLoop {
            clock,
            interval: Duration::from_secs(1) / fps,
            next_deadline: None,
            last: None,
            frame: 0,
            cancelled: false,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Wait for the next scheduled tick. Returns `None` once cancelled.
    pub fn next_tick(&mut self) -> Option<FrameTick> {
        if self.cancelled {
            return None;
        }
        if let Some(deadline) = self.next_deadline {
            self.clock.sleep_until(deadline);
        }

        let now = self.clock.now();
        let dt = match self.last {
            Some(last) => now.saturating_sub(last).as_secs_f32().min(MAX_DT),
            None => 0.0,
        };
        self.last = Some(now);
        // Reschedule relative to now: a late frame does not cause a catch-up burst.
        self.next_deadline = Some(now + self.interval);
        self.frame += 1;

        Some(FrameTick { now, dt, frame: self.frame })
    }

    pub fn cancel(&mut self) {
        if !self.cancelled {
            tracing::debug!(frames = self.frame, "frame loop cancelled");
        }
        self.cancelled = true;
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        !self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_has_zero_dt() {
        let mut fl = FrameLoop::new(ManualClock::new(), 60);
        let t = fl.next_tick().unwrap();
        assert_eq!(t.dt, 0.0);
        assert_eq!(t.frame, 1);
    }

    #[test]
    fn ticks_follow_cadence() {
        let mut fl = FrameLoop::new(ManualClock::new(), 50);
        fl.next_tick();
        let t = fl.next_tick().unwrap();
        assert!((t.dt - 0.02).abs() < 1e-6);
        assert_eq!(t.now, Duration::from_millis(20));
    }

    #[test]
    fn slow_frame_reports_real_elapsed_time() {
        let mut fl = FrameLoop::new(ManualClock::new(), 60);
        fl.next_tick();
        fl.clock().advance(Duration::from_millis(50));
        let t = fl.next_tick().unwrap();
        assert!((t.dt - 0.05).abs() < 1e-6);
    }

    #[test]
    fn stall_is_clamped() {
        let mut fl = FrameLoop::new(ManualClock::new(), 60);
        fl.next_tick();
        fl.clock().advance(Duration::from_secs(5));
        assert_eq!(fl.next_tick().unwrap().dt, MAX_DT);
    }

    #[test]
    fn cancelled_loop_stops_rescheduling() {
        let mut fl = FrameLoop::new(ManualClock::new(), 60);
        assert!(fl.next_tick().is_some());
        fl.cancel();
        assert!(!fl.is_running());
        assert!(fl.next_tick().is_none());
        assert!(fl.next_tick().is_none());
    }
}
