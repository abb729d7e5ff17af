// Copyright (c) 2026 rezky_nightky

use std::time::{Duration, Instant};

/// Rapid resize signals are coalesced; the surface is only re-applied
/// after this quiet period.
const RESIZE_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Stopped,
    Running,
}

/// Paces the tick loop: one scene tick plus one render per display
/// refresh while running, nothing once stopped. Ticks never overlap;
/// the next one is only due after the current one was taken.
pub struct Scheduler {
    state: State,
    target_period: Duration,
    next_tick: Instant,
    pending_resize: Option<(u16, u16)>,
    resize_deadline: Instant,
    ticks: u64,
}

impl Scheduler {
    pub fn new(target_fps: f64) -> Self {
        let now = Instant::now();
        Self {
            state: State::Stopped,
            target_period: Duration::from_secs_f64(1.0 / target_fps.max(1.0)),
            next_tick: now,
            pending_resize: None,
            resize_deadline: now,
            ticks: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    #[allow(dead_code)]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Starts ticking. Refuses a surface with a zero dimension; starting
    /// an already-running scheduler changes nothing.
    pub fn start(&mut self, now: Instant, width: u16, height: u16) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        if self.state == State::Stopped {
            self.state = State::Running;
            self.next_tick = now;
        }
        true
    }

    /// Stops ticking and drops any queued resize. Idempotent.
    pub fn stop(&mut self) {
        self.state = State::Stopped;
        self.pending_resize = None;
    }

    pub fn queue_resize(&mut self, now: Instant, width: u16, height: u16) {
        if self.state != State::Running {
            return;
        }
        self.pending_resize = Some((width, height));
        self.resize_deadline = now + RESIZE_DEBOUNCE;
    }

    /// Returns the coalesced resize once the quiet period has elapsed.
    pub fn take_resize(&mut self, now: Instant) -> Option<(u16, u16)> {
        if self.pending_resize.is_some() && now >= self.resize_deadline {
            return self.pending_resize.take();
        }
        None
    }

    /// True when a tick is due; claims it and schedules the next one.
    pub fn tick_due(&mut self, now: Instant) -> bool {
        if self.state != State::Running || now < self.next_tick {
            return false;
        }
        self.ticks += 1;
        self.next_tick += self.target_period;
        if now > self.next_tick {
            // Never try to catch up on a stall; realign instead.
            self.next_tick = now;
        }
        true
    }

    /// The earliest instant anything needs servicing, for event-poll
    /// timeouts. None while stopped.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.state != State::Running {
            return None;
        }
        let mut deadline = self.next_tick;
        if self.pending_resize.is_some() {
            deadline = deadline.min(self.resize_deadline);
        }
        Some(deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_to_start_on_zero_size_surface() {
        let mut s = Scheduler::new(60.0);
        let now = Instant::now();
        assert!(!s.start(now, 0, 24));
        assert!(!s.start(now, 80, 0));
        assert!(!s.is_running());
        assert!(!s.tick_due(now + Duration::from_secs(1)));
    }

    #[test]
    fn ticks_only_while_running() {
        let mut s = Scheduler::new(60.0);
        let now = Instant::now();
        assert!(!s.tick_due(now));

        assert!(s.start(now, 80, 24));
        assert!(s.tick_due(now));
        assert!(!s.tick_due(now));
        assert!(s.tick_due(now + Duration::from_millis(20)));
        assert_eq!(s.ticks(), 2);
    }

    #[test]
    fn stop_is_idempotent_and_final() {
        let mut s = Scheduler::new(60.0);
        let now = Instant::now();
        s.start(now, 80, 24);
        assert!(s.tick_due(now));

        s.stop();
        s.stop();
        assert!(!s.is_running());
        assert!(!s.tick_due(now + Duration::from_secs(1)));
        assert_eq!(s.ticks(), 1);
    }

    #[test]
    fn resize_is_debounced_to_the_last_value() {
        let mut s = Scheduler::new(60.0);
        let now = Instant::now();
        s.start(now, 80, 24);

        s.queue_resize(now, 100, 30);
        s.queue_resize(now + Duration::from_millis(50), 120, 40);
        assert_eq!(s.take_resize(now + Duration::from_millis(60)), None);
        assert_eq!(
            s.take_resize(now + Duration::from_millis(200)),
            Some((120, 40))
        );
        assert_eq!(s.take_resize(now + Duration::from_millis(300)), None);
    }

    #[test]
    fn stop_cancels_a_pending_resize() {
        let mut s = Scheduler::new(60.0);
        let now = Instant::now();
        s.start(now, 80, 24);
        s.queue_resize(now, 100, 30);
        s.stop();
        assert_eq!(s.take_resize(now + Duration::from_secs(1)), None);
    }
}
