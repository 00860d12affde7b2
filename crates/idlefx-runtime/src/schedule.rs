#![forbid(unsafe_code)]

//! Single-threaded periodic timers.
//!
//! Every callback in the runtime runs on one thread. An [`Every`] is a
//! deadline that the event loop checks on each wake-up; the [`Scheduler`]
//! groups the runtime's timers and reports the nearest deadline so the loop
//! can block on input until then.
//!
//! Missed deadlines do not queue up: a timer that fell behind fires once
//! and is rescheduled one interval after the time it was serviced.

use std::time::{Duration, Instant};

/// A periodic deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Every {
    interval: Duration,
    next_due: Instant,
    active: bool,
}

impl Every {
    /// Timer that first fires one `interval` after `now`.
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: now + interval,
            active: true,
        }
    }

    /// Timer that fires at `now`, then every `interval`.
    pub fn immediate(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: now,
            active: true,
        }
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Next deadline, or `None` while stopped.
    #[inline]
    pub fn next_due(&self) -> Option<Instant> {
        self.active.then_some(self.next_due)
    }

    /// Whether the timer is due; when it is, the next deadline is set.
    pub fn fire(&mut self, now: Instant) -> bool {
        if !self.active || now < self.next_due {
            return false;
        }
        self.next_due = now + self.interval;
        true
    }

    /// Change the interval. The next deadline moves to `now + interval` if
    /// that is sooner than the current one.
    pub fn set_interval(&mut self, interval: Duration, now: Instant) {
        if interval == self.interval {
            return;
        }
        self.interval = interval;
        let candidate = now + interval;
        if candidate < self.next_due {
            self.next_due = candidate;
        }
    }

    /// Resume from a stop (or restart) with the first fire one interval out.
    pub fn start(&mut self, now: Instant) {
        self.active = true;
        self.next_due = now + self.interval;
    }

    /// Start if stopped; leave a running timer alone.
    pub fn ensure_started(&mut self, now: Instant) {
        if !self.active {
            self.start(now);
        }
    }

    pub fn stop(&mut self) {
        self.active = false;
    }
}

/// Periodic callbacks the runtime drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Idle-timeout check.
    Timeout,
    /// Interrupt-based activity poll.
    Activity,
    /// Animation tick.
    Animation,
    /// Adaptive-quality check.
    Performance,
    /// Emergency CPU check.
    Emergency,
    /// Telemetry sample for the stats overlay.
    Stats,
    /// Settings file change check.
    Reload,
}

impl TimerKind {
    pub const ALL: [Self; 7] = [
        Self::Timeout,
        Self::Activity,
        Self::Animation,
        Self::Performance,
        Self::Emergency,
        Self::Stats,
        Self::Reload,
    ];

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Activity => "activity",
            Self::Animation => "animation",
            Self::Performance => "performance",
            Self::Emergency => "emergency",
            Self::Stats => "stats",
            Self::Reload => "reload",
        }
    }
}

/// The runtime's timers, one per [`TimerKind`].
#[derive(Debug, Clone)]
pub struct Scheduler {
    timers: [Every; 7],
}

impl Scheduler {
    /// All timers stopped, with the given intervals.
    pub fn new(intervals: impl Fn(TimerKind) -> Duration, now: Instant) -> Self {
        let timers = TimerKind::ALL.map(|kind| {
            let mut timer = Every::new(intervals(kind), now);
            timer.stop();
            timer
        });
        Self { timers }
    }

    fn index(kind: TimerKind) -> usize {
        match kind {
            TimerKind::Timeout => 0,
            TimerKind::Activity => 1,
            TimerKind::Animation => 2,
            TimerKind::Performance => 3,
            TimerKind::Emergency => 4,
            TimerKind::Stats => 5,
            TimerKind::Reload => 6,
        }
    }

    #[inline]
    pub fn timer(&self, kind: TimerKind) -> &Every {
        &self.timers[Self::index(kind)]
    }

    #[inline]
    pub fn timer_mut(&mut self, kind: TimerKind) -> &mut Every {
        &mut self.timers[Self::index(kind)]
    }

    /// Start or stop `kind` to match `on`. A running timer keeps its phase.
    pub fn set_running(&mut self, kind: TimerKind, on: bool, now: Instant) {
        let timer = self.timer_mut(kind);
        if on {
            timer.ensure_started(now);
        } else {
            timer.stop();
        }
    }

    /// Fire `kind` if due.
    #[inline]
    pub fn fire(&mut self, kind: TimerKind, now: Instant) -> bool {
        self.timer_mut(kind).fire(now)
    }

    /// Earliest deadline over all running timers.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().filter_map(Every::next_due).min()
    }

    /// Time until the earliest deadline, zero if one has passed.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.next_deadline()
            .map(|due| due.saturating_duration_since(now))
    }
}
