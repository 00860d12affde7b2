#![forbid(unsafe_code)]

//! Idle lifecycle state machine.
//!
//! The machine tracks time since the last detected input and decides when an
//! effect starts and stops. It owns no timers itself: the runtime calls
//! [`LifecycleMachine::on_timeout_tick`] and [`LifecycleMachine::on_activity`]
//! from its own periodic callbacks, asking [`LifecycleMachine::timers`] which
//! of them should currently run. Time is always passed in, so every scenario
//! can be replayed without sleeping.
//!
//! # States
//!
//! ```text
//!            enable                 timeout reached
//! Disabled ─────────► Monitoring ───────────────────► Active
//!    ▲                 │    ▲  ▲                        │
//!    │     remaining ≤ │    │  └──── activity / input ──┘
//!    │      window     ▼    │ activity
//!    │              CountingDown
//!    │
//!    └─── disable (from any state)
//!
//! start_test (from any state) ──► Testing ── exit ──► Monitoring if it was
//!                                                     monitoring before and
//!                                                     is enabled, otherwise
//!                                                     Disabled
//! ```
//!
//! # Invariants
//!
//! 1. Each effect session gets exactly one [`LifecycleEvent::Exited`]. The
//!    running session is moved out when it ends, so a second end request for
//!    the same session is a no-op.
//! 2. Any detected activity resets the idle clock to zero.
//! 3. Activation reads the effect from the current configuration snapshot,
//!    which the runtime keeps in sync with the persisted settings.

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::activity::Strictness;
use crate::config::{Config, EffectKind};

/// Cadence of the idle-timeout check.
pub const TIMEOUT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Activity poll cadence for strict detection.
pub const STRICT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Activity poll cadence for permissive detection.
pub const PERMISSIVE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Remaining idle time below which the machine reports `CountingDown`.
pub const DEFAULT_COUNTDOWN_WINDOW: Duration = Duration::from_secs(10);

/// Lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Idle activation is off.
    Disabled,
    /// Counting idle time, far from the timeout.
    Monitoring,
    /// Counting idle time, within the countdown window of the timeout.
    CountingDown,
    /// An effect is running because the timeout was reached.
    Active,
    /// An effect is running because an operator asked for a preview.
    Testing,
}

impl LifecycleState {
    /// Whether an effect is on screen.
    #[inline]
    pub fn runs_effect(self) -> bool {
        matches!(self, Self::Active | Self::Testing)
    }

    /// Whether the idle clock is being compared against the timeout.
    #[inline]
    pub fn is_counting(self) -> bool {
        matches!(self, Self::Monitoring | Self::CountingDown)
    }

    /// Human-readable name for logging.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Monitoring => "monitoring",
            Self::CountingDown => "counting_down",
            Self::Active => "active",
            Self::Testing => "testing",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of one effect run, from start to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

/// Why an effect ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitCause {
    /// The interrupt-based activity signal fired.
    Activity,
    /// A key or pointer event reached the effect directly.
    Input,
    /// Idle activation was disabled while the effect ran.
    Disabled,
    /// A preview replaced the running effect.
    Replaced,
    /// The host asked the effect to stop (shutdown, engine failure).
    Stopped,
}

impl ExitCause {
    /// JSONL-compatible string representation.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::Input => "input",
            Self::Disabled => "disabled",
            Self::Replaced => "replaced",
            Self::Stopped => "stopped",
        }
    }
}

/// Notifications from the machine to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The idle timeout started an effect.
    Activated {
        session: SessionId,
        effect: EffectKind,
    },
    /// A preview started.
    TestStarted {
        session: SessionId,
        effect: EffectKind,
    },
    /// An effect ended. Sent exactly once per session.
    Exited {
        session: SessionId,
        effect: EffectKind,
        cause: ExitCause,
        test: bool,
    },
}

/// Which periodic callbacks the host should be running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LifecycleTimers {
    /// Call [`LifecycleMachine::on_timeout_tick`] every [`TIMEOUT_CHECK_INTERVAL`].
    pub timeout_check: bool,
    /// Poll activity every [`LifecycleMachine::activity_poll_interval`].
    pub activity_poll: bool,
    /// Drive the animation engine.
    pub animation: bool,
}

#[derive(Debug, Clone, Copy)]
struct EffectSession {
    id: SessionId,
    effect: EffectKind,
    test: bool,
    started_at: Instant,
}

/// The lifecycle state machine.
#[derive(Debug)]
pub struct LifecycleMachine {
    config: Arc<Config>,
    state: LifecycleState,
    last_activity: Instant,
    session: Option<EffectSession>,
    /// Whether idle monitoring was on when the current preview started.
    monitoring_before_test: bool,
    next_session: u64,
    countdown_window: Duration,
    events: mpsc::Sender<LifecycleEvent>,
}

impl LifecycleMachine {
    /// Create a machine in `Disabled`, plus the receiving end of its events.
    pub fn new(config: Arc<Config>, now: Instant) -> (Self, mpsc::Receiver<LifecycleEvent>) {
        let (events, rx) = mpsc::channel();
        let machine = Self {
            config,
            state: LifecycleState::Disabled,
            last_activity: now,
            session: None,
            monitoring_before_test: false,
            next_session: 1,
            countdown_window: DEFAULT_COUNTDOWN_WINDOW,
            events,
        };
        (machine, rx)
    }

    /// Override the countdown window.
    #[must_use]
    pub fn with_countdown_window(mut self, window: Duration) -> Self {
        self.countdown_window = window;
        self
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Current configuration snapshot.
    #[inline]
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Running effect and its session, if any.
    #[inline]
    pub fn running_effect(&self) -> Option<(SessionId, EffectKind)> {
        self.session.map(|s| (s.id, s.effect))
    }

    /// How long the running effect has been on screen.
    pub fn effect_elapsed(&self, now: Instant) -> Option<Duration> {
        self.session
            .map(|s| now.saturating_duration_since(s.started_at))
    }

    /// Time since the last detected input.
    #[inline]
    pub fn idle_elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    /// Idle time left before activation, while counting.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.state
            .is_counting()
            .then(|| self.config.lock_timeout().saturating_sub(self.idle_elapsed(now)))
    }

    /// Whether the running effect should blank the screen instead of animating.
    pub fn should_blank(&self, now: Instant) -> bool {
        self.state == LifecycleState::Active && self.idle_elapsed(now) >= self.config.display_timeout()
    }

    /// Activity poll cadence for the configured strictness.
    pub fn activity_poll_interval(&self) -> Duration {
        match self.config.strictness() {
            Strictness::Permissive => PERMISSIVE_POLL_INTERVAL,
            Strictness::Strict(_) => STRICT_POLL_INTERVAL,
        }
    }

    /// Callbacks the host should be running in the current state.
    ///
    /// `Testing` suspends the timeout check so a preview is never cut short
    /// by the idle logic; activity polling continues in every non-disabled
    /// state because it is how effects end.
    pub fn timers(&self) -> LifecycleTimers {
        match self.state {
            LifecycleState::Disabled => LifecycleTimers::default(),
            LifecycleState::Monitoring | LifecycleState::CountingDown => LifecycleTimers {
                timeout_check: true,
                activity_poll: true,
                animation: false,
            },
            LifecycleState::Active | LifecycleState::Testing => LifecycleTimers {
                timeout_check: false,
                activity_poll: true,
                animation: true,
            },
        }
    }

    /// Turn idle activation on. No effect unless `Disabled`.
    pub fn enable(&mut self, now: Instant) {
        if self.state == LifecycleState::Disabled && self.session.is_none() {
            self.last_activity = now;
            self.transition(LifecycleState::Monitoring);
        }
    }

    /// Turn idle activation off, ending any running effect.
    pub fn disable(&mut self, now: Instant) {
        self.finish_session(ExitCause::Disabled, now);
        self.transition(LifecycleState::Disabled);
    }

    /// Replace the configuration snapshot.
    ///
    /// Disabling through settings stops monitoring and any timeout-started
    /// effect; a running preview is left alone and the new snapshot decides
    /// what happens when it ends.
    pub fn update_settings(&mut self, config: Arc<Config>, now: Instant) {
        self.config = config;
        match (self.config.enabled, self.state) {
            (enabled, LifecycleState::Testing) => self.monitoring_before_test |= enabled,
            (false, LifecycleState::Disabled) => {}
            (false, _) => self.disable(now),
            (true, LifecycleState::Disabled) => self.enable(now),
            (true, _) => {}
        }
        crate::debug!(
            state = self.state.as_str(),
            enabled = self.config.enabled,
            effect = self.config.effect.as_str(),
            "settings updated"
        );
    }

    /// Idle-timeout check. Call every [`TIMEOUT_CHECK_INTERVAL`].
    pub fn on_timeout_tick(&mut self, now: Instant) -> LifecycleState {
        if !self.state.is_counting() {
            return self.state;
        }
        let idle = self.idle_elapsed(now);
        let timeout = self.config.lock_timeout();
        if idle >= timeout {
            self.activate(now);
        } else if timeout - idle <= self.countdown_window {
            self.transition(LifecycleState::CountingDown);
        } else {
            self.transition(LifecycleState::Monitoring);
        }
        self.state
    }

    /// Feed one activity poll result.
    ///
    /// Detection resets the idle clock and ends a running effect.
    pub fn on_activity(&mut self, detected: bool, now: Instant) -> LifecycleState {
        if detected {
            self.register_input(ExitCause::Activity, now);
        }
        self.state
    }

    /// A key or pointer event reached the host directly.
    pub fn notify_input(&mut self, now: Instant) -> LifecycleState {
        self.register_input(ExitCause::Input, now);
        self.state
    }

    /// Start a preview of `effect`, bypassing the idle timeout.
    pub fn start_test(&mut self, effect: EffectKind, now: Instant) -> SessionId {
        // A preview replacing a preview keeps the first one's resume target.
        if self.state != LifecycleState::Testing {
            self.monitoring_before_test = self.state != LifecycleState::Disabled;
        }
        self.finish_session(ExitCause::Replaced, now);
        let id = self.open_session(effect, true, now);
        self.transition(LifecycleState::Testing);
        crate::info!(session = id.0, effect = effect.as_str(), "preview started");
        let _ = self.events.send(LifecycleEvent::TestStarted {
            session: id,
            effect,
        });
        id
    }

    /// End the running effect for a host-side reason.
    ///
    /// Returns the ended session, or `None` if nothing was running.
    pub fn stop_effect(&mut self, cause: ExitCause, now: Instant) -> Option<SessionId> {
        let ended = self.finish_session(cause, now);
        if ended.is_some() {
            self.resume_after_effect();
        }
        ended
    }

    fn register_input(&mut self, cause: ExitCause, now: Instant) {
        self.last_activity = now;
        match self.state {
            LifecycleState::Active | LifecycleState::Testing => {
                self.finish_session(cause, now);
                self.resume_after_effect();
            }
            LifecycleState::CountingDown => self.transition(LifecycleState::Monitoring),
            LifecycleState::Monitoring | LifecycleState::Disabled => {}
        }
    }

    fn activate(&mut self, now: Instant) {
        let effect = self.config.effect;
        let id = self.open_session(effect, false, now);
        self.transition(LifecycleState::Active);
        crate::info!(
            session = id.0,
            effect = effect.as_str(),
            idle_secs = self.idle_elapsed(now).as_secs(),
            "idle timeout reached, effect activated"
        );
        let _ = self.events.send(LifecycleEvent::Activated {
            session: id,
            effect,
        });
    }

    fn open_session(&mut self, effect: EffectKind, test: bool, now: Instant) -> SessionId {
        let id = SessionId(self.next_session);
        self.next_session += 1;
        self.session = Some(EffectSession {
            id,
            effect,
            test,
            started_at: now,
        });
        id
    }

    /// Move the running session out and announce its exit. Exactly once.
    fn finish_session(&mut self, cause: ExitCause, now: Instant) -> Option<SessionId> {
        let session = self.session.take()?;
        self.last_activity = now;
        crate::info!(
            session = session.id.0,
            effect = session.effect.as_str(),
            cause = cause.as_str(),
            test = session.test,
            "effect exited"
        );
        let _ = self.events.send(LifecycleEvent::Exited {
            session: session.id,
            effect: session.effect,
            cause,
            test: session.test,
        });
        Some(session.id)
    }

    /// A preview returns to the state it interrupted; the settings can still
    /// veto monitoring.
    fn resume_after_effect(&mut self) {
        let resumes = self.state != LifecycleState::Testing || self.monitoring_before_test;
        if resumes && self.config.enabled {
            self.transition(LifecycleState::Monitoring);
        } else {
            self.transition(LifecycleState::Disabled);
        }
    }

    fn transition(&mut self, next: LifecycleState) {
        if self.state != next {
            crate::debug!(from = self.state.as_str(), to = next.as_str(), "lifecycle transition");
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn machine_with(config: Config) -> (LifecycleMachine, mpsc::Receiver<LifecycleEvent>, Instant) {
        let t0 = Instant::now();
        let (mut m, rx) = LifecycleMachine::new(Arc::new(config), t0);
        m.enable(t0);
        (m, rx, t0)
    }

    fn short_timeout(lock: u64) -> Config {
        Config {
            lock_timeout: lock,
            ..Config::default()
        }
    }

    #[test]
    fn starts_disabled_and_enable_monitors() {
        let t0 = Instant::now();
        let (mut m, _rx) = LifecycleMachine::new(Arc::new(Config::default()), t0);
        assert_eq!(m.state(), LifecycleState::Disabled);
        assert_eq!(m.timers(), LifecycleTimers::default());
        m.enable(t0);
        assert_eq!(m.state(), LifecycleState::Monitoring);
        assert!(m.timers().timeout_check);
        assert!(m.timers().activity_poll);
        assert!(!m.timers().animation);
    }

    #[test]
    fn countdown_window_then_activation() {
        let (mut m, rx, t0) = machine_with(short_timeout(30));
        assert_eq!(m.on_timeout_tick(t0 + secs(10)), LifecycleState::Monitoring);
        assert_eq!(m.on_timeout_tick(t0 + secs(20)), LifecycleState::CountingDown);
        assert_eq!(m.remaining(t0 + secs(20)), Some(secs(10)));
        assert_eq!(m.on_timeout_tick(t0 + secs(30)), LifecycleState::Active);
        assert_eq!(
            rx.try_recv().unwrap(),
            LifecycleEvent::Activated {
                session: SessionId(1),
                effect: EffectKind::Matrix
            }
        );
        assert!(m.timers().animation);
        assert!(!m.timers().timeout_check);
    }

    #[test]
    fn activity_during_countdown_returns_to_monitoring() {
        let (mut m, _rx, t0) = machine_with(short_timeout(30));
        m.on_timeout_tick(t0 + secs(25));
        assert_eq!(m.state(), LifecycleState::CountingDown);
        m.on_activity(true, t0 + secs(26));
        assert_eq!(m.state(), LifecycleState::Monitoring);
        assert_eq!(m.idle_elapsed(t0 + secs(26)), Duration::ZERO);
    }

    #[test]
    fn activation_uses_current_snapshot_effect() {
        let (mut m, rx, t0) = machine_with(short_timeout(5));
        m.update_settings(
            Arc::new(Config {
                effect: EffectKind::Mystify,
                ..short_timeout(5)
            }),
            t0,
        );
        m.on_timeout_tick(t0 + secs(5));
        assert_eq!(m.running_effect(), Some((SessionId(1), EffectKind::Mystify)));
        assert!(matches!(
            rx.try_recv().unwrap(),
            LifecycleEvent::Activated {
                effect: EffectKind::Mystify,
                ..
            }
        ));
    }

    #[test]
    fn exit_is_notified_exactly_once() {
        let (mut m, rx, t0) = machine_with(short_timeout(5));
        m.on_timeout_tick(t0 + secs(5));
        m.on_activity(true, t0 + secs(6));
        m.on_activity(true, t0 + secs(7));
        m.notify_input(t0 + secs(8));
        assert_eq!(m.stop_effect(ExitCause::Stopped, t0 + secs(9)), None);

        let exits: Vec<_> = rx
            .try_iter()
            .filter(|e| matches!(e, LifecycleEvent::Exited { .. }))
            .collect();
        assert_eq!(
            exits,
            vec![LifecycleEvent::Exited {
                session: SessionId(1),
                effect: EffectKind::Matrix,
                cause: ExitCause::Activity,
                test: false,
            }]
        );
    }

    #[test]
    fn no_detection_does_not_reset_idle() {
        let (mut m, _rx, t0) = machine_with(short_timeout(5));
        m.on_activity(false, t0 + secs(3));
        assert_eq!(m.idle_elapsed(t0 + secs(3)), secs(3));
    }

    #[test]
    fn disable_stops_everything() {
        let (mut m, rx, t0) = machine_with(short_timeout(5));
        m.on_timeout_tick(t0 + secs(5));
        m.disable(t0 + secs(6));
        assert_eq!(m.state(), LifecycleState::Disabled);
        assert_eq!(m.timers(), LifecycleTimers::default());
        assert!(rx.try_iter().any(|e| matches!(
            e,
            LifecycleEvent::Exited {
                cause: ExitCause::Disabled,
                ..
            }
        )));
        // Ticks do nothing while disabled.
        assert_eq!(m.on_timeout_tick(t0 + secs(600)), LifecycleState::Disabled);
    }

    #[test]
    fn settings_disable_and_reenable() {
        let (mut m, _rx, t0) = machine_with(short_timeout(5));
        m.update_settings(
            Arc::new(Config {
                enabled: false,
                ..short_timeout(5)
            }),
            t0 + secs(1),
        );
        assert_eq!(m.state(), LifecycleState::Disabled);
        m.update_settings(Arc::new(short_timeout(5)), t0 + secs(2));
        assert_eq!(m.state(), LifecycleState::Monitoring);
        assert_eq!(m.idle_elapsed(t0 + secs(2)), Duration::ZERO);
    }

    #[test]
    fn test_mode_suspends_timeout_and_resumes_monitoring() {
        let (mut m, rx, t0) = machine_with(short_timeout(5));
        let id = m.start_test(EffectKind::Mystify, t0 + secs(1));
        assert_eq!(m.state(), LifecycleState::Testing);
        assert!(!m.timers().timeout_check);

        // Far past the timeout, still testing.
        assert_eq!(m.on_timeout_tick(t0 + secs(100)), LifecycleState::Testing);

        m.notify_input(t0 + secs(101));
        assert_eq!(m.state(), LifecycleState::Monitoring);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                LifecycleEvent::TestStarted {
                    session: id,
                    effect: EffectKind::Mystify
                },
                LifecycleEvent::Exited {
                    session: id,
                    effect: EffectKind::Mystify,
                    cause: ExitCause::Input,
                    test: true
                },
            ]
        );
    }

    #[test]
    fn test_exit_returns_to_disabled_when_not_enabled() {
        let t0 = Instant::now();
        let (mut m, _rx) = LifecycleMachine::new(
            Arc::new(Config {
                enabled: false,
                ..Config::default()
            }),
            t0,
        );
        m.start_test(EffectKind::Matrix, t0);
        m.on_activity(true, t0 + secs(1));
        assert_eq!(m.state(), LifecycleState::Disabled);
    }

    #[test]
    fn preview_from_disabled_returns_to_disabled() {
        let t0 = Instant::now();
        let (mut m, _rx) = LifecycleMachine::new(Arc::new(short_timeout(5)), t0);
        assert!(m.config().enabled);
        m.start_test(EffectKind::Matrix, t0);
        m.start_test(EffectKind::Mystify, t0 + secs(1));
        m.notify_input(t0 + secs(2));
        assert_eq!(m.state(), LifecycleState::Disabled);
        assert!(!m.timers().activity_poll);
    }

    #[test]
    fn replaced_preview_keeps_resume_target() {
        let (mut m, _rx, t0) = machine_with(short_timeout(5));
        m.start_test(EffectKind::Matrix, t0);
        m.start_test(EffectKind::Mystify, t0 + secs(1));
        m.on_activity(true, t0 + secs(2));
        assert_eq!(m.state(), LifecycleState::Monitoring);
    }

    #[test]
    fn settings_enable_during_preview_resumes_monitoring() {
        let t0 = Instant::now();
        let off = Config {
            enabled: false,
            ..short_timeout(5)
        };
        let (mut m, _rx) = LifecycleMachine::new(Arc::new(off), t0);
        m.start_test(EffectKind::Matrix, t0);
        m.update_settings(Arc::new(short_timeout(5)), t0 + secs(1));
        assert_eq!(m.state(), LifecycleState::Testing);
        m.notify_input(t0 + secs(2));
        assert_eq!(m.state(), LifecycleState::Monitoring);
    }

    #[test]
    fn preview_survives_settings_disable() {
        let (mut m, _rx, t0) = machine_with(short_timeout(5));
        m.start_test(EffectKind::Matrix, t0);
        m.update_settings(
            Arc::new(Config {
                enabled: false,
                ..short_timeout(5)
            }),
            t0 + secs(1),
        );
        assert_eq!(m.state(), LifecycleState::Testing);
        m.notify_input(t0 + secs(2));
        assert_eq!(m.state(), LifecycleState::Disabled);
    }

    #[test]
    fn test_replaces_active_effect() {
        let (mut m, rx, t0) = machine_with(short_timeout(5));
        m.on_timeout_tick(t0 + secs(5));
        let id = m.start_test(EffectKind::Mystify, t0 + secs(6));
        assert_eq!(id, SessionId(2));
        assert!(rx.try_iter().any(|e| matches!(
            e,
            LifecycleEvent::Exited {
                session: SessionId(1),
                cause: ExitCause::Replaced,
                ..
            }
        )));
    }

    #[test]
    fn blanking_after_display_timeout() {
        let (mut m, _rx, t0) = machine_with(Config {
            lock_timeout: 5,
            display_timeout: 20,
            ..Config::default()
        });
        m.on_timeout_tick(t0 + secs(5));
        assert!(!m.should_blank(t0 + secs(19)));
        assert!(m.should_blank(t0 + secs(20)));
    }

    #[test]
    fn poll_interval_follows_strictness() {
        let (m, _rx, _) = machine_with(Config::default());
        assert_eq!(m.activity_poll_interval(), PERMISSIVE_POLL_INTERVAL);
        let (m, _rx, _) = machine_with(Config {
            activity_strictness: crate::config::StrictnessKind::Strict,
            ..Config::default()
        });
        assert_eq!(m.activity_poll_interval(), STRICT_POLL_INTERVAL);
    }

    #[test]
    fn state_names() {
        assert_eq!(LifecycleState::CountingDown.as_str(), "counting_down");
        assert_eq!(ExitCause::Activity.as_str(), "activity");
        assert!(LifecycleState::Testing.runs_effect());
        assert!(!LifecycleState::Monitoring.runs_effect());
    }
}
