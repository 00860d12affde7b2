#![forbid(unsafe_code)]

//! Session orchestration: lifecycle, activity, governor and engines on one
//! thread.
//!
//! [`Session::tick`] is the single entry point the event loop calls on every
//! wake-up. It fires whichever [`Scheduler`] timers are due, feeds their
//! results to the [`LifecycleMachine`], reacts to the machine's
//! [`LifecycleEvent`]s by starting or dropping engines, and composes the
//! next [`Frame`]. Nothing here touches the terminal; the driver presents
//! [`Session::frame`] when a tick reports a change.
//!
//! Ordering within one tick: settings reload, activity poll, timeout check,
//! lifecycle events, then for a running effect the emergency, stats and
//! performance checks, and last the animation step (advance fully before
//! render). Governor checks only ever see the previous completed frame.
//!
//! Failures never escape a tick. Engine errors skip the frame and are
//! logged at most once per [`ERROR_LOG_INTERVAL`]; activity read errors
//! count as no activity; missing telemetry turns adaptive features off.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant, SystemTime};

use idlefx_core::activity::{ActivitySignal, ERROR_LOG_INTERVAL, InterruptSource, ProcInterrupts};
use idlefx_core::config::{Config, ConfigStore, EffectKind};
use idlefx_core::lifecycle::{
    ExitCause, LifecycleEvent, LifecycleMachine, LifecycleState, SessionId, TIMEOUT_CHECK_INTERVAL,
};
use idlefx_core::logging::LogThrottle;
use idlefx_core::rng::RngSeed;
use idlefx_core::telemetry::{TelemetrySample, TelemetrySource};
use idlefx_fx::{AnimationEngine, DriftOverlay, FxContext, StatsReadout, build_engine};
use idlefx_render::{Canvas, Frame, Rgba, StyleFlags, Surface};

use crate::governor::{FrameAction, GovernorConfig, GovernorModes, PerformanceGovernor};
use crate::schedule::{Scheduler, TimerKind};

/// How often the stats overlay samples telemetry.
pub const STATS_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// How often the settings file is checked for changes.
pub const RELOAD_INTERVAL: Duration = Duration::from_secs(2);

const STATUS_COLOR: Rgba = Rgba::rgb(110, 110, 110);

/// Input delivered by the terminal, already decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// A printable key.
    Char(char),
    /// Any other key (arrows, function keys, Enter, ...).
    Key,
    /// Mouse button or movement.
    Pointer,
    /// Interrupt request (Ctrl-C).
    Interrupt,
    /// The terminal changed size.
    Resize { width: u16, height: u16 },
}

/// Session construction options.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Seed for engine randomness; each effect run forks its own stream.
    pub seed: RngSeed,
    /// The terminal is attached to a remote login.
    pub remote: bool,
    /// End the session once a preview exits.
    pub preview_only: bool,
    pub governor: GovernorConfig,
    /// Idle time left at which `Monitoring` becomes `CountingDown`.
    pub countdown_window: Duration,
    /// Settings file to watch for changes.
    pub store: Option<ConfigStore>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            seed: RngSeed::Entropy,
            remote: false,
            preview_only: false,
            governor: GovernorConfig::default(),
            countdown_window: idlefx_core::lifecycle::DEFAULT_COUNTDOWN_WINDOW,
            store: None,
        }
    }
}

struct RunningEffect {
    session: SessionId,
    kind: EffectKind,
    engine: Box<dyn AnimationEngine>,
    ctx: Option<FxContext>,
    ticks: u64,
    /// Ticks since the last one that ran, skipped ones included.
    pending: u32,
    last_run: Instant,
    started_at: Instant,
}

impl std::fmt::Debug for RunningEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningEffect")
            .field("session", &self.session)
            .field("kind", &self.kind)
            .field("engine", &self.engine.name())
            .field("ticks", &self.ticks)
            .finish()
    }
}

/// Counters for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionCounters {
    /// Frames advanced and drawn.
    pub frames: u64,
    /// Ticks skipped by the governor.
    pub skipped: u64,
    /// Ticks dropped because the engine failed.
    pub engine_errors: u64,
    /// Effect runs started.
    pub effects_started: u64,
    /// Settings reloads applied.
    pub reloads: u64,
}

/// Everything the runtime drives, behind one tick function.
pub struct Session<S: InterruptSource = ProcInterrupts> {
    options: SessionOptions,
    machine: LifecycleMachine,
    events: mpsc::Receiver<LifecycleEvent>,
    activity: ActivitySignal<S>,
    telemetry: Box<dyn TelemetrySource>,
    governor: PerformanceGovernor,
    scheduler: Scheduler,
    effect: Option<RunningEffect>,
    stats: StatsReadout,
    canvas: Canvas,
    frame: Frame,
    status: String,
    blanked: bool,
    dirty: bool,
    finished: bool,
    config_mtime: Option<SystemTime>,
    error_log: LogThrottle,
    counters: SessionCounters,
}

impl<S: InterruptSource> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.machine.state())
            .field("effect", &self.effect)
            .field("telemetry", &self.telemetry.name())
            .field("counters", &self.counters)
            .finish()
    }
}

impl<S: InterruptSource> Session<S> {
    /// Build a session in `Disabled` for a `size` cell terminal.
    pub fn new(
        config: Arc<Config>,
        activity: ActivitySignal<S>,
        telemetry: Box<dyn TelemetrySource>,
        size: (u16, u16),
        options: SessionOptions,
        now: Instant,
    ) -> Self {
        let config = restrict_for_remote(config, options.remote);
        let (machine, events) = LifecycleMachine::new(Arc::clone(&config), now);
        let machine = machine.with_countdown_window(options.countdown_window);
        let governor = PerformanceGovernor::new(
            options.governor.clone(),
            GovernorModes::from_config(&config),
            config.frame_interval(),
            now,
        );
        let activity_interval = machine.activity_poll_interval();
        let frame_interval = governor.tick_interval();
        let gc = options.governor.clone();
        let scheduler = Scheduler::new(
            |kind| match kind {
                TimerKind::Timeout => TIMEOUT_CHECK_INTERVAL,
                TimerKind::Activity => activity_interval,
                TimerKind::Animation => frame_interval,
                TimerKind::Performance => gc.check_interval,
                TimerKind::Emergency => gc.emergency_check_interval,
                TimerKind::Stats => STATS_SAMPLE_INTERVAL,
                TimerKind::Reload => RELOAD_INTERVAL,
            },
            now,
        );
        let config_mtime = options.store.as_ref().and_then(ConfigStore::modified);
        let stats = StatsReadout::new(
            config.show_stats,
            config.target_fps,
            DriftOverlay::new(config.stats_drift),
        );

        let mut session = Self {
            options,
            machine,
            events,
            activity,
            telemetry,
            governor,
            scheduler,
            effect: None,
            stats,
            canvas: Canvas::new(size.0, size.1),
            frame: Frame::new(size.0, size.1),
            status: String::new(),
            blanked: false,
            dirty: true,
            finished: false,
            config_mtime,
            error_log: LogThrottle::new(ERROR_LOG_INTERVAL),
            counters: SessionCounters::default(),
        };
        session.sync_timers(now);
        session
    }

    // -- accessors ---------------------------------------------------------

    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.machine.state()
    }

    #[inline]
    pub fn config(&self) -> &Arc<Config> {
        self.machine.config()
    }

    #[inline]
    pub fn machine(&self) -> &LifecycleMachine {
        &self.machine
    }

    #[inline]
    pub fn governor(&self) -> &PerformanceGovernor {
        &self.governor
    }

    #[inline]
    pub fn stats(&self) -> &StatsReadout {
        &self.stats
    }

    #[inline]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[inline]
    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    /// Running effect kind, if any.
    pub fn running_effect(&self) -> Option<EffectKind> {
        self.effect.as_ref().map(|e| e.kind)
    }

    /// Trail length the running engine currently uses.
    pub fn effect_trail_length(&self) -> Option<usize> {
        self.effect.as_ref().map(|e| e.engine.trail_length())
    }

    /// The composed frame to present.
    #[inline]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Whether the screen is blanked by the display timeout.
    #[inline]
    pub fn is_blanked(&self) -> bool {
        self.blanked
    }

    /// Whether the driver should stop.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Mutable access to the activity source (tests script counters with it).
    pub fn activity_source_mut(&mut self) -> &mut S {
        self.activity.source_mut()
    }

    /// How long the event loop may wait before the next tick.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.scheduler.time_until_next(now)
    }

    // -- lifecycle entry points -------------------------------------------

    /// Start idle monitoring, unless the configuration forbids it here.
    pub fn enable(&mut self, now: Instant) {
        if self.blocked_by_remote() {
            idlefx_core::info!("remote session and physical_only is set, idle activation stays off");
        } else if !self.config().enabled {
            idlefx_core::info!("idle activation disabled in settings");
        } else {
            self.activity.restart(now);
            self.machine.enable(now);
        }
        self.after_machine_call(now);
    }

    /// Stop monitoring and any running effect.
    pub fn disable(&mut self, now: Instant) {
        self.machine.disable(now);
        self.after_machine_call(now);
    }

    /// Preview `effect` right away.
    pub fn start_test(&mut self, effect: EffectKind, now: Instant) -> SessionId {
        let id = self.machine.start_test(effect, now);
        self.after_machine_call(now);
        id
    }

    /// Swap in a new configuration snapshot between ticks.
    pub fn update_settings(&mut self, config: Arc<Config>, now: Instant) {
        let allowed = restrict_for_remote(config, self.options.remote);
        self.activity.set_strictness(allowed.strictness());
        self.governor
            .reconfigure(GovernorModes::from_config(&allowed), allowed.frame_interval());
        self.stats
            .reconfigure(allowed.target_fps, DriftOverlay::new(allowed.stats_drift));
        self.machine.update_settings(allowed, now);
        self.after_machine_call(now);
    }

    /// End everything for shutdown. The running effect gets its exit event.
    pub fn shutdown(&mut self, now: Instant) {
        self.machine.stop_effect(ExitCause::Stopped, now);
        self.machine.disable(now);
        self.after_machine_call(now);
        self.finished = true;
    }

    /// React to terminal input.
    pub fn handle_input(&mut self, event: InputEvent, now: Instant) {
        match event {
            InputEvent::Resize { width, height } => self.resize(width, height),
            InputEvent::Interrupt => self.shutdown(now),
            InputEvent::Char('f' | 'F') if self.effect.is_some() => {
                let visible = self.stats.toggle();
                idlefx_core::debug!(visible, "stats overlay toggled");
            }
            InputEvent::Char('q' | 'Q') if self.effect.is_none() => self.shutdown(now),
            InputEvent::Char(_) | InputEvent::Key | InputEvent::Pointer => {
                self.machine.notify_input(now);
                self.after_machine_call(now);
            }
        }
    }

    /// Adopt a new terminal size.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.canvas.resize(width, height);
        self.frame.resize(width, height);
        if let Some(effect) = &mut self.effect {
            effect.engine.resize(width, height);
        }
        self.status.clear();
        self.dirty = true;
    }

    // -- tick ----------------------------------------------------------------

    /// Run every due callback. Returns `true` when [`Session::frame`] changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.scheduler.fire(TimerKind::Reload, now) {
            self.reload(now);
        }

        if self.scheduler.fire(TimerKind::Activity, now) {
            let detected = self.activity.poll(now);
            self.machine.on_activity(detected, now);
            self.after_machine_call(now);
        }

        if self.scheduler.fire(TimerKind::Timeout, now) {
            self.machine.on_timeout_tick(now);
            self.after_machine_call(now);
        }

        if self.effect.is_some() {
            // At most one refresh per tick, however many consumers are due.
            let mut sample = None;

            if self.scheduler.fire(TimerKind::Emergency, now) {
                let cpu = shared_sample(self.telemetry.as_mut(), &mut sample).cpu_percent;
                if self.governor.check_emergency(cpu).is_some() {
                    let interval = self.governor.tick_interval();
                    self.scheduler
                        .timer_mut(TimerKind::Animation)
                        .set_interval(interval, now);
                }
            }

            if self.scheduler.fire(TimerKind::Stats, now) {
                let sample = shared_sample(self.telemetry.as_mut(), &mut sample);
                self.stats.record_sample(&sample);
            }

            if self.scheduler.fire(TimerKind::Performance, now) {
                let sample = shared_sample(self.telemetry.as_mut(), &mut sample);
                self.run_performance_check(&sample);
            }

            if self.scheduler.fire(TimerKind::Animation, now) {
                self.animate(now);
            }
        }

        if self.effect.is_none() {
            self.draw_status(now);
        }
        self.sync_timers(now);
        std::mem::take(&mut self.dirty)
    }

    fn run_performance_check(&mut self, sample: &TelemetrySample) {
        let Some(effect) = &mut self.effect else {
            return;
        };
        let check = self
            .governor
            .check_performance(sample, effect.engine.trail_length());
        if check.trail_length != effect.engine.trail_length() {
            effect.engine.set_trail_length(check.trail_length);
        }
    }

    fn animate(&mut self, now: Instant) {
        if self.machine.should_blank(now) {
            if !self.blanked {
                idlefx_core::info!("display timeout reached, blanking");
                self.blanked = true;
                self.canvas.clear();
                self.frame.clear();
                self.dirty = true;
            }
            return;
        }

        let Some(effect) = &mut self.effect else {
            return;
        };
        let tick = effect.ticks;
        effect.ticks += 1;
        effect.pending = effect.pending.saturating_add(1);
        if self.governor.prepare_frame(tick, now) == FrameAction::Skip {
            self.counters.skipped += 1;
            return;
        }

        let dt = now.saturating_duration_since(effect.last_run);
        effect.last_run = now;
        // Delta per tick, skipped ones included.
        self.governor.record_frame(dt / std::mem::take(&mut effect.pending).max(1));
        let quality = self.governor.quality();
        let ctx = match effect.ctx {
            Some(prev) => prev.next(dt.as_secs_f32(), quality),
            None => FxContext {
                quality,
                ..FxContext::first(dt.as_secs_f32())
            },
        };
        effect.ctx = Some(ctx);

        if let Err(e) = effect.engine.advance(&ctx) {
            self.counters.engine_errors += 1;
            if self.error_log.allow(now) {
                let suppressed = self.error_log.take_suppressed();
                idlefx_core::warn!(
                    engine = effect.engine.name(),
                    error = %e,
                    suppressed,
                    "engine tick failed, frame skipped"
                );
            }
            return;
        }

        self.canvas.clear();
        effect.engine.render(&ctx, &mut self.canvas);
        self.stats.record_frame(now);
        self.stats.render(
            now.saturating_duration_since(effect.started_at),
            effect.engine.stats_palette(),
            &mut self.canvas,
        );
        self.canvas.compose_into(&mut self.frame);
        self.blanked = false;
        self.counters.frames += 1;
        self.dirty = true;
    }

    // -- lifecycle events ----------------------------------------------------

    fn after_machine_call(&mut self, now: Instant) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                LifecycleEvent::Activated { session, effect }
                | LifecycleEvent::TestStarted { session, effect } => {
                    self.start_effect(session, effect, now);
                }
                LifecycleEvent::Exited {
                    session,
                    effect,
                    cause,
                    test,
                } => {
                    self.end_effect(session, effect, cause, test);
                }
            }
        }
        self.sync_timers(now);
    }

    fn start_effect(&mut self, session: SessionId, kind: EffectKind, now: Instant) {
        let config = Arc::clone(self.machine.config());
        let (width, height) = self.canvas.cell_size();
        let rng = self.options.seed.fork(session.0).into_rng();
        let engine = build_engine(kind, &config, width, height, rng);

        self.governor.reset(now);
        self.governor
            .reconfigure(GovernorModes::from_config(&config), config.frame_interval());
        self.stats = StatsReadout::new(
            config.show_stats,
            config.target_fps,
            DriftOverlay::new(config.stats_drift),
        );
        // Device enumeration right after launch produces interrupt noise.
        self.activity.restart(now);
        self.canvas.clear();
        self.frame.clear();
        self.blanked = false;
        self.dirty = true;
        self.counters.effects_started += 1;

        idlefx_core::info!(
            session = session.0,
            effect = kind.as_str(),
            width,
            height,
            quality = self.governor.quality(),
            "effect running"
        );
        self.effect = Some(RunningEffect {
            session,
            kind,
            engine,
            ctx: None,
            ticks: 0,
            pending: 0,
            last_run: now,
            started_at: now,
        });
    }

    fn end_effect(&mut self, session: SessionId, kind: EffectKind, cause: ExitCause, test: bool) {
        if self.effect.as_ref().is_some_and(|e| e.session == session) {
            self.effect = None;
        }
        idlefx_core::debug!(
            session = session.0,
            effect = kind.as_str(),
            cause = cause.as_str(),
            frames = self.counters.frames,
            "effect torn down"
        );
        self.canvas.clear();
        self.frame.clear();
        self.status.clear();
        self.blanked = false;
        self.dirty = true;
        if test && self.options.preview_only {
            self.finished = true;
        }
    }

    // -- timers --------------------------------------------------------------

    fn sync_timers(&mut self, now: Instant) {
        let wanted = self.machine.timers();
        let animating = wanted.animation && self.effect.is_some();
        let s = &mut self.scheduler;
        s.set_running(TimerKind::Timeout, wanted.timeout_check, now);
        s.set_running(TimerKind::Activity, wanted.activity_poll, now);
        s.set_running(TimerKind::Animation, animating, now);
        s.set_running(TimerKind::Performance, animating, now);
        s.set_running(TimerKind::Emergency, animating, now);
        s.set_running(TimerKind::Stats, animating, now);
        s.set_running(TimerKind::Reload, self.options.store.is_some(), now);

        let poll = self.machine.activity_poll_interval();
        s.timer_mut(TimerKind::Activity).set_interval(poll, now);
        let frame = self.governor.tick_interval();
        s.timer_mut(TimerKind::Animation).set_interval(frame, now);
    }

    // -- settings reload -----------------------------------------------------

    fn reload(&mut self, now: Instant) {
        let Some(store) = &self.options.store else {
            return;
        };
        let modified = store.modified();
        if modified.is_none() || modified == self.config_mtime {
            return;
        }
        self.config_mtime = modified;
        let config = store.load();
        idlefx_core::info!(path = %store.path().display(), "settings changed on disk, reloading");
        self.counters.reloads += 1;
        self.update_settings(Arc::new(config), now);
    }

    fn blocked_by_remote(&self) -> bool {
        self.options.remote && self.config().physical_only
    }

    // -- status line ---------------------------------------------------------

    /// One-line status shown while no effect runs.
    pub fn status_line(&self, now: Instant) -> String {
        let effect = self.config().effect.as_str();
        match self.machine.state() {
            LifecycleState::Disabled if self.blocked_by_remote() => {
                "idlefx: remote session, idle activation off (physical_only)  [q] quit".to_owned()
            }
            LifecycleState::Disabled => "idlefx: disabled  [q] quit".to_owned(),
            LifecycleState::Monitoring => {
                let left = self
                    .machine
                    .remaining(now)
                    .unwrap_or_default()
                    .as_secs();
                format!(
                    "idlefx: {effect} in {}:{:02} of idle  [q] quit",
                    left / 60,
                    left % 60
                )
            }
            LifecycleState::CountingDown => {
                let left = self.machine.remaining(now).unwrap_or_default().as_secs();
                format!("idlefx: starting {effect} in {left}s  [any key] cancel")
            }
            LifecycleState::Active | LifecycleState::Testing => String::new(),
        }
    }

    fn draw_status(&mut self, now: Instant) {
        let line = self.status_line(now);
        if line == self.status {
            return;
        }
        self.canvas.clear();
        self.canvas
            .put_text(0, 0, &line, STATUS_COLOR, StyleFlags::DIM);
        self.canvas.compose_into(&mut self.frame);
        self.status = line;
        self.dirty = true;
    }
}

/// The tick's telemetry reading, refreshing the source on first use only.
fn shared_sample(
    telemetry: &mut dyn TelemetrySource,
    slot: &mut Option<TelemetrySample>,
) -> TelemetrySample {
    *slot.get_or_insert_with(|| telemetry.sample())
}

/// Idle activation is off in a remote login when `physical_only` is set.
fn restrict_for_remote(config: Arc<Config>, remote: bool) -> Arc<Config> {
    if remote && config.physical_only && config.enabled {
        Arc::new(Config {
            enabled: false,
            ..(*config).clone()
        })
    } else {
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idlefx_core::activity::{ActivityConfig, StaticInterrupts};
    use idlefx_core::telemetry::{NoTelemetry, ScriptedTelemetry};
    use std::cell::Cell;
    use std::rc::Rc;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn session_with(config: Config, options: SessionOptions) -> (Session<StaticInterrupts>, Instant) {
        let t0 = Instant::now();
        let activity = ActivitySignal::new(
            StaticInterrupts::with_total(100),
            ActivityConfig {
                strictness: config.strictness(),
                grace_period: Duration::ZERO,
            },
        );
        let session = Session::new(
            Arc::new(config),
            activity,
            Box::new(NoTelemetry),
            (40, 12),
            SessionOptions {
                seed: RngSeed::Fixed(1),
                ..options
            },
            t0,
        );
        (session, t0)
    }

    fn quick() -> Config {
        Config {
            lock_timeout: 5,
            target_fps: 10,
            ..Config::default()
        }
    }

    /// Tick every 100 ms from `from` up to and including `to`.
    fn run(s: &mut Session<StaticInterrupts>, from: Instant, to: Duration) -> Instant {
        let mut now = from;
        let end = from + to;
        while now < end {
            now += Duration::from_millis(100);
            s.tick(now);
        }
        now
    }

    #[test]
    fn idle_timeout_starts_effect_and_draws() {
        let (mut s, t0) = session_with(quick(), SessionOptions::default());
        s.enable(t0);
        assert_eq!(s.state(), LifecycleState::Monitoring);
        let now = run(&mut s, t0, secs(6));
        assert_eq!(s.state(), LifecycleState::Active);
        assert_eq!(s.running_effect(), Some(EffectKind::Matrix));
        run(&mut s, now, secs(2));
        assert!(s.counters().frames > 0);
        assert!(s.frame().filled() > 0);
    }

    #[test]
    fn key_ends_effect_but_f_toggles_stats() {
        let (mut s, t0) = session_with(quick(), SessionOptions::default());
        s.enable(t0);
        let now = run(&mut s, t0, secs(6));
        assert!(s.running_effect().is_some());

        assert!(!s.stats().is_visible());
        s.handle_input(InputEvent::Char('f'), now);
        assert!(s.stats().is_visible());
        assert!(s.running_effect().is_some());

        s.handle_input(InputEvent::Pointer, now);
        assert_eq!(s.state(), LifecycleState::Monitoring);
        assert!(s.running_effect().is_none());
        assert_eq!(s.machine().idle_elapsed(now), Duration::ZERO);
    }

    #[test]
    fn interrupt_activity_ends_effect() {
        let (mut s, t0) = session_with(quick(), SessionOptions::default());
        s.enable(t0);
        let now = run(&mut s, t0, secs(6));
        assert!(s.running_effect().is_some());
        // Let the signal re-establish its baseline after the restart.
        let now = run(&mut s, now, secs(1));
        s.activity_source_mut().set_total(500);
        let now = run(&mut s, now, Duration::from_millis(600));
        assert!(s.state().is_counting());
        assert!(s.running_effect().is_none());
        assert!(s.machine().idle_elapsed(now) < secs(1));
    }

    #[test]
    fn preview_only_finishes_after_exit() {
        let (mut s, t0) = session_with(
            quick(),
            SessionOptions {
                preview_only: true,
                ..SessionOptions::default()
            },
        );
        s.start_test(EffectKind::Mystify, t0);
        assert_eq!(s.state(), LifecycleState::Testing);
        let now = run(&mut s, t0, secs(2));
        assert!(!s.is_finished());
        s.handle_input(InputEvent::Key, now);
        assert!(s.is_finished());
        assert_eq!(s.state(), LifecycleState::Disabled);
    }

    #[test]
    fn q_quits_only_while_idle() {
        let (mut s, t0) = session_with(quick(), SessionOptions::default());
        s.enable(t0);
        s.handle_input(InputEvent::Char('q'), t0);
        assert!(s.is_finished());
        assert_eq!(s.state(), LifecycleState::Disabled);
    }

    #[test]
    fn remote_physical_only_never_activates() {
        let (mut s, t0) = session_with(
            quick(),
            SessionOptions {
                remote: true,
                ..SessionOptions::default()
            },
        );
        s.enable(t0);
        run(&mut s, t0, secs(10));
        assert_eq!(s.state(), LifecycleState::Disabled);
        assert!(s.status_line(t0).contains("physical_only"));

        // Previews are still allowed, and ending one does not start monitoring.
        s.start_test(EffectKind::Matrix, t0);
        assert_eq!(s.state(), LifecycleState::Testing);
        s.handle_input(InputEvent::Key, t0);
        assert_eq!(s.state(), LifecycleState::Disabled);
    }

    #[test]
    fn remote_without_physical_only_activates() {
        let (mut s, t0) = session_with(
            Config {
                physical_only: false,
                ..quick()
            },
            SessionOptions {
                remote: true,
                ..SessionOptions::default()
            },
        );
        s.enable(t0);
        run(&mut s, t0, secs(6));
        assert_eq!(s.state(), LifecycleState::Active);
    }

    #[test]
    fn display_timeout_blanks() {
        let config = Config {
            lock_timeout: 2,
            display_timeout: 4,
            ..quick()
        };
        let (mut s, t0) = session_with(config, SessionOptions::default());
        s.enable(t0);
        let now = run(&mut s, t0, secs(3));
        assert!(s.running_effect().is_some());
        assert!(!s.is_blanked());
        run(&mut s, now, secs(2));
        assert!(s.is_blanked());
        assert_eq!(s.frame().filled(), 0);
    }

    #[test]
    fn engine_error_skips_tick() {
        let (mut s, t0) = session_with(quick(), SessionOptions::default());
        s.start_test(EffectKind::Matrix, t0);
        s.resize(0, 0);
        run(&mut s, t0, secs(1));
        assert!(s.counters().engine_errors > 0);
        assert_eq!(s.counters().frames, 0);
        assert_eq!(s.state(), LifecycleState::Testing);
    }

    #[test]
    fn settings_update_disables_monitoring() {
        let (mut s, t0) = session_with(quick(), SessionOptions::default());
        s.enable(t0);
        s.update_settings(
            Arc::new(Config {
                enabled: false,
                ..quick()
            }),
            t0,
        );
        assert_eq!(s.state(), LifecycleState::Disabled);
        assert!(s.time_until_next(t0).is_none());
    }

    #[test]
    fn emergency_throttle_slows_animation() {
        let t0 = Instant::now();
        let config = quick();
        let activity = ActivitySignal::new(StaticInterrupts::with_total(1), ActivityConfig::default());
        let mut s = Session::new(
            Arc::new(config),
            activity,
            Box::new(ScriptedTelemetry::constant(95.0, 10.0)),
            (40, 12),
            SessionOptions {
                seed: RngSeed::Fixed(2),
                ..SessionOptions::default()
            },
            t0,
        );
        s.start_test(EffectKind::Matrix, t0);
        run(&mut s, t0, secs(3));
        assert!(s.governor().is_throttled());
        assert_eq!(
            s.scheduler().timer(TimerKind::Animation).interval(),
            Duration::from_millis(1000)
        );
    }

    /// Scripted load that counts refreshes.
    struct CountedTelemetry {
        inner: ScriptedTelemetry,
        refreshes: Rc<Cell<usize>>,
    }

    impl TelemetrySource for CountedTelemetry {
        fn name(&self) -> &str {
            "counted"
        }

        fn refresh(&mut self) {
            self.refreshes.set(self.refreshes.get() + 1);
            self.inner.refresh();
        }

        fn cpu_percent(&self) -> Option<f64> {
            self.inner.cpu_percent()
        }

        fn memory_percent(&self) -> Option<f64> {
            self.inner.memory_percent()
        }

        fn process_cpu_percent(&self) -> Option<f64> {
            self.inner.process_cpu_percent()
        }

        fn process_memory_mb(&self) -> Option<f64> {
            self.inner.process_memory_mb()
        }
    }

    fn counted_session(
        config: Config,
        cpu: &[f64],
    ) -> (Session<StaticInterrupts>, Rc<Cell<usize>>, Instant) {
        let t0 = Instant::now();
        let refreshes = Rc::new(Cell::new(0));
        let activity = ActivitySignal::new(StaticInterrupts::with_total(1), ActivityConfig::default());
        let s = Session::new(
            Arc::new(config),
            activity,
            Box::new(CountedTelemetry {
                inner: ScriptedTelemetry::cpu_series(cpu),
                refreshes: Rc::clone(&refreshes),
            }),
            (40, 12),
            SessionOptions {
                seed: RngSeed::Fixed(3),
                ..SessionOptions::default()
            },
            t0,
        );
        (s, refreshes, t0)
    }

    #[test]
    fn aligned_timers_share_one_telemetry_refresh() {
        let series: Vec<f64> = (1..=20).map(|n| f64::from(n) * 4.0).collect();
        let (mut s, refreshes, t0) = counted_session(quick(), &series);
        s.start_test(EffectKind::Matrix, t0);

        // Stats fires every second, emergency every 2 s, performance every 5 s.
        let now = run(&mut s, t0, secs(4));
        assert_eq!(refreshes.get(), 4);
        run(&mut s, now, secs(6));
        assert_eq!(refreshes.get(), 10);
        assert!(s.running_effect().is_some());
        assert_eq!(s.governor().telemetry().checks_run, 2);
    }

    #[test]
    fn power_saving_skips_are_not_slow_frames() {
        let config = Config {
            power_saving_mode: true,
            energy_efficient: false,
            ..quick()
        };
        let (mut s, _, t0) = counted_session(config, &[5.0]);
        s.start_test(EffectKind::Matrix, t0);
        run(&mut s, t0, secs(20));
        assert!(s.counters().skipped > 0);
        assert_eq!(
            s.governor().average_frame_time(),
            Some(Duration::from_millis(100))
        );
        assert!((s.governor().quality() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn status_counts_down() {
        let (mut s, t0) = session_with(
            Config {
                lock_timeout: 125,
                ..quick()
            },
            SessionOptions::default(),
        );
        s.enable(t0);
        assert_eq!(s.status_line(t0), "idlefx: matrix in 2:05 of idle  [q] quit");
        run(&mut s, t0, secs(1));
        assert!(s.frame().row_text(0).starts_with("idlefx: matrix in 2:0"));
    }
}
