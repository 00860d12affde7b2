#![forbid(unsafe_code)]

//! Performance governor with graceful degradation.
//!
//! The governor owns the quality level every engine reads each frame. Two
//! independent mechanisms adjust the work a running effect does:
//!
//! - **Adaptive quality**, run every [`GovernorConfig::check_interval`]:
//!   steps quality down when frames are slow or the machine is loaded and
//!   back up when frames are fast. Very high CPU also raises the
//!   [`FrameSkipRatio`]; very high memory shrinks the trail length.
//! - **Emergency throttle**, run every
//!   [`GovernorConfig::emergency_check_interval`]: above the emergency CPU
//!   threshold the tick interval is forced to
//!   [`GovernorConfig::throttled_interval`] until CPU falls back.
//!
//! Neither mechanism removes animated entities. Quality only changes trail
//! depth and update frequency inside the engines.
//!
//! # Usage
//!
//! ```
//! use std::time::{Duration, Instant};
//! use idlefx_core::telemetry::TelemetrySample;
//! use idlefx_runtime::governor::{GovernorConfig, GovernorModes, PerformanceGovernor};
//!
//! let now = Instant::now();
//! let mut governor = PerformanceGovernor::new(
//!     GovernorConfig::default(),
//!     GovernorModes::default(),
//!     Duration::from_millis(66),
//!     now,
//! );
//! governor.record_frame(Duration::from_millis(20));
//! let sample = TelemetrySample { cpu_percent: Some(10.0), ..Default::default() };
//! let check = governor.check_performance(&sample, 50);
//! assert!(governor.quality() <= 1.0);
//! assert_eq!(check.trail_length, 50);
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use idlefx_core::config::Config;
use idlefx_core::telemetry::TelemetrySample;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Thresholds and step sizes for both control mechanisms.
#[derive(Debug, Clone, PartialEq)]
pub struct GovernorConfig {
    /// Cadence of the adaptive-quality check.
    pub check_interval: Duration,
    /// Frame-time samples kept for the average.
    pub frame_window: usize,
    /// Average above `target * slow_factor` degrades, where the target is
    /// the current tick interval.
    pub slow_factor: f64,
    /// Quality removed for slow frames.
    pub slow_step: f32,
    /// Lowest quality slow frames can reach.
    pub slow_floor: f32,
    /// Average below `target * fast_factor` upgrades.
    pub fast_factor: f64,
    /// Quality restored for fast frames.
    pub fast_step: f32,
    /// System CPU percent above which quality drops.
    pub cpu_threshold: f64,
    /// System CPU percent above which the skip ratio grows.
    pub cpu_skip_threshold: f64,
    /// Largest frame skip ratio.
    pub max_skip_ratio: u8,
    /// System memory percent above which quality drops.
    pub memory_threshold: f64,
    /// System memory percent above which the trail shrinks.
    pub memory_trail_threshold: f64,
    /// Quality removed under CPU or memory pressure.
    pub load_step: f32,
    /// Lowest quality load pressure can reach.
    pub load_floor: f32,
    /// Multiplier applied to the trail length under memory pressure.
    pub trail_shrink: f64,
    /// Shortest trail memory pressure can produce.
    pub trail_floor: usize,
    /// System CPU percent above which the emergency throttle engages.
    pub emergency_threshold: f64,
    /// Cadence of the emergency check.
    pub emergency_check_interval: Duration,
    /// Tick interval while throttled.
    pub throttled_interval: Duration,
    /// Quality cap in power-saving mode.
    pub power_saving_cap: f32,
    /// Quality cap in energy-efficient mode, once the session is settled.
    pub energy_cap: f32,
    /// Session age after which the energy-efficient cap applies.
    pub energy_settle: Duration,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(5),
            frame_window: 60,
            slow_factor: 2.0,
            slow_step: 0.05,
            slow_floor: 0.5,
            fast_factor: 0.8,
            fast_step: 0.05,
            cpu_threshold: 40.0,
            cpu_skip_threshold: 70.0,
            max_skip_ratio: 4,
            memory_threshold: 70.0,
            memory_trail_threshold: 85.0,
            load_step: 0.1,
            load_floor: 0.3,
            trail_shrink: 0.8,
            trail_floor: 10,
            emergency_threshold: 90.0,
            emergency_check_interval: Duration::from_secs(2),
            throttled_interval: Duration::from_millis(1000),
            power_saving_cap: 0.6,
            energy_cap: 0.7,
            energy_settle: Duration::from_secs(30),
        }
    }
}

/// User-selected governor behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GovernorModes {
    /// Let CPU and memory load lower quality.
    pub auto_cpu_limit: bool,
    /// Skip odd frames and cap quality.
    pub power_saving: bool,
    /// Cap quality once the session has run a while.
    pub energy_efficient: bool,
}

impl Default for GovernorModes {
    fn default() -> Self {
        Self {
            auto_cpu_limit: false,
            power_saving: false,
            energy_efficient: true,
        }
    }
}

impl GovernorModes {
    pub fn from_config(config: &Config) -> Self {
        Self {
            auto_cpu_limit: config.auto_cpu_limit,
            power_saving: config.power_saving_mode,
            energy_efficient: config.energy_efficient,
        }
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Outcome of one adaptive-quality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernorDecision {
    /// Quality unchanged.
    Hold,
    /// Quality lowered.
    Degrade,
    /// Quality raised.
    Upgrade,
}

impl GovernorDecision {
    /// JSONL-compatible string representation.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hold => "hold",
            Self::Degrade => "degrade",
            Self::Upgrade => "upgrade",
        }
    }
}

/// Result of [`PerformanceGovernor::check_performance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceCheck {
    pub decision: GovernorDecision,
    /// Trail length the engine should use from now on.
    pub trail_length: usize,
}

/// Emergency throttle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleChange {
    /// CPU crossed the emergency threshold; ticks slow to the throttled interval.
    Engaged,
    /// CPU recovered; the configured interval is back.
    Released,
}

/// What the host does with one animation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    /// Advance and draw.
    Run,
    /// Do nothing this tick; the next run sees the accumulated delta.
    Skip,
}

/// Run one tick out of every `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FrameSkipRatio(u8);

impl Default for FrameSkipRatio {
    fn default() -> Self {
        Self::NONE
    }
}

impl FrameSkipRatio {
    /// Every tick runs.
    pub const NONE: Self = Self(1);

    /// Ratio `n`, at least 1.
    pub const fn new(n: u8) -> Self {
        Self(if n == 0 { 1 } else { n })
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Whether `frame` is one of the skipped ticks.
    #[inline]
    pub fn skips(self, frame: u64) -> bool {
        self.0 > 1 && frame % u64::from(self.0) != 0
    }

    #[must_use]
    fn raised(self, max: u8) -> Self {
        Self(self.0.saturating_add(1).min(max.max(1)))
    }

    #[must_use]
    fn lowered(self) -> Self {
        Self(self.0.saturating_sub(1).max(1))
    }
}

/// Snapshot of governor state for logs and the stats overlay.
///
/// All fields are `Copy`; capturing one per frame allocates nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GovernorTelemetry {
    pub quality: f32,
    pub skip_ratio: FrameSkipRatio,
    pub throttled: bool,
    /// Whether CPU readings were present at the last check.
    pub telemetry_available: bool,
    /// Average frame time over the window, if any frames were recorded.
    pub average_frame_time: Option<Duration>,
    pub last_decision: GovernorDecision,
    pub tick_interval: Duration,
    pub checks_run: u64,
}

// ---------------------------------------------------------------------------
// Governor
// ---------------------------------------------------------------------------

/// Quality, frame skipping and emergency throttling for one effect run.
#[derive(Debug, Clone)]
pub struct PerformanceGovernor {
    config: GovernorConfig,
    modes: GovernorModes,
    quality: f32,
    skip_ratio: FrameSkipRatio,
    frame_times: VecDeque<Duration>,
    base_interval: Duration,
    throttled: bool,
    telemetry_available: bool,
    started_at: Instant,
    last_decision: GovernorDecision,
    checks_run: u64,
}

impl PerformanceGovernor {
    /// Governor at full quality with the configured tick interval.
    pub fn new(
        config: GovernorConfig,
        modes: GovernorModes,
        base_interval: Duration,
        now: Instant,
    ) -> Self {
        let frame_window = config.frame_window;
        Self {
            config,
            modes,
            quality: 1.0,
            skip_ratio: FrameSkipRatio::NONE,
            frame_times: VecDeque::with_capacity(frame_window),
            base_interval,
            throttled: false,
            telemetry_available: true,
            started_at: now,
            last_decision: GovernorDecision::Hold,
            checks_run: 0,
        }
    }

    /// Current quality in `[0, 1]`.
    #[inline]
    pub fn quality(&self) -> f32 {
        self.quality
    }

    #[inline]
    pub fn skip_ratio(&self) -> FrameSkipRatio {
        self.skip_ratio
    }

    #[inline]
    pub fn is_throttled(&self) -> bool {
        self.throttled
    }

    #[inline]
    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    #[inline]
    pub fn modes(&self) -> GovernorModes {
        self.modes
    }

    /// Interval the animation timer should use right now.
    #[inline]
    pub fn tick_interval(&self) -> Duration {
        if self.throttled {
            self.config.throttled_interval
        } else {
            self.base_interval
        }
    }

    /// Apply new settings between ticks. Quality and throttle state carry over.
    pub fn reconfigure(&mut self, modes: GovernorModes, base_interval: Duration) {
        self.modes = modes;
        if base_interval != self.base_interval && !self.throttled {
            self.frame_times.clear();
        }
        self.base_interval = base_interval;
    }

    /// Start over for a new effect run.
    pub fn reset(&mut self, now: Instant) {
        self.quality = 1.0;
        self.skip_ratio = FrameSkipRatio::NONE;
        self.frame_times.clear();
        self.throttled = false;
        self.telemetry_available = true;
        self.started_at = now;
        self.last_decision = GovernorDecision::Hold;
        self.checks_run = 0;
    }

    /// Record the wall-clock delta of one animation tick.
    ///
    /// The window only ever holds deltas taken at the current tick interval:
    /// a throttle transition empties it.
    pub fn record_frame(&mut self, dt: Duration) {
        self.frame_times.push_back(dt);
        while self.frame_times.len() > self.config.frame_window.max(1) {
            self.frame_times.pop_front();
        }
    }

    /// Average of the recorded frame deltas.
    pub fn average_frame_time(&self) -> Option<Duration> {
        if self.frame_times.is_empty() {
            return None;
        }
        let total: Duration = self.frame_times.iter().sum();
        Some(total / self.frame_times.len() as u32)
    }

    /// Decide whether tick `frame` runs, applying the mode caps.
    pub fn prepare_frame(&mut self, frame: u64, now: Instant) -> FrameAction {
        if self.modes.power_saving {
            if frame % 2 != 0 {
                return FrameAction::Skip;
            }
            self.quality = self.quality.min(self.config.power_saving_cap);
        }
        if self.modes.energy_efficient
            && now.saturating_duration_since(self.started_at) > self.config.energy_settle
        {
            self.quality = self.quality.min(self.config.energy_cap);
        }
        if self.skip_ratio.skips(frame) {
            return FrameAction::Skip;
        }
        FrameAction::Run
    }

    /// Adaptive-quality check. Call every [`GovernorConfig::check_interval`].
    ///
    /// Without a CPU reading the governor holds: adaptive quality needs
    /// telemetry to be meaningful.
    pub fn check_performance(
        &mut self,
        sample: &TelemetrySample,
        trail_length: usize,
    ) -> PerformanceCheck {
        self.checks_run += 1;
        let Some(cpu) = sample.cpu_percent else {
            if self.telemetry_available {
                idlefx_core::info!("telemetry unavailable, adaptive quality disabled");
            }
            self.telemetry_available = false;
            self.last_decision = GovernorDecision::Hold;
            return PerformanceCheck {
                decision: GovernorDecision::Hold,
                trail_length,
            };
        };
        self.telemetry_available = true;

        let before = self.quality;
        let mut trail = trail_length;
        let c = &self.config;

        if let Some(avg) = self.average_frame_time() {
            let avg = avg.as_secs_f64();
            let target = self.tick_interval().as_secs_f64();
            if avg > target * c.slow_factor {
                self.quality = (self.quality - c.slow_step).max(c.slow_floor.min(self.quality));
            } else if avg < target * c.fast_factor {
                self.quality = (self.quality + c.fast_step).min(1.0);
            }
        }

        if self.modes.auto_cpu_limit {
            if cpu > c.cpu_threshold {
                self.quality = (self.quality - c.load_step).max(c.load_floor.min(self.quality));
                if cpu > c.cpu_skip_threshold {
                    self.skip_ratio = self.skip_ratio.raised(c.max_skip_ratio);
                }
            } else if self.skip_ratio > FrameSkipRatio::NONE {
                self.skip_ratio = self.skip_ratio.lowered();
            }

            if let Some(memory) = sample.memory_percent
                && memory > c.memory_threshold
            {
                self.quality = (self.quality - c.load_step).max(c.load_floor.min(self.quality));
                if memory > c.memory_trail_threshold {
                    trail = ((trail_length as f64 * c.trail_shrink) as usize)
                        .max(c.trail_floor)
                        .min(trail_length);
                }
            }
        }

        let decision = if self.quality < before {
            GovernorDecision::Degrade
        } else if self.quality > before {
            GovernorDecision::Upgrade
        } else {
            GovernorDecision::Hold
        };
        self.last_decision = decision;

        match decision {
            GovernorDecision::Degrade => idlefx_core::info!(
                from = before,
                to = self.quality,
                cpu,
                skip_ratio = self.skip_ratio.get(),
                "governor: degrade"
            ),
            GovernorDecision::Upgrade => idlefx_core::debug!(
                from = before,
                to = self.quality,
                cpu,
                "governor: upgrade"
            ),
            GovernorDecision::Hold => {}
        }
        if trail != trail_length {
            idlefx_core::info!(from = trail_length, to = trail, "governor: trail shortened");
        }

        PerformanceCheck {
            decision,
            trail_length: trail,
        }
    }

    /// Emergency check. Call every [`GovernorConfig::emergency_check_interval`].
    ///
    /// Returns a change only on the transition, never while the state holds.
    /// A missing reading releases an engaged throttle.
    pub fn check_emergency(&mut self, cpu_percent: Option<f64>) -> Option<ThrottleChange> {
        let overloaded = cpu_percent.is_some_and(|cpu| cpu > self.config.emergency_threshold);
        match (overloaded, self.throttled) {
            (true, false) => {
                self.throttled = true;
                self.frame_times.clear();
                idlefx_core::warn!(
                    cpu = cpu_percent.unwrap_or_default(),
                    interval_ms = self.config.throttled_interval.as_millis() as u64,
                    "emergency throttle engaged"
                );
                Some(ThrottleChange::Engaged)
            }
            (false, true) => {
                self.throttled = false;
                self.frame_times.clear();
                idlefx_core::info!(
                    cpu = cpu_percent.unwrap_or_default(),
                    interval_ms = self.base_interval.as_millis() as u64,
                    "emergency throttle released"
                );
                Some(ThrottleChange::Released)
            }
            _ => None,
        }
    }

    /// Capture a telemetry snapshot.
    #[inline]
    pub fn telemetry(&self) -> GovernorTelemetry {
        GovernorTelemetry {
            quality: self.quality,
            skip_ratio: self.skip_ratio,
            throttled: self.throttled,
            telemetry_available: self.telemetry_available,
            average_frame_time: self.average_frame_time(),
            last_decision: self.last_decision,
            tick_interval: self.tick_interval(),
            checks_run: self.checks_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(66);

    fn governor(modes: GovernorModes) -> (PerformanceGovernor, Instant) {
        let now = Instant::now();
        (
            PerformanceGovernor::new(GovernorConfig::default(), modes, FRAME, now),
            now,
        )
    }

    fn loaded() -> GovernorModes {
        GovernorModes {
            auto_cpu_limit: true,
            power_saving: false,
            energy_efficient: false,
        }
    }

    fn sample(cpu: f64, memory: f64) -> TelemetrySample {
        TelemetrySample {
            cpu_percent: Some(cpu),
            memory_percent: Some(memory),
            ..TelemetrySample::default()
        }
    }

    fn feed(g: &mut PerformanceGovernor, dt: Duration, n: usize) {
        for _ in 0..n {
            g.record_frame(dt);
        }
    }

    #[test]
    fn slow_frames_degrade_gently_to_floor() {
        let (mut g, _) = governor(loaded());
        feed(&mut g, Duration::from_millis(200), 60);
        let check = g.check_performance(&sample(5.0, 10.0), 50);
        assert_eq!(check.decision, GovernorDecision::Degrade);
        assert!((g.quality() - 0.95).abs() < 1e-6);
        for _ in 0..20 {
            g.check_performance(&sample(5.0, 10.0), 50);
        }
        assert!((g.quality() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn fast_frames_upgrade_to_one() {
        let (mut g, _) = governor(loaded());
        feed(&mut g, Duration::from_millis(200), 60);
        g.check_performance(&sample(5.0, 10.0), 50);
        feed(&mut g, Duration::from_millis(10), 60);
        let check = g.check_performance(&sample(5.0, 10.0), 50);
        assert_eq!(check.decision, GovernorDecision::Upgrade);
        assert_eq!(g.quality(), 1.0);
        assert_eq!(g.check_performance(&sample(5.0, 10.0), 50).decision, GovernorDecision::Hold);
    }

    #[test]
    fn frames_at_configured_rate_keep_full_quality() {
        let base = Duration::from_millis(100);
        let mut g = PerformanceGovernor::new(
            GovernorConfig::default(),
            GovernorModes {
                auto_cpu_limit: false,
                ..loaded()
            },
            base,
            Instant::now(),
        );
        for _ in 0..10 {
            feed(&mut g, base, 60);
            let check = g.check_performance(&sample(5.0, 10.0), 50);
            assert_eq!(check.decision, GovernorDecision::Hold);
        }
        assert_eq!(g.quality(), 1.0);

        feed(&mut g, base * 3, 60);
        assert_eq!(
            g.check_performance(&sample(5.0, 10.0), 50).decision,
            GovernorDecision::Degrade
        );
    }

    #[test]
    fn throttle_transitions_empty_frame_window() {
        let (mut g, _) = governor(GovernorModes::default());
        feed(&mut g, FRAME, 30);
        g.check_emergency(Some(95.0));
        assert_eq!(g.average_frame_time(), None);

        // Throttled ticks arrive at the throttled interval, which is on target.
        feed(&mut g, Duration::from_millis(1000), 10);
        assert_eq!(g.check_performance(&sample(95.0, 10.0), 50).decision, GovernorDecision::Hold);
        assert_eq!(g.quality(), 1.0);

        assert_eq!(g.check_emergency(Some(20.0)), Some(ThrottleChange::Released));
        assert_eq!(g.average_frame_time(), None);
        feed(&mut g, Duration::from_millis(20), 10);
        assert_eq!(g.check_performance(&sample(20.0, 10.0), 50).decision, GovernorDecision::Hold);
        assert_eq!(g.quality(), 1.0);
    }

    #[test]
    fn frame_window_is_bounded() {
        let (mut g, _) = governor(loaded());
        feed(&mut g, Duration::from_millis(500), 60);
        feed(&mut g, Duration::from_millis(30), 60);
        assert_eq!(g.average_frame_time(), Some(Duration::from_millis(30)));
    }

    #[test]
    fn high_cpu_steps_quality_and_raises_skip() {
        let (mut g, _) = governor(loaded());
        feed(&mut g, Duration::from_millis(100), 10);
        g.check_performance(&sample(50.0, 10.0), 50);
        assert!((g.quality() - 0.9).abs() < 1e-6);
        assert_eq!(g.skip_ratio(), FrameSkipRatio::NONE);

        for _ in 0..10 {
            g.check_performance(&sample(80.0, 10.0), 50);
        }
        assert!((g.quality() - 0.3).abs() < 1e-6);
        assert_eq!(g.skip_ratio().get(), 4);

        g.check_performance(&sample(10.0, 10.0), 50);
        assert_eq!(g.skip_ratio().get(), 3);
    }

    #[test]
    fn memory_pressure_shrinks_trail_with_floor() {
        let (mut g, _) = governor(loaded());
        let check = g.check_performance(&sample(5.0, 90.0), 50);
        assert_eq!(check.trail_length, 40);
        assert_eq!(check.decision, GovernorDecision::Degrade);

        let check = g.check_performance(&sample(5.0, 90.0), 11);
        assert_eq!(check.trail_length, 10);

        let check = g.check_performance(&sample(5.0, 75.0), 50);
        assert_eq!(check.trail_length, 50);
    }

    #[test]
    fn auto_cpu_limit_off_ignores_load() {
        let (mut g, _) = governor(GovernorModes {
            auto_cpu_limit: false,
            ..loaded()
        });
        let check = g.check_performance(&sample(99.0, 99.0), 50);
        assert_eq!(check.decision, GovernorDecision::Hold);
        assert_eq!(check.trail_length, 50);
        assert_eq!(g.quality(), 1.0);
        assert_eq!(g.skip_ratio(), FrameSkipRatio::NONE);
    }

    #[test]
    fn no_telemetry_holds() {
        let (mut g, _) = governor(loaded());
        feed(&mut g, Duration::from_millis(500), 60);
        let check = g.check_performance(&TelemetrySample::default(), 50);
        assert_eq!(check.decision, GovernorDecision::Hold);
        assert_eq!(g.quality(), 1.0);
        assert!(!g.telemetry().telemetry_available);
        assert_eq!(g.check_emergency(None), None);
        assert_eq!(g.tick_interval(), FRAME);
    }

    #[test]
    fn emergency_engages_and_releases_once() {
        let (mut g, _) = governor(GovernorModes::default());
        assert_eq!(g.check_emergency(Some(50.0)), None);
        assert_eq!(g.check_emergency(Some(95.0)), Some(ThrottleChange::Engaged));
        assert_eq!(g.tick_interval(), Duration::from_millis(1000));
        assert_eq!(g.check_emergency(Some(99.0)), None);
        assert_eq!(g.check_emergency(Some(90.0)), Some(ThrottleChange::Released));
        assert_eq!(g.tick_interval(), FRAME);
        assert_eq!(g.check_emergency(Some(10.0)), None);
    }

    #[test]
    fn throttle_masks_reconfigured_interval() {
        let (mut g, _) = governor(GovernorModes::default());
        g.check_emergency(Some(95.0));
        g.reconfigure(GovernorModes::default(), Duration::from_millis(4));
        assert_eq!(g.tick_interval(), Duration::from_millis(1000));
        g.check_emergency(Some(20.0));
        assert_eq!(g.tick_interval(), Duration::from_millis(4));
    }

    #[test]
    fn power_saving_skips_odd_frames_and_caps() {
        let (mut g, now) = governor(GovernorModes {
            power_saving: true,
            ..loaded()
        });
        assert_eq!(g.prepare_frame(1, now), FrameAction::Skip);
        assert_eq!(g.quality(), 1.0);
        assert_eq!(g.prepare_frame(2, now), FrameAction::Run);
        assert!((g.quality() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn energy_cap_after_settle() {
        let (mut g, now) = governor(GovernorModes::default());
        assert_eq!(g.prepare_frame(0, now + Duration::from_secs(10)), FrameAction::Run);
        assert_eq!(g.quality(), 1.0);
        g.prepare_frame(1, now + Duration::from_secs(31));
        assert!((g.quality() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn skip_ratio_gates_frames() {
        let ratio = FrameSkipRatio::new(3);
        assert!(!ratio.skips(0));
        assert!(ratio.skips(1));
        assert!(ratio.skips(2));
        assert!(!ratio.skips(3));
        assert!(!FrameSkipRatio::NONE.skips(7));
        assert_eq!(FrameSkipRatio::new(0), FrameSkipRatio::NONE);
    }

    #[test]
    fn reset_restores_full_quality() {
        let (mut g, now) = governor(loaded());
        g.check_performance(&sample(95.0, 95.0), 50);
        g.check_emergency(Some(95.0));
        g.reset(now);
        let t = g.telemetry();
        assert_eq!(t.quality, 1.0);
        assert!(!t.throttled);
        assert_eq!(t.skip_ratio, FrameSkipRatio::NONE);
        assert_eq!(t.checks_run, 0);
    }

    #[test]
    fn decision_names() {
        assert_eq!(GovernorDecision::Hold.as_str(), "hold");
        assert_eq!(GovernorDecision::Degrade.as_str(), "degrade");
        assert_eq!(GovernorDecision::Upgrade.as_str(), "upgrade");
    }
}
