#![forbid(unsafe_code)]

//! Physical-input activity detection from kernel interrupt counters.
//!
//! [`ActivitySignal`] reads a line-oriented interrupt table (on Linux,
//! `/proc/interrupts`), keeps only lines whose label names an input device or
//! a USB host controller, and sums their per-CPU counters. A poll reports
//! activity when the total grew by more than the configured threshold since
//! the previous poll.
//!
//! # Invariants
//!
//! 1. The first successful read after construction or [`ActivitySignal::restart`]
//!    only records the baseline and reports no activity.
//! 2. Every successful read replaces the baseline with the new total, whether
//!    or not activity was reported. One burst of interrupts triggers once.
//! 3. During the startup grace period the baseline is still refreshed but
//!    nothing is ever reported.
//!
//! # Failure Modes
//!
//! | Condition                  | Behavior                                       |
//! |----------------------------|------------------------------------------------|
//! | Source cannot be read      | Poll reports no activity; logged once per 5 s  |
//! | Counter goes backwards     | Treated as zero delta; baseline resets to it   |
//! | No matching lines          | Total is 0; never reports activity             |

use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::logging::LogThrottle;

/// Labels that mark a line as input hardware. Matched case-insensitively.
pub const INPUT_KEYWORDS: &[&str] = &[
    "usb", "ehci", "ohci", "xhci", "hid", "input", "mouse", "keyboard", "touch", "i8042",
];

/// Default startup grace period.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Minimum spacing between repeated read-failure log lines.
pub const ERROR_LOG_INTERVAL: Duration = Duration::from_secs(5);

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// The interrupt table could not be read.
#[derive(Debug)]
pub enum ActivityError {
    /// Reading the backing file failed.
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The source has nothing to offer (e.g. a scripted source ran dry).
    Unavailable(String),
}

impl fmt::Display for ActivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityError::Io { path, source } => {
                write!(f, "cannot read {}: {source}", path.display())
            }
            ActivityError::Unavailable(msg) => write!(f, "activity source unavailable: {msg}"),
        }
    }
}

impl std::error::Error for ActivityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ActivityError::Io { source, .. } => Some(source),
            ActivityError::Unavailable(_) => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sources
// ─────────────────────────────────────────────────────────────────────────────

/// A readable per-device interrupt counter table, refreshed on each read.
pub trait InterruptSource {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Read the whole table.
    fn read_table(&mut self) -> Result<String, ActivityError>;
}

/// The kernel's `/proc/interrupts` (or any file with the same layout).
#[derive(Debug, Clone)]
pub struct ProcInterrupts {
    path: PathBuf,
}

impl ProcInterrupts {
    /// Standard Linux location.
    pub const DEFAULT_PATH: &'static str = "/proc/interrupts";

    /// Read from an explicit path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Default for ProcInterrupts {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PATH)
    }
}

impl InterruptSource for ProcInterrupts {
    fn name(&self) -> &str {
        "proc-interrupts"
    }

    fn read_table(&mut self) -> Result<String, ActivityError> {
        std::fs::read_to_string(&self.path).map_err(|source| ActivityError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// In-memory table, for tests and platforms without an interrupt file.
///
/// Holds the current table; [`StaticInterrupts::set`] replaces it and
/// [`StaticInterrupts::fail_next`] queues read failures.
#[derive(Debug, Clone, Default)]
pub struct StaticInterrupts {
    table: String,
    failures: VecDeque<String>,
}

impl StaticInterrupts {
    /// Source that always returns `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            failures: VecDeque::new(),
        }
    }

    /// Source whose table contains one input line with the given total.
    pub fn with_total(total: u64) -> Self {
        Self::new(input_line(total))
    }

    /// Replace the table.
    pub fn set(&mut self, table: impl Into<String>) {
        self.table = table.into();
    }

    /// Replace the table with one input line carrying `total`.
    pub fn set_total(&mut self, total: u64) {
        self.table = input_line(total);
    }

    /// Make the next read fail with `reason`.
    pub fn fail_next(&mut self, reason: impl Into<String>) {
        self.failures.push_back(reason.into());
    }
}

fn input_line(total: u64) -> String {
    format!("           CPU0\n 33:  {total}  IR-PCI-MSI 327680-edge  xhci_hcd\n")
}

impl InterruptSource for StaticInterrupts {
    fn name(&self) -> &str {
        "static"
    }

    fn read_table(&mut self) -> Result<String, ActivityError> {
        match self.failures.pop_front() {
            Some(reason) => Err(ActivityError::Unavailable(reason)),
            None => Ok(self.table.clone()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Counting
// ─────────────────────────────────────────────────────────────────────────────

/// Sum the counters of every input-class line in an interrupt table.
///
/// A line counts when its lowercase text contains any of `keywords`. Its
/// columns after the first (the IRQ identifier) are added while they parse as
/// unsigned integers; the first non-numeric column ends the line, since the
/// chip and device labels follow the per-CPU counts.
pub fn count_input_interrupts(table: &str, keywords: &[&str]) -> u64 {
    table
        .lines()
        .filter(|line| {
            let lower = line.to_ascii_lowercase();
            keywords.iter().any(|k| lower.contains(k))
        })
        .map(|line| {
            line.split_whitespace()
                .skip(1)
                .map_while(|col| {
                    if col.bytes().all(|b| b.is_ascii_digit()) {
                        col.parse::<u64>().ok()
                    } else {
                        None
                    }
                })
                .fold(0u64, u64::saturating_add)
        })
        .fold(0u64, u64::saturating_add)
}

// ─────────────────────────────────────────────────────────────────────────────
// Signal
// ─────────────────────────────────────────────────────────────────────────────

/// How large an interrupt delta must be to count as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Any positive delta.
    #[default]
    Permissive,
    /// Delta must exceed the threshold.
    Strict(u64),
}

impl Strictness {
    /// Delta that must be exceeded.
    #[inline]
    pub fn threshold(self) -> u64 {
        match self {
            Self::Permissive => 0,
            Self::Strict(t) => t,
        }
    }

    /// Whether `delta` counts as activity.
    #[inline]
    pub fn is_activity(self, delta: u64) -> bool {
        delta > self.threshold()
    }
}

/// Result of one poll, for callers that want more than a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// First successful read; the baseline was recorded.
    Baseline { total: u64 },
    /// Inside the grace period; the baseline was refreshed.
    Grace { total: u64 },
    /// Delta at or below the threshold.
    Quiet { delta: u64 },
    /// Delta above the threshold.
    Detected { delta: u64 },
    /// The source could not be read.
    Unavailable,
}

impl PollOutcome {
    /// Whether this outcome reports activity.
    #[inline]
    pub fn is_detected(self) -> bool {
        matches!(self, Self::Detected { .. })
    }

    /// JSONL-compatible string representation.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Baseline { .. } => "baseline",
            Self::Grace { .. } => "grace",
            Self::Quiet { .. } => "quiet",
            Self::Detected { .. } => "detected",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Activity detector configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityConfig {
    /// Detection policy.
    pub strictness: Strictness,
    /// Time after (re)start during which nothing is reported.
    pub grace_period: Duration,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            strictness: Strictness::Permissive,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

/// Baseline-diff detector over an [`InterruptSource`].
#[derive(Debug)]
pub struct ActivitySignal<S: InterruptSource = ProcInterrupts> {
    source: S,
    config: ActivityConfig,
    baseline: Option<u64>,
    started_at: Option<Instant>,
    error_log: LogThrottle,
}

impl<S: InterruptSource> ActivitySignal<S> {
    /// Create a detector. The grace period starts at the first poll unless
    /// [`ActivitySignal::restart`] is called with an explicit time.
    pub fn new(source: S, config: ActivityConfig) -> Self {
        Self {
            source,
            config,
            baseline: None,
            started_at: None,
            error_log: LogThrottle::new(ERROR_LOG_INTERVAL),
        }
    }

    /// Forget the baseline and start a new grace period at `now`.
    pub fn restart(&mut self, now: Instant) {
        self.baseline = None;
        self.started_at = Some(now);
    }

    /// Change the detection policy. The baseline is kept.
    pub fn set_strictness(&mut self, strictness: Strictness) {
        self.config.strictness = strictness;
    }

    /// Current configuration.
    #[inline]
    pub fn config(&self) -> &ActivityConfig {
        &self.config
    }

    /// Last recorded total, if any.
    #[inline]
    pub fn baseline(&self) -> Option<u64> {
        self.baseline
    }

    /// Mutable access to the source (tests use it to script counters).
    #[inline]
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Poll once; `true` when physical input occurred since the last poll.
    pub fn poll(&mut self, now: Instant) -> bool {
        self.poll_outcome(now).is_detected()
    }

    /// Poll once and report what happened.
    pub fn poll_outcome(&mut self, now: Instant) -> PollOutcome {
        let started = *self.started_at.get_or_insert(now);

        let table = match self.source.read_table() {
            Ok(table) => table,
            Err(e) => {
                if self.error_log.allow(now) {
                    let suppressed = self.error_log.take_suppressed();
                    crate::warn!(source = self.source.name(), error = %e, suppressed, "activity source unreadable, assuming no activity");
                }
                return PollOutcome::Unavailable;
            }
        };

        let total = count_input_interrupts(&table, INPUT_KEYWORDS);
        let previous = self.baseline.replace(total);

        if now.saturating_duration_since(started) < self.config.grace_period {
            crate::trace!(total, "activity poll inside grace period");
            return PollOutcome::Grace { total };
        }

        let Some(previous) = previous else {
            crate::debug!(total, source = self.source.name(), "activity baseline established");
            return PollOutcome::Baseline { total };
        };

        let delta = total.saturating_sub(previous);
        if self.config.strictness.is_activity(delta) {
            crate::info!(
                delta,
                threshold = self.config.strictness.threshold(),
                "input activity detected"
            );
            PollOutcome::Detected { delta }
        } else {
            PollOutcome::Quiet { delta }
        }
    }
}
