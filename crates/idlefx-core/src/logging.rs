#![forbid(unsafe_code)]

//! Logging facade.
//!
//! With the `tracing` feature the usual tracing macros are re-exported here and
//! at the crate root, so every idlefx crate logs through `idlefx_core::info!`
//! and friends. Without it the same macro names expand to nothing and the
//! span helpers hand back inert guards.

#[cfg(feature = "tracing")]
pub use tracing::{debug, debug_span, error, info, info_span, trace, warn};

#[cfg(not(feature = "tracing"))]
mod noop_macros {
    /// Expands to nothing when tracing is disabled.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    /// Expands to an inert span when tracing is disabled.
    #[macro_export]
    macro_rules! debug_span {
        ($($arg:tt)*) => {
            $crate::logging::NoopSpan
        };
    }

    /// Expands to nothing when tracing is disabled.
    #[macro_export]
    macro_rules! error {
        ($($arg:tt)*) => {};
    }

    /// Expands to nothing when tracing is disabled.
    #[macro_export]
    macro_rules! info {
        ($($arg:tt)*) => {};
    }

    /// Expands to an inert span when tracing is disabled.
    #[macro_export]
    macro_rules! info_span {
        ($($arg:tt)*) => {
            $crate::logging::NoopSpan
        };
    }

    /// Expands to nothing when tracing is disabled.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    /// Expands to nothing when tracing is disabled.
    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => {};
    }
}

/// Span stand-in used when tracing is compiled out.
#[cfg(not(feature = "tracing"))]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    /// Enter the span. Does nothing.
    pub fn enter(&self) -> NoopGuard {
        NoopGuard
    }
}

/// Guard returned by [`NoopSpan::enter`].
#[cfg(not(feature = "tracing"))]
pub struct NoopGuard;

/// Rate limiter for repetitive log lines.
///
/// Returns `true` from [`LogThrottle::allow`] at most once per interval, so a
/// failure that repeats on every poll is reported once and then stays quiet
/// until the interval has passed.
#[derive(Debug, Clone)]
pub struct LogThrottle {
    interval: std::time::Duration,
    last: Option<std::time::Instant>,
    suppressed: u64,
}

impl LogThrottle {
    /// Create a throttle that lets one message through per `interval`.
    pub fn new(interval: std::time::Duration) -> Self {
        Self {
            interval,
            last: None,
            suppressed: 0,
        }
    }

    /// Whether a message may be emitted at `now`.
    pub fn allow(&mut self, now: std::time::Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                self.suppressed += 1;
                false
            }
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// Messages swallowed since the last one allowed through, then reset.
    pub fn take_suppressed(&mut self) -> u64 {
        std::mem::take(&mut self.suppressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn throttle_allows_first_then_waits() {
        let mut t = LogThrottle::new(Duration::from_secs(5));
        let start = Instant::now();
        assert!(t.allow(start));
        assert!(!t.allow(start + Duration::from_secs(1)));
        assert!(!t.allow(start + Duration::from_secs(4)));
        assert!(t.allow(start + Duration::from_secs(5)));
    }

    #[test]
    fn throttle_counts_suppressed() {
        let mut t = LogThrottle::new(Duration::from_secs(5));
        let start = Instant::now();
        t.allow(start);
        t.allow(start);
        t.allow(start);
        assert_eq!(t.take_suppressed(), 2);
        assert_eq!(t.take_suppressed(), 0);
    }
}
