#![forbid(unsafe_code)]

//! Slow edge-following placement for overlays that would otherwise burn in.
//!
//! One cycle walks the four screen edges in order (top left-to-right, right
//! top-to-bottom, bottom right-to-left, left bottom-to-top), a quarter of the
//! cycle each. Positions are the top-left corner of a text block of a fixed
//! size, so the block stays inside the margin on every edge.

use std::time::Duration;

/// Default time for one full loop around the screen.
pub const DEFAULT_CYCLE: Duration = Duration::from_secs(480);

/// Default distance from the screen edge, in cells.
pub const DEFAULT_MARGIN: u16 = 1;

/// Top-left corner used when drifting is disabled.
pub const FALLBACK_POSITION: (u16, u16) = (1, 1);

/// Top-left corner of a `block` sized overlay after `elapsed` time.
///
/// Pure: depends only on its arguments. A zero `cycle` pins the block to the
/// start of the loop. Screens too small for the block collapse the path onto
/// the margin.
pub fn drift_position(
    elapsed: Duration,
    cycle: Duration,
    screen: (u16, u16),
    margin: u16,
    block: (u16, u16),
) -> (f32, f32) {
    let min = f32::from(margin);
    let max_x = (f32::from(screen.0) - f32::from(block.0) - min).max(min);
    let max_y = (f32::from(screen.1) - f32::from(block.1) - min).max(min);

    let cycle_secs = cycle.as_secs_f64();
    if cycle_secs <= 0.0 {
        return (min, min);
    }
    let phase = (elapsed.as_secs_f64() % cycle_secs) / cycle_secs * 4.0;
    let edge = phase as u32;
    let t = (phase - f64::from(edge)) as f32;
    let lerp = |a: f32, b: f32| a + (b - a) * t;

    match edge {
        0 => (lerp(min, max_x), min),
        1 => (max_x, lerp(min, max_y)),
        2 => (lerp(max_x, min), max_y),
        _ => (min, lerp(max_y, min)),
    }
}

/// Index into a palette of `len` colors that advances every `period`.
pub fn palette_index(elapsed: Duration, period: Duration, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let period = period.as_secs_f64();
    if period <= 0.0 {
        return 0;
    }
    ((elapsed.as_secs_f64() / period) as u64 % len as u64) as usize
}

/// Overlay placement policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftOverlay {
    /// Follow the edges; when false the overlay stays at [`FALLBACK_POSITION`].
    pub enabled: bool,
    pub cycle: Duration,
    pub margin: u16,
}

impl Default for DriftOverlay {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DriftOverlay {
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled,
            cycle: DEFAULT_CYCLE,
            margin: DEFAULT_MARGIN,
        }
    }

    #[must_use]
    pub const fn with_cycle(mut self, cycle: Duration) -> Self {
        self.cycle = cycle;
        self
    }

    /// Cell position of a `block` sized overlay.
    pub fn position(&self, elapsed: Duration, screen: (u16, u16), block: (u16, u16)) -> (u16, u16) {
        if !self.enabled {
            return FALLBACK_POSITION;
        }
        let (x, y) = drift_position(elapsed, self.cycle, screen, self.margin, block);
        (x.round() as u16, y.round() as u16)
    }
}
