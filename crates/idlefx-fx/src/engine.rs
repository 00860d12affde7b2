#![forbid(unsafe_code)]

//! The animation engine interface shared by every effect.
//!
//! Invariants:
//! - `advance` completes before `render` is called for the same tick.
//! - Engines tolerate a zero-sized area: `advance` reports
//!   [`EngineError::EmptyArea`] and `render` draws nothing.
//! - Quality changes *how much* work a tick does (trail depth, update
//!   frequency), never *which* entities animate.

use std::fmt;
use std::time::Duration;

use idlefx_core::config::{Config, EffectKind};
use idlefx_core::rng::FxRng;
use idlefx_render::{Rgba, Surface};

use crate::curve::CurveSimulation;
use crate::rain::RainSimulation;

/// Failure inside one engine tick.
///
/// The host skips the tick and logs; nothing here is fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The engine has no area to animate (zero width or height).
    EmptyArea { width: u16, height: u16 },
    /// The tick delta was negative, NaN, or infinite.
    InvalidDelta(f32),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyArea { width, height } => {
                write!(f, "engine area is empty ({width}x{height})")
            }
            Self::InvalidDelta(dt) => write!(f, "invalid tick delta: {dt}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Per-tick inputs supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FxContext {
    /// Seconds since the previous tick.
    pub dt: f32,
    /// Seconds since the effect started.
    pub elapsed: f64,
    /// Tick counter, starting at 0.
    pub frame: u64,
    /// Governor quality in `[0, 1]`.
    pub quality: f32,
}

impl FxContext {
    /// Context for the first tick at full quality.
    pub const fn first(dt: f32) -> Self {
        Self {
            dt,
            elapsed: 0.0,
            frame: 0,
            quality: 1.0,
        }
    }

    /// Context for the next tick, `dt` seconds later.
    #[must_use]
    pub fn next(self, dt: f32, quality: f32) -> Self {
        Self {
            dt,
            elapsed: self.elapsed + f64::from(dt),
            frame: self.frame + 1,
            quality,
        }
    }

    pub(crate) fn checked_dt(&self) -> EngineResult<f32> {
        if self.dt.is_finite() && self.dt >= 0.0 {
            Ok(self.dt)
        } else {
            Err(EngineError::InvalidDelta(self.dt))
        }
    }
}

/// Stats readout colors and how long each one is shown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsPalette {
    pub colors: &'static [Rgba],
    pub period: Duration,
}

/// An animated effect.
pub trait AnimationEngine {
    /// Human-readable name (used for logs).
    fn name(&self) -> &'static str;

    /// Adopt a new area in cells. Entity counts derived from the area are
    /// recomputed; entity state is re-seeded.
    fn resize(&mut self, width: u16, height: u16);

    /// Evolve the simulation by one tick.
    fn advance(&mut self, ctx: &FxContext) -> EngineResult<()>;

    /// Draw the current state.
    fn render(&self, ctx: &FxContext, surface: &mut dyn Surface);

    /// Re-seed every entity as if freshly started.
    fn reset(&mut self);

    /// Configured trail length the governor may shrink.
    fn trail_length(&self) -> usize;

    /// Replace the trail length (governor memory pressure).
    fn set_trail_length(&mut self, length: usize);

    /// Colors for the stats readout.
    fn stats_palette(&self) -> StatsPalette;
}

/// Build the engine for `kind` from a configuration snapshot.
pub fn build_engine(
    kind: EffectKind,
    config: &Config,
    width: u16,
    height: u16,
    rng: FxRng,
) -> Box<dyn AnimationEngine> {
    match kind {
        EffectKind::Matrix => Box::new(RainSimulation::new(
            crate::rain::RainParams::from_config(config),
            width,
            height,
            rng,
        )),
        EffectKind::Mystify => Box::new(CurveSimulation::new(
            crate::curve::CurveParams::from_config(config),
            width,
            height,
            rng,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idlefx_core::rng::RngSeed;
    use idlefx_render::Canvas;

    #[test]
    fn context_advances() {
        let ctx = FxContext::first(0.1).next(0.25, 0.5);
        assert_eq!(ctx.frame, 1);
        assert!((ctx.elapsed - 0.25).abs() < 1e-9);
        assert_eq!(ctx.quality, 0.5);
    }

    #[test]
    fn invalid_delta_rejected() {
        assert!(FxContext::first(f32::NAN).checked_dt().is_err());
        assert_eq!(
            FxContext::first(-1.0).checked_dt(),
            Err(EngineError::InvalidDelta(-1.0))
        );
    }

    #[test]
    fn builds_both_effects() {
        let config = Config::default();
        for kind in [EffectKind::Matrix, EffectKind::Mystify] {
            let mut engine = build_engine(kind, &config, 40, 12, RngSeed::Fixed(3).into_rng());
            assert_eq!(engine.name(), kind.as_str());
            let ctx = FxContext::first(0.1);
            engine.advance(&ctx).unwrap();
            let mut canvas = Canvas::new(40, 12);
            engine.render(&ctx, &mut canvas);
        }
    }

    #[test]
    fn empty_area_is_an_error_not_a_panic() {
        let config = Config::default();
        for kind in [EffectKind::Matrix, EffectKind::Mystify] {
            let mut engine = build_engine(kind, &config, 0, 0, RngSeed::Fixed(3).into_rng());
            assert_eq!(
                engine.advance(&FxContext::first(0.1)),
                Err(EngineError::EmptyArea {
                    width: 0,
                    height: 0
                })
            );
            let mut canvas = Canvas::new(0, 0);
            engine.render(&FxContext::first(0.1), &mut canvas);
        }
    }

    #[test]
    fn error_display() {
        let e = EngineError::EmptyArea {
            width: 0,
            height: 3,
        };
        assert_eq!(e.to_string(), "engine area is empty (0x3)");
    }
}
