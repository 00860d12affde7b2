#![forbid(unsafe_code)]

//! Effects: the animation engines and what they draw on top of themselves.
//!
//! Both engines implement [`AnimationEngine`]. The host calls
//! [`AnimationEngine::advance`] then [`AnimationEngine::render`] once per
//! tick, passing the governor's quality in the [`FxContext`].

pub mod curve;
pub mod drift;
pub mod engine;
pub mod rain;
pub mod stats;
pub mod trail;

pub use curve::{CurveParams, CurveSimulation};
pub use drift::DriftOverlay;
pub use engine::{
    AnimationEngine, EngineError, EngineResult, FxContext, StatsPalette, build_engine,
};
pub use rain::{RainParams, RainSimulation};
pub use stats::StatsReadout;
pub use trail::{Trail, drawn_entries, effective_cap};
