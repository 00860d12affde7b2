#![forbid(unsafe_code)]

//! Core: configuration snapshot, system telemetry, input-activity detection,
//! and the idle lifecycle state machine.
//!
//! Nothing in this crate draws. The render and fx crates consume the
//! [`config::Config`] snapshot; the runtime drives [`lifecycle::LifecycleMachine`]
//! and [`activity::ActivitySignal`] from its timers.

pub mod activity;
pub mod config;
pub mod lifecycle;
pub mod logging;
pub mod rng;
pub mod telemetry;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, error, info, info_span, trace, warn};
