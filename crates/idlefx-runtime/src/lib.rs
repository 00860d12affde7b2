#![forbid(unsafe_code)]

//! Runtime: everything that runs on the clock.
//!
//! [`schedule`] holds the periodic timers, [`governor`] adjusts effect
//! quality under load, [`session`] ties the lifecycle machine, activity
//! signal, telemetry and engines together behind one `tick`, and
//! [`driver`] runs that tick against a real terminal owned by
//! [`terminal::TerminalGuard`].

pub mod driver;
pub mod governor;
pub mod schedule;
pub mod session;
pub mod terminal;

pub use driver::{RunSummary, run};
pub use governor::{
    FrameAction, FrameSkipRatio, GovernorConfig, GovernorDecision, GovernorModes,
    PerformanceGovernor,
};
pub use schedule::{Every, Scheduler, TimerKind};
pub use session::{InputEvent, Session, SessionCounters, SessionOptions};
pub use terminal::{TerminalGuard, TerminalOptions, is_remote_session};
