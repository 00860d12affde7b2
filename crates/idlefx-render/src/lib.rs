#![forbid(unsafe_code)]

//! Render: everything between an engine's draw calls and the terminal.
//!
//! Engines draw onto a [`Surface`] (implemented by [`Canvas`]); the canvas
//! is composed into a [`Frame`] of opaque [`Cell`]s, and the [`Presenter`]
//! writes the cells that changed since the previous frame.

pub mod canvas;
pub mod cell;
pub mod color;
pub mod diff;
pub mod frame;
pub mod presenter;
pub mod surface;

pub use canvas::Canvas;
pub use cell::{Cell, StyleFlags};
pub use color::Rgba;
pub use frame::Frame;
pub use presenter::{PresentStats, Presenter};
pub use surface::Surface;
