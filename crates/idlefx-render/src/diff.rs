#![forbid(unsafe_code)]

//! Changed-cell computation between two frames.
//!
//! Row-major scan, so changes come out sorted by `(y, x)` and coalesce into
//! horizontal runs without sorting.

use crate::frame::Frame;

/// A contiguous run of changed cells on a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeRun {
    /// Row index.
    pub y: u16,
    /// Start column (inclusive).
    pub x0: u16,
    /// End column (inclusive).
    pub x1: u16,
}

impl ChangeRun {
    /// Number of cells in this run.
    #[inline]
    pub const fn len(&self) -> u16 {
        self.x1 - self.x0 + 1
    }

    /// Always false for runs produced by [`FrameDiff::runs`].
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.x1 < self.x0
    }
}

/// Positions where two frames differ.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameDiff {
    changes: Vec<(u16, u16)>,
}

impl FrameDiff {
    /// Every cell of `frame`, for a full repaint.
    pub fn full(frame: &Frame) -> Self {
        let mut changes = Vec::with_capacity(frame.width() as usize * frame.height() as usize);
        for y in 0..frame.height() {
            for x in 0..frame.width() {
                changes.push((x, y));
            }
        }
        Self { changes }
    }

    /// Cells that differ between `old` and `new`.
    ///
    /// Frames of different size yield a full repaint of `new`.
    pub fn compute(old: &Frame, new: &Frame) -> Self {
        if old.width() != new.width() || old.height() != new.height() {
            return Self::full(new);
        }

        let mut changes = Vec::with_capacity(new.width() as usize * new.height() as usize / 20);
        for y in 0..new.height() {
            for (x, (a, b)) in old.row(y).iter().zip(new.row(y)).enumerate() {
                if a != b {
                    changes.push((x as u16, y));
                }
            }
        }
        Self { changes }
    }

    /// Number of changed cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether nothing changed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Coalesce consecutive x positions on the same row into runs.
    pub fn runs(&self) -> Vec<ChangeRun> {
        let mut runs: Vec<ChangeRun> = Vec::new();
        for &(x, y) in &self.changes {
            match runs.last_mut() {
                Some(run) if run.y == y && run.x1 + 1 == x => run.x1 = x,
                _ => runs.push(ChangeRun { y, x0: x, x1: x }),
            }
        }
        runs
    }
}
