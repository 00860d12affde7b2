#![forbid(unsafe_code)]

//! A single terminal cell: one glyph, a foreground color, and style flags.

use crate::color::Rgba;

bitflags::bitflags! {
    /// Cell style flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StyleFlags: u8 {
        /// Bold / increased intensity.
        const BOLD = 0b0000_0001;
        /// Dim / decreased intensity.
        const DIM  = 0b0000_0010;
    }
}

/// One composed terminal cell.
///
/// The background is always the screen background, so only the foreground
/// is stored. An empty cell holds a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    /// Displayed character.
    pub ch: char,
    /// Opaque foreground color.
    pub fg: Rgba,
    /// Style flags.
    pub flags: StyleFlags,
}

impl Cell {
    /// The blank cell.
    pub const EMPTY: Self = Self {
        ch: ' ',
        fg: Rgba::WHITE,
        flags: StyleFlags::empty(),
    };

    /// Cell with a character and color, no flags.
    #[inline]
    pub const fn new(ch: char, fg: Rgba) -> Self {
        Self {
            ch,
            fg,
            flags: StyleFlags::empty(),
        }
    }

    /// Same cell with `flags` set.
    #[inline]
    #[must_use]
    pub const fn with_flags(mut self, flags: StyleFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Whether nothing visible is drawn.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ch == ' '
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::EMPTY
    }
}
