#![forbid(unsafe_code)]

//! Two-layer drawing target: a glyph layer over a Braille dot layer.
//!
//! Engines draw into a [`Canvas`] through the [`Surface`] trait, then the
//! canvas is composed into a [`Frame`]. Glyphs win over dots in the same
//! cell; remaining dots become Braille patterns (U+2800..U+28FF) colored by
//! the brightest dot in the cell.
//!
//! Translucent colors are blended over the background (and, for dots, over
//! what the dot already held) at write time, so the frame only holds opaque
//! colors.

use crate::cell::{Cell, StyleFlags};
use crate::color::Rgba;
use crate::frame::Frame;
use crate::surface::{DOTS_PER_CELL_X, DOTS_PER_CELL_Y, Surface};

/// Braille dot numbering to bit mapping, indexed `[column][row]`.
///
/// ```text
/// dot 1 (0,0) = bit 0    dot 4 (1,0) = bit 3
/// dot 2 (0,1) = bit 1    dot 5 (1,1) = bit 4
/// dot 3 (0,2) = bit 2    dot 6 (1,2) = bit 5
/// dot 7 (0,3) = bit 6    dot 8 (1,3) = bit 7
/// ```
const DOT_BITS: [[u8; 4]; 2] = [[0, 1, 2, 6], [3, 4, 5, 7]];

const BRAILLE_BASE: u32 = 0x2800;

/// Drawing target sized in terminal cells.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u16,
    height: u16,
    background: Rgba,
    glyphs: Vec<Option<Cell>>,
    dots: Vec<Option<Rgba>>,
}

impl Canvas {
    /// Empty canvas over a black background.
    pub fn new(width: u16, height: u16) -> Self {
        let cells = width as usize * height as usize;
        Self {
            width,
            height,
            background: Rgba::BLACK,
            glyphs: vec![None; cells],
            dots: vec![None; cells * (DOTS_PER_CELL_X * DOTS_PER_CELL_Y) as usize],
        }
    }

    /// Change dimensions and clear.
    pub fn resize(&mut self, width: u16, height: u16) {
        *self = Self {
            background: self.background,
            ..Self::new(width, height)
        };
    }

    /// Remove everything drawn.
    pub fn clear(&mut self) {
        self.glyphs.fill(None);
        self.dots.fill(None);
    }

    /// Whether nothing is drawn.
    pub fn is_blank(&self) -> bool {
        self.glyphs.iter().all(Option::is_none) && self.dots.iter().all(Option::is_none)
    }

    /// Glyph at a cell, if one was placed.
    pub fn glyph(&self, x: i32, y: i32) -> Option<Cell> {
        self.cell_index(x, y).and_then(|i| self.glyphs[i])
    }

    /// Dot color, if the dot is lit.
    pub fn dot(&self, x: i32, y: i32) -> Option<Rgba> {
        self.dot_index(x, y).and_then(|i| self.dots[i])
    }

    fn cell_index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    fn dot_index(&self, x: i32, y: i32) -> Option<usize> {
        let (w, h) = self.dot_size();
        if x < 0 || y < 0 || x >= w || y >= h {
            return None;
        }
        Some(y as usize * w as usize + x as usize)
    }

    /// Braille character and color for the dots under one cell.
    fn braille_cell(&self, cx: i32, cy: i32) -> Option<(char, Rgba)> {
        let px = cx * DOTS_PER_CELL_X;
        let py = cy * DOTS_PER_CELL_Y;
        let mut bits: u8 = 0;
        let mut brightest: Option<Rgba> = None;

        for (col, rows) in DOT_BITS.iter().enumerate() {
            for (row, bit) in rows.iter().enumerate() {
                if let Some(color) = self.dot(px + col as i32, py + row as i32) {
                    bits |= 1 << bit;
                    if brightest.is_none_or(|b| color.luma() > b.luma()) {
                        brightest = Some(color);
                    }
                }
            }
        }

        let color = brightest?;
        let ch = char::from_u32(BRAILLE_BASE + bits as u32)?;
        Some((ch, color))
    }

    /// Compose both layers into `frame`, resizing it if needed.
    pub fn compose_into(&self, frame: &mut Frame) {
        if frame.width() != self.width || frame.height() != self.height {
            frame.resize(self.width, self.height);
        } else {
            frame.clear();
        }

        for cy in 0..self.height {
            for cx in 0..self.width {
                let cell = match self.glyph(cx as i32, cy as i32) {
                    Some(cell) => cell,
                    None => match self.braille_cell(cx as i32, cy as i32) {
                        Some((ch, color)) => Cell::new(ch, color),
                        None => continue,
                    },
                };
                frame.set(cx, cy, cell);
            }
        }
    }
}

impl Surface for Canvas {
    fn cell_size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn put_glyph(&mut self, x: i32, y: i32, ch: char, color: Rgba, flags: StyleFlags) {
        if let Some(i) = self.cell_index(x, y) {
            let fg = color.over(self.background);
            self.glyphs[i] = Some(Cell::new(ch, fg).with_flags(flags));
        }
    }

    fn put_dot(&mut self, x: i32, y: i32, color: Rgba) {
        if let Some(i) = self.dot_index(x, y) {
            let under = self.dots[i].unwrap_or(self.background);
            self.dots[i] = Some(color.over(under));
        }
    }
}
