#![forbid(unsafe_code)]

//! The drawing surface engines render onto.
//!
//! A surface has two coordinate spaces:
//!
//! | Space | Unit                | Used for                       |
//! |-------|---------------------|--------------------------------|
//! | cells | one terminal cell   | glyphs and text                |
//! | dots  | 2 × 4 per cell      | lines and filled polygons      |
//!
//! Implementors provide the two primitive setters; lines, text runs, and
//! polygon fills are built on top of them.

use crate::cell::StyleFlags;
use crate::color::Rgba;

/// Sub-cell dot columns per terminal cell.
pub const DOTS_PER_CELL_X: i32 = 2;
/// Sub-cell dot rows per terminal cell.
pub const DOTS_PER_CELL_Y: i32 = 4;

/// Something an animation can draw on.
pub trait Surface {
    /// Size in cells.
    fn cell_size(&self) -> (u16, u16);

    /// Size in dots.
    fn dot_size(&self) -> (i32, i32) {
        let (w, h) = self.cell_size();
        (w as i32 * DOTS_PER_CELL_X, h as i32 * DOTS_PER_CELL_Y)
    }

    /// Place a glyph at a cell. Out-of-bounds positions are ignored.
    fn put_glyph(&mut self, x: i32, y: i32, ch: char, color: Rgba, flags: StyleFlags);

    /// Light a dot. Out-of-bounds positions are ignored.
    fn put_dot(&mut self, x: i32, y: i32, color: Rgba);

    /// Write `text` left to right starting at a cell.
    fn put_text(&mut self, x: i32, y: i32, text: &str, color: Rgba, flags: StyleFlags) {
        for (i, ch) in text.chars().enumerate() {
            self.put_glyph(x + i as i32, y, ch, color, flags);
        }
    }

    /// Bresenham line in dot space.
    fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgba) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx: i32 = if x0 < x1 { 1 } else { -1 };
        let sy: i32 = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut cx, mut cy) = (x0, y0);

        loop {
            self.put_dot(cx, cy, color);
            if cx == x1 && cy == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                if cx == x1 {
                    break;
                }
                err += dy;
                cx += sx;
            }
            if e2 <= dx {
                if cy == y1 {
                    break;
                }
                err += dx;
                cy += sy;
            }
        }
    }

    /// Line of the given dot `width`, drawn as parallel offsets.
    fn thick_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, width: i32, color: Rgba) {
        let width = width.max(1);
        let horizontal = (y1 - y0).abs() < (x1 - x0).abs();
        for offset in 0..width {
            let o = offset - (width - 1) / 2;
            if horizontal {
                self.line(x0, y0 + o, x1, y1 + o, color);
            } else {
                self.line(x0 + o, y0, x1 + o, y1, color);
            }
        }
    }

    /// Even-odd scanline fill of a closed polygon in dot space.
    fn fill_polygon(&mut self, points: &[(f32, f32)], color: Rgba) {
        if points.len() < 3 {
            return;
        }
        let (_, dot_h) = self.dot_size();
        let min_y = points.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let max_y = points.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
        let y_start = (min_y.floor() as i32).max(0);
        let y_end = (max_y.ceil() as i32).min(dot_h - 1);

        let mut crossings: Vec<f32> = Vec::with_capacity(points.len());
        for y in y_start..=y_end {
            let sample = y as f32 + 0.5;
            crossings.clear();
            for (i, &(ax, ay)) in points.iter().enumerate() {
                let (bx, by) = points[(i + 1) % points.len()];
                if (ay <= sample && by > sample) || (by <= sample && ay > sample) {
                    crossings.push(ax + (sample - ay) / (by - ay) * (bx - ax));
                }
            }
            crossings.sort_by(f32::total_cmp);
            for pair in crossings.chunks_exact(2) {
                let from = pair[0].round() as i32;
                let to = pair[1].round() as i32;
                for x in from..to {
                    self.put_dot(x, y, color);
                }
            }
        }
    }
}
