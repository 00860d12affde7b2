#![forbid(unsafe_code)]

//! Composed frame: a row-major grid of [`Cell`]s ready for presentation.

use crate::cell::Cell;

/// A fixed-size grid of composed cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Frame {
    /// Blank frame of `width` x `height` cells.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::EMPTY; width as usize * height as usize],
        }
    }

    /// Width in cells.
    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in cells.
    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Change dimensions, blanking every cell.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells
            .resize(width as usize * height as usize, Cell::EMPTY);
    }

    /// Blank every cell.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::EMPTY);
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    /// Cell at `(x, y)`, or `None` out of bounds.
    #[inline]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    /// Overwrite the cell at `(x, y)`. Out of bounds is ignored.
    #[inline]
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = cell;
        }
    }

    /// One row of cells.
    pub fn row(&self, y: u16) -> &[Cell] {
        if y >= self.height {
            return &[];
        }
        let start = y as usize * self.width as usize;
        &self.cells[start..start + self.width as usize]
    }

    /// Characters of one row as a string, trailing blanks trimmed.
    pub fn row_text(&self, y: u16) -> String {
        let text: String = self.row(y).iter().map(|c| c.ch).collect();
        text.trim_end().to_string()
    }

    /// Number of non-blank cells.
    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;

    #[test]
    fn set_get_and_bounds() {
        let mut f = Frame::new(4, 2);
        f.set(3, 1, Cell::new('z', Rgba::WHITE));
        f.set(4, 1, Cell::new('!', Rgba::WHITE));
        assert_eq!(f.get(3, 1).map(|c| c.ch), Some('z'));
        assert_eq!(f.get(4, 1), None);
        assert_eq!(f.filled(), 1);
        assert_eq!(f.row_text(1), "   z");
        assert!(f.row(5).is_empty());
    }

    #[test]
    fn resize_blanks() {
        let mut f = Frame::new(2, 2);
        f.set(0, 0, Cell::new('a', Rgba::WHITE));
        f.resize(3, 1);
        assert_eq!((f.width(), f.height()), (3, 1));
        assert_eq!(f.filled(), 0);
    }
}
