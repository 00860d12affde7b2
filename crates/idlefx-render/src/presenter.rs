#![forbid(unsafe_code)]

//! Presenter: state-tracked terminal output through crossterm.
//!
//! Keeps the last presented [`Frame`] and writes only the cells that changed,
//! grouped into runs so each run costs a single cursor move. Style is tracked
//! so repeated colors do not re-emit SGR sequences. All output for a frame is
//! buffered and flushed once, wrapped in a synchronized update.

use std::io::{self, BufWriter, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{BeginSynchronizedUpdate, Clear, ClearType, EndSynchronizedUpdate};
use crossterm::queue;

use crate::cell::{Cell, StyleFlags};
use crate::color::Rgba;
use crate::diff::FrameDiff;
use crate::frame::Frame;

/// Size of the internal write buffer (64KB).
const BUFFER_CAPACITY: usize = 64 * 1024;

/// What one `present` call wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PresentStats {
    /// Cells written.
    pub cells: usize,
    /// Cursor moves issued.
    pub runs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellStyle {
    fg: Rgba,
    flags: StyleFlags,
}

/// Diffing frame presenter.
pub struct Presenter<W: Write> {
    writer: BufWriter<W>,
    previous: Frame,
    current_style: Option<CellStyle>,
    cursor: Option<(u16, u16)>,
    sync_output: bool,
}

impl<W: Write> Presenter<W> {
    /// Presenter over `writer`. The first frame is a full repaint.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(BUFFER_CAPACITY, writer),
            previous: Frame::new(0, 0),
            current_style: None,
            cursor: None,
            sync_output: true,
        }
    }

    /// Disable synchronized-update wrapping.
    #[must_use]
    pub fn without_sync(mut self) -> Self {
        self.sync_output = false;
        self
    }

    /// Write the cells of `frame` that differ from the last presented one.
    pub fn present(&mut self, frame: &Frame) -> io::Result<PresentStats> {
        let diff = FrameDiff::compute(&self.previous, frame);
        if diff.is_empty() {
            return Ok(PresentStats::default());
        }

        if self.sync_output {
            queue!(self.writer, BeginSynchronizedUpdate)?;
        }

        let runs = diff.runs();
        for run in &runs {
            self.move_cursor_to(run.x0, run.y)?;
            for &cell in &frame.row(run.y)[run.x0 as usize..=run.x1 as usize] {
                self.emit_cell(cell)?;
            }
        }

        queue!(self.writer, SetAttribute(Attribute::Reset), ResetColor)?;
        self.current_style = None;

        if self.sync_output {
            queue!(self.writer, EndSynchronizedUpdate)?;
        }
        self.writer.flush()?;

        self.previous.clone_from(frame);
        Ok(PresentStats {
            cells: diff.len(),
            runs: runs.len(),
        })
    }

    fn emit_cell(&mut self, cell: Cell) -> io::Result<()> {
        let style = CellStyle {
            fg: cell.fg,
            flags: cell.flags,
        };
        if self.current_style != Some(style) {
            queue!(self.writer, SetAttribute(Attribute::Reset))?;
            queue!(
                self.writer,
                SetForegroundColor(Color::Rgb {
                    r: style.fg.r(),
                    g: style.fg.g(),
                    b: style.fg.b(),
                })
            )?;
            if style.flags.contains(StyleFlags::BOLD) {
                queue!(self.writer, SetAttribute(Attribute::Bold))?;
            }
            if style.flags.contains(StyleFlags::DIM) {
                queue!(self.writer, SetAttribute(Attribute::Dim))?;
            }
            self.current_style = Some(style);
        }

        queue!(self.writer, Print(cell.ch))?;
        if let Some((x, y)) = self.cursor {
            self.cursor = Some((x.saturating_add(1), y));
        }
        Ok(())
    }

    fn move_cursor_to(&mut self, x: u16, y: u16) -> io::Result<()> {
        if self.cursor == Some((x, y)) {
            return Ok(());
        }
        queue!(self.writer, MoveTo(x, y))?;
        self.cursor = Some((x, y));
        Ok(())
    }

    /// Clear the screen and forget what was on it.
    pub fn blank(&mut self) -> io::Result<()> {
        queue!(self.writer, ResetColor, Clear(ClearType::All), MoveTo(0, 0))?;
        self.cursor = Some((0, 0));
        self.current_style = None;
        let (w, h) = (self.previous.width(), self.previous.height());
        self.previous.resize(w, h);
        self.writer.flush()
    }

    /// Force the next `present` to repaint every cell.
    ///
    /// Call after a resize or when the terminal state is unknown.
    pub fn invalidate(&mut self) {
        self.previous.resize(0, 0);
        self.current_style = None;
        self.cursor = None;
    }

    /// Hide the cursor.
    pub fn hide_cursor(&mut self) -> io::Result<()> {
        queue!(self.writer, Hide)?;
        self.writer.flush()
    }

    /// Show the cursor.
    pub fn show_cursor(&mut self) -> io::Result<()> {
        queue!(self.writer, Show)?;
        self.writer.flush()
    }

    /// Get the inner writer, flushing buffered output first.
    pub fn into_inner(self) -> io::Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| io::Error::other(e.to_string()))
    }
}
