#![forbid(unsafe_code)]

//! Digital rain: columns of glyphs falling at independent speeds.
//!
//! Positions are in terminal rows. Each column moves on its own update
//! interval (100-250 ms), accumulating tick time in between, so columns
//! step at slightly different rhythms like the film effect.
//!
//! # Quality
//!
//! Quality lowers the number of trailing glyphs drawn and the glyph
//! resample probability. Every column keeps animating at every level.
//!
//! # No Per-Frame Allocations
//!
//! Glyph sets and fade colors are built once; column buffers are reused by
//! [`Column::reset`].

use rand::Rng;

use idlefx_core::config::Config;
use idlefx_core::rng::FxRng;
use idlefx_render::{Rgba, StyleFlags, Surface};

use crate::engine::{AnimationEngine, EngineError, EngineResult, FxContext, StatsPalette};
use crate::trail::effective_cap;

/// Phonetic script glyphs plus digits and capitals.
pub const KATAKANA_GLYPHS: &str =
    "ｱｲｳｴｵｶｷｸｹｺｻｼｽｾｿﾀﾁﾂﾃﾄﾅﾆﾇﾈﾉﾊﾋﾌﾍﾎﾏﾐﾑﾒﾓﾔﾕﾖﾗﾘﾙﾚﾛﾜｦﾝ0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Plain alphanumerics and symbols.
pub const PLAIN_GLYPHS: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Rows per second at speed 1.0 and speed factor 1.0.
pub const ROWS_PER_SECOND: f32 = 8.0;

/// Glyphs farther than this outside the screen are not drawn.
pub const DRAW_MARGIN: f32 = 3.0;

/// A column resets once its head is this far below the screen.
pub const RESET_MARGIN: f32 = 12.0;

/// Trailing glyphs drawn behind the head at full quality.
pub const DRAW_CAP: usize = 10;

/// Minimum number of columns.
pub const MIN_COLUMNS: usize = 20;

const FADE_STEPS: usize = 20;

static STATS_COLORS: [Rgba; 8] = [
    Rgba::rgb(255, 255, 255),
    Rgba::rgb(220, 220, 220),
    Rgba::rgb(200, 255, 200),
    Rgba::rgb(255, 220, 200),
    Rgba::rgb(200, 220, 255),
    Rgba::rgb(255, 200, 255),
    Rgba::rgb(255, 255, 200),
    Rgba::rgb(200, 255, 255),
];

/// Rain parameters derived from a configuration snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RainParams {
    /// Multiplier on every column speed (`speed / 25`).
    pub speed_factor: f32,
    /// Trail color when not in rainbow mode.
    pub color: Rgba,
    /// Hue cycles with time and column position.
    pub rainbow: bool,
    /// Draw glyphs bold.
    pub bold: bool,
    /// Use the katakana glyph set.
    pub katakana: bool,
    /// Column speed range (inclusive).
    pub speed_range: (f32, f32),
    /// Column length range (inclusive).
    pub length_range: (usize, usize),
    /// Column update interval range in seconds (inclusive).
    pub interval_range: (f32, f32),
    /// Per-glyph resample probability on each column step.
    pub change_probability: f32,
}

impl Default for RainParams {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RainParams {
    /// Derive parameters from a configuration snapshot.
    pub fn from_config(config: &Config) -> Self {
        Self {
            speed_factor: config.speed as f32 / 25.0,
            color: Rgba::from_tuple(config.color.rgb()),
            rainbow: config.rainbow,
            bold: config.bold,
            katakana: config.use_katakana,
            speed_range: (0.3, 1.5),
            length_range: (3, 15),
            interval_range: (0.100, 0.250),
            change_probability: 0.02,
        }
    }

    fn glyph_set(&self) -> &'static str {
        if self.katakana {
            KATAKANA_GLYPHS
        } else {
            PLAIN_GLYPHS
        }
    }
}

/// One falling column.
///
/// `chars`, `positions` and `ages` are parallel, head first, and always
/// `length` long.
#[derive(Debug, Clone)]
pub struct Column {
    /// Cell column.
    pub x: u16,
    /// Head row; negative while still above the screen.
    pub head: f32,
    /// Base speed before the speed factor.
    pub speed: f32,
    /// Number of glyphs.
    pub length: usize,
    /// Glyphs, head first.
    pub chars: Vec<char>,
    /// Row of each glyph.
    pub positions: Vec<f32>,
    /// Steps each glyph has been alive.
    pub ages: Vec<u32>,
    interval: f32,
    pending: f32,
}

impl Column {
    fn new(x: u16, params: &RainParams, glyphs: &[char], rng: &mut FxRng) -> Self {
        let mut column = Self {
            x,
            head: 0.0,
            speed: 0.0,
            length: 0,
            chars: Vec::new(),
            positions: Vec::new(),
            ages: Vec::new(),
            interval: params.interval_range.0,
            pending: 0.0,
        };
        column.reset(params, glyphs, rng);
        column
    }

    /// Re-seed above the screen with fresh speed, length and glyphs.
    pub fn reset(&mut self, params: &RainParams, glyphs: &[char], rng: &mut FxRng) {
        let (lo, hi) = params.speed_range;
        let (min_len, max_len) = params.length_range;
        let (min_iv, max_iv) = params.interval_range;

        self.head = -rng.random_range(1.0..=5.0_f32);
        self.speed = rng.random_range(lo..=hi);
        self.length = rng.random_range(min_len..=max_len.max(min_len));
        self.interval = rng.random_range(min_iv..=max_iv);
        self.pending = 0.0;

        self.chars.clear();
        self.positions.clear();
        self.ages.clear();
        for i in 0..self.length {
            self.chars.push(pick(glyphs, rng));
            self.positions.push(self.head - i as f32);
            self.ages.push(i as u32);
        }
    }

    /// Move the head and every glyph down by `rows`.
    fn offset(&mut self, rows: f32) {
        self.head += rows;
        for pos in &mut self.positions {
            *pos += rows;
        }
    }

    /// One update step: move, then age every glyph.
    fn step(&mut self, rows: f32) {
        self.offset(rows);
        for age in &mut self.ages {
            *age = age.saturating_add(1);
        }
    }
}

fn pick(glyphs: &[char], rng: &mut FxRng) -> char {
    if glyphs.is_empty() {
        return ' ';
    }
    glyphs[rng.random_range(0..glyphs.len())]
}

/// Number of columns for a screen `width` cells wide.
#[inline]
pub fn column_count(width: u16) -> usize {
    if width == 0 {
        return 0;
    }
    (width as usize / 2).max(MIN_COLUMNS)
}

/// The digital rain engine.
#[derive(Debug, Clone)]
pub struct RainSimulation {
    params: RainParams,
    glyphs: Vec<char>,
    fade: [Rgba; FADE_STEPS],
    columns: Vec<Column>,
    width: u16,
    height: u16,
    trail_length: usize,
    rng: FxRng,
}

impl RainSimulation {
    /// Engine for a `width` x `height` cell area.
    pub fn new(params: RainParams, width: u16, height: u16, rng: FxRng) -> Self {
        let glyphs = params.glyph_set().chars().collect();
        let fade = fade_table(params.color);
        let mut sim = Self {
            params,
            glyphs,
            fade,
            columns: Vec::new(),
            width,
            height,
            trail_length: DRAW_CAP,
            rng,
        };
        sim.seed_columns();
        sim
    }

    /// Current parameters.
    pub fn params(&self) -> &RainParams {
        &self.params
    }

    /// The columns, left to right.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn seed_columns(&mut self) {
        let count = column_count(self.width);
        self.columns.clear();
        for i in 0..count {
            let x = (i * self.width as usize / count.max(1)) as u16;
            let mut column = Column::new(x, &self.params, &self.glyphs, &mut self.rng);
            // Stagger so the screen does not fill in one sweep.
            let stagger = self.rng.random_range(0.0..=f32::from(self.height));
            column.offset(-stagger);
            self.columns.push(column);
        }
    }

    /// Trailing glyphs drawn behind the head at `quality`.
    pub fn drawn_trail(&self, quality: f32) -> usize {
        effective_cap(self.trail_length, quality)
    }

    fn glyph_color(&self, column: &Column, index: usize, elapsed: f64) -> Rgba {
        if self.params.rainbow {
            let base = (elapsed * 100.0 + f64::from(column.x)).rem_euclid(360.0) as f32;
            let hue = base + 30.0 * index as f32;
            let value = 255usize.saturating_sub(25 * index).max(30) as f32 / 255.0;
            return Rgba::from_hsv(hue, 1.0, value);
        }
        if index == 0 {
            Rgba::WHITE
        } else {
            self.fade[index.min(FADE_STEPS - 1)]
        }
    }
}

fn fade_table(color: Rgba) -> [Rgba; FADE_STEPS] {
    std::array::from_fn(|i| color.with_alpha(255usize.saturating_sub(12 * i).max(50) as u8))
}

impl AnimationEngine for RainSimulation {
    fn name(&self) -> &'static str {
        "matrix"
    }

    fn resize(&mut self, width: u16, height: u16) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.seed_columns();
    }

    fn advance(&mut self, ctx: &FxContext) -> EngineResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(EngineError::EmptyArea {
                width: self.width,
                height: self.height,
            });
        }
        let dt = ctx.checked_dt()?;
        let bottom = f32::from(self.height) + RESET_MARGIN;
        let change_p =
            f64::from(self.params.change_probability * ctx.quality.clamp(0.5, 1.0)).clamp(0.0, 1.0);

        for column in &mut self.columns {
            column.pending += dt;
            if column.pending < column.interval {
                continue;
            }
            let rows = column.speed * self.params.speed_factor * column.pending * ROWS_PER_SECOND;
            column.pending = 0.0;
            column.step(rows);

            for ch in &mut column.chars {
                if self.rng.random_bool(change_p) {
                    *ch = pick(&self.glyphs, &mut self.rng);
                }
            }

            if column.head > bottom {
                column.reset(&self.params, &self.glyphs, &mut self.rng);
            }
        }
        Ok(())
    }

    fn render(&self, ctx: &FxContext, surface: &mut dyn Surface) {
        let top = -DRAW_MARGIN;
        let bottom = f32::from(self.height) + DRAW_MARGIN;
        let drawn = self.drawn_trail(ctx.quality) + 1;
        let flags = if self.params.bold {
            StyleFlags::BOLD
        } else {
            StyleFlags::empty()
        };

        for column in &self.columns {
            for (i, (&ch, &pos)) in column
                .chars
                .iter()
                .zip(&column.positions)
                .enumerate()
                .take(drawn)
            {
                if pos < top || pos > bottom {
                    continue;
                }
                let color = self.glyph_color(column, i, ctx.elapsed);
                surface.put_glyph(i32::from(column.x), pos.floor() as i32, ch, color, flags);
            }
        }
    }

    fn reset(&mut self) {
        self.seed_columns();
    }

    fn trail_length(&self) -> usize {
        self.trail_length
    }

    fn set_trail_length(&mut self, length: usize) {
        self.trail_length = length;
    }

    fn stats_palette(&self) -> StatsPalette {
        StatsPalette {
            colors: &STATS_COLORS,
            period: std::time::Duration::from_secs(5),
        }
    }
}
