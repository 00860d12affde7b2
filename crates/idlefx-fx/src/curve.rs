#![forbid(unsafe_code)]

//! Bouncing closed curves with fading trails.
//!
//! Each [`Shape`] is a loop of control points joined by cubic segments whose
//! handles come from the neighbouring points scaled by the shape's tension,
//! giving a smooth Catmull-Rom-like outline. Points drift with constant
//! velocity and reflect off the screen edges; past outlines are kept in a
//! [`Trail`] and redrawn with fading color and stroke width.
//!
//! Coordinates are in Braille dots (2 × 4 per cell).
//!
//! # Quality
//!
//! | quality   | trail append     | hue update      | motion scale   |
//! |-----------|------------------|-----------------|----------------|
//! | `> 0.7`   | every tick       | every tick      | `quality`      |
//! | `<= 0.7`  | every other tick | every 3rd tick  | `max(q, 0.5)`  |
//!
//! Trail capacity follows [`effective_cap`]. Every shape updates on every
//! tick regardless of quality.

use rand::Rng;

use idlefx_core::config::{Config, CurveColorMode};
use idlefx_core::rng::FxRng;
use idlefx_render::{Rgba, Surface};

use crate::engine::{AnimationEngine, EngineError, EngineResult, FxContext, StatsPalette};
use crate::trail::{Trail, drawn_entries, effective_cap};

/// Dots per second per unit of configured speed.
pub const DOTS_PER_SECOND_PER_SPEED: f32 = 6.0;

/// Interpolated points per cubic segment.
pub const SEGMENT_STEPS: usize = 8;

/// Fraction of each dimension kept clear when spawning points.
const SPAWN_MARGIN: f32 = 0.1;

/// Handle length relative to tension.
const HANDLE_SCALE: f32 = 0.25;

const TENSION_MIN: f32 = 0.2;
const TENSION_MAX: f32 = 1.0;
const TENSION_WALK: f32 = 0.01;

const DUO_PRIMARY: Rgba = Rgba::rgb(120, 200, 255);
const DUO_SECONDARY: Rgba = Rgba::rgb(255, 120, 200);

static STATS_COLORS: [Rgba; 6] = [
    Rgba::rgb(0, 255, 0),
    Rgba::rgb(0, 255, 255),
    Rgba::rgb(255, 255, 0),
    Rgba::rgb(255, 128, 0),
    Rgba::rgb(255, 0, 255),
    Rgba::rgb(128, 255, 128),
];

/// A 2D point or vector in dot space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    fn lerp_cubic(p0: Self, p1: Self, p2: Self, p3: Self, t: f32) -> Self {
        let u = 1.0 - t;
        let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
        Self::new(
            a * p0.x + b * p1.x + c * p2.x + d * p3.x,
            a * p0.y + b * p1.y + c * p2.y + d * p3.y,
        )
    }
}

/// Curve parameters derived from a configuration snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveParams {
    /// Number of shapes.
    pub shapes: usize,
    /// Configured complexity; control points are `max(3, complexity / 2)`.
    pub complexity: usize,
    /// Configured trail length before quality scaling.
    pub trail_length: usize,
    /// Movement speed (1..=10).
    pub speed: f32,
    /// Stroke color policy.
    pub color_mode: CurveColorMode,
    /// Fill the newest outline.
    pub fill: bool,
    /// Hue for [`CurveColorMode::Single`].
    pub hue: f32,
}

impl Default for CurveParams {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl CurveParams {
    /// Derive parameters from a configuration snapshot.
    pub fn from_config(config: &Config) -> Self {
        Self {
            shapes: config.mystify_shapes as usize,
            complexity: config.mystify_complexity as usize,
            trail_length: config.mystify_trail_length as usize,
            speed: config.mystify_speed as f32,
            color_mode: config.mystify_color_mode,
            fill: config.mystify_fill,
            hue: config.mystify_color_hue as f32,
        }
    }

    /// Control points per shape.
    #[inline]
    pub fn control_points(&self) -> usize {
        (self.complexity / 2).max(3)
    }
}

/// One animated closed curve.
#[derive(Debug, Clone)]
pub struct Shape {
    /// Control points, in loop order.
    pub points: Vec<Point>,
    /// Velocity of each control point in dots per second.
    pub velocities: Vec<Point>,
    /// Current hue in degrees, `[0, 360)`.
    pub hue: f32,
    /// Hue added per update.
    pub hue_drift: f32,
    /// Handle scale, `[0.2, 1.0]`.
    pub tension: f32,
    /// Past outlines, oldest first.
    pub trail: Trail<Vec<Point>>,
}

impl Shape {
    fn spawn(params: &CurveParams, width: f32, height: f32, rng: &mut FxRng) -> Self {
        let n = params.control_points();
        let v = params.speed * DOTS_PER_SECOND_PER_SPEED;
        let (mx, my) = (width * SPAWN_MARGIN, height * SPAWN_MARGIN);
        let mut points = Vec::with_capacity(n);
        let mut velocities = Vec::with_capacity(n);
        for _ in 0..n {
            points.push(Point::new(
                rng.random_range(mx..=(width - mx).max(mx)),
                rng.random_range(my..=(height - my).max(my)),
            ));
            velocities.push(Point::new(rng.random_range(-v..=v), rng.random_range(-v..=v)));
        }
        Self {
            points,
            velocities,
            hue: rng.random_range(0.0..360.0),
            hue_drift: rng.random_range(0.5..=2.0),
            tension: rng.random_range(0.3..=0.8),
            trail: Trail::new(),
        }
    }

    /// The current outline as a closed polyline.
    pub fn outline(&self) -> Vec<Point> {
        closed_curve(&self.points, self.tension, SEGMENT_STEPS)
    }
}

/// Closed smooth curve through `points` as a polyline.
///
/// Each segment `p[i] -> p[i+1]` is a cubic with handles
/// `p[i] + (p[i+1] - p[i-1]) * t/4` and `p[i+1] - (p[i+2] - p[i]) * t/4`.
/// Fewer than 3 points fall back to a straight-edged polygon. The first
/// point is repeated at the end.
pub fn closed_curve(points: &[Point], tension: f32, steps: usize) -> Vec<Point> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }
    if n < 3 {
        let mut out = points.to_vec();
        out.push(points[0]);
        return out;
    }

    let steps = steps.max(1);
    let k = tension * HANDLE_SCALE;
    let mut out = Vec::with_capacity(n * steps + 1);
    for i in 0..n {
        let prev = points[(i + n - 1) % n];
        let cur = points[i];
        let next = points[(i + 1) % n];
        let next_next = points[(i + 2) % n];
        let h1 = Point::new(cur.x + (next.x - prev.x) * k, cur.y + (next.y - prev.y) * k);
        let h2 = Point::new(
            next.x - (next_next.x - cur.x) * k,
            next.y - (next_next.y - cur.y) * k,
        );
        for s in 0..steps {
            out.push(Point::lerp_cubic(cur, h1, h2, next, s as f32 / steps as f32));
        }
    }
    out.push(points[0]);
    out
}

/// The curve engine.
#[derive(Debug, Clone)]
pub struct CurveSimulation {
    params: CurveParams,
    shapes: Vec<Shape>,
    width: u16,
    height: u16,
    rng: FxRng,
}

impl CurveSimulation {
    /// Engine for a `width` x `height` cell area.
    pub fn new(params: CurveParams, width: u16, height: u16, rng: FxRng) -> Self {
        let mut sim = Self {
            params,
            shapes: Vec::new(),
            width,
            height,
            rng,
        };
        sim.seed_shapes();
        sim
    }

    /// Current parameters.
    pub fn params(&self) -> &CurveParams {
        &self.params
    }

    /// The shapes.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    fn dot_bounds(&self) -> (f32, f32) {
        (f32::from(self.width) * 2.0, f32::from(self.height) * 4.0)
    }

    fn seed_shapes(&mut self) {
        let (w, h) = self.dot_bounds();
        self.shapes.clear();
        for _ in 0..self.params.shapes {
            let shape = Shape::spawn(&self.params, w, h, &mut self.rng);
            self.shapes.push(shape);
        }
    }

    fn stroke_color(&self, shape: &Shape) -> Rgba {
        match self.params.color_mode {
            CurveColorMode::Rainbow => Rgba::from_hsv(shape.hue, 1.0, 1.0),
            CurveColorMode::Single => Rgba::from_hsv(self.params.hue, 1.0, 1.0),
            CurveColorMode::Duo => {
                if shape.hue.rem_euclid(60.0) < 30.0 {
                    DUO_PRIMARY
                } else {
                    DUO_SECONDARY
                }
            }
        }
    }
}

impl AnimationEngine for CurveSimulation {
    fn name(&self) -> &'static str {
        "mystify"
    }

    fn resize(&mut self, width: u16, height: u16) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.seed_shapes();
    }

    fn advance(&mut self, ctx: &FxContext) -> EngineResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(EngineError::EmptyArea {
                width: self.width,
                height: self.height,
            });
        }
        let dt = ctx.checked_dt()?;
        let q = ctx.quality.clamp(0.0, 1.0);
        let high = q > 0.7;
        let append = high || ctx.frame % 2 == 0;
        let update_hue = high || ctx.frame % 3 == 0;
        let cap = effective_cap(self.params.trail_length, q);
        let step = dt * q.max(0.5);
        let (w, h) = self.dot_bounds();

        for shape in &mut self.shapes {
            if append {
                let outline = shape.outline();
                shape.trail.push(outline, cap);
            } else {
                shape.trail.truncate(cap);
            }

            for (p, v) in shape.points.iter_mut().zip(shape.velocities.iter_mut()) {
                p.x += v.x * step;
                p.y += v.y * step;
                if p.x <= 0.0 || p.x >= w {
                    v.x = -v.x;
                    p.x = p.x.clamp(0.0, w);
                }
                if p.y <= 0.0 || p.y >= h {
                    v.y = -v.y;
                    p.y = p.y.clamp(0.0, h);
                }
            }

            shape.tension = (shape.tension + self.rng.random_range(-TENSION_WALK..=TENSION_WALK))
                .clamp(TENSION_MIN, TENSION_MAX);

            if update_hue {
                shape.hue = (shape.hue + shape.hue_drift).rem_euclid(360.0);
            }
        }
        Ok(())
    }

    fn render(&self, ctx: &FxContext, surface: &mut dyn Surface) {
        for shape in &self.shapes {
            let n = drawn_entries(shape.trail.len(), ctx.quality);
            if n == 0 {
                continue;
            }
            let base = self.stroke_color(shape);

            for (j, outline) in shape.trail.newest_n(n).enumerate() {
                let fade = (j + 1) as f32 / n as f32;
                let alpha = (255.0 * fade).clamp(50.0, 255.0) as u8;
                let color = base.with_alpha(alpha);
                let width = ((3.0 * fade) as i32).max(1);
                for pair in outline.windows(2) {
                    surface.thick_line(
                        pair[0].x.round() as i32,
                        pair[0].y.round() as i32,
                        pair[1].x.round() as i32,
                        pair[1].y.round() as i32,
                        width,
                        color,
                    );
                }
            }

            if self.params.fill
                && let Some(newest) = shape.trail.newest()
            {
                let polygon: Vec<(f32, f32)> = newest.iter().map(|p| (p.x, p.y)).collect();
                surface.fill_polygon(&polygon, base.with_opacity(0.2));
            }
        }
    }

    fn reset(&mut self) {
        self.seed_shapes();
    }

    fn trail_length(&self) -> usize {
        self.params.trail_length
    }

    fn set_trail_length(&mut self, length: usize) {
        self.params.trail_length = length;
    }

    fn stats_palette(&self) -> StatsPalette {
        StatsPalette {
            colors: &STATS_COLORS,
            period: std::time::Duration::from_secs(3),
        }
    }
}
