#![forbid(unsafe_code)]

//! On-screen performance readout.
//!
//! Three lines (frame rate, CPU, memory) drawn over the effect at a
//! position from [`DriftOverlay`], in a color that cycles through the
//! running engine's [`StatsPalette`].

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use idlefx_core::telemetry::TelemetrySample;
use idlefx_render::{StyleFlags, Surface};

use crate::drift::{DriftOverlay, palette_index};
use crate::engine::StatsPalette;

/// CPU readings averaged for display.
pub const CPU_WINDOW: usize = 10;

/// How often the frame rate figure is recomputed.
pub const FPS_WINDOW: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Rolling averages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct Rolling {
    values: VecDeque<f64>,
}

impl Rolling {
    fn push(&mut self, value: f64) {
        self.values.push_back(value);
        while self.values.len() > CPU_WINDOW {
            self.values.pop_front();
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }
}

/// Formats a CPU percentage; readings that round to zero show as `<1%`.
pub fn format_cpu(value: Option<f64>) -> String {
    match value {
        None => "n/a".to_owned(),
        Some(v) if v < 0.005 => "<1%".to_owned(),
        Some(v) => format!("{v:.2}%"),
    }
}

// ---------------------------------------------------------------------------
// Readout
// ---------------------------------------------------------------------------

/// Frame counter plus averaged telemetry for the stats overlay.
#[derive(Debug, Clone)]
pub struct StatsReadout {
    visible: bool,
    target_fps: u32,
    drift: DriftOverlay,
    cpu: Rolling,
    process_cpu: Rolling,
    memory_percent: Option<f64>,
    process_memory_mb: Option<f64>,
    window_start: Option<Instant>,
    window_frames: u32,
    fps: f64,
}

impl StatsReadout {
    /// Readout for a configured frame rate (`0` = unlimited).
    pub fn new(visible: bool, target_fps: u32, drift: DriftOverlay) -> Self {
        Self {
            visible,
            target_fps,
            drift,
            cpu: Rolling::default(),
            process_cpu: Rolling::default(),
            memory_percent: None,
            process_memory_mb: None,
            window_start: None,
            window_frames: 0,
            fps: 0.0,
        }
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Flip visibility; returns the new state.
    pub fn toggle(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    /// Apply new settings without losing collected samples.
    pub fn reconfigure(&mut self, target_fps: u32, drift: DriftOverlay) {
        self.target_fps = target_fps;
        self.drift = drift;
    }

    /// Count one presented frame.
    pub fn record_frame(&mut self, now: Instant) {
        let start = *self.window_start.get_or_insert(now);
        self.window_frames += 1;
        let span = now.saturating_duration_since(start);
        if span >= FPS_WINDOW {
            self.fps = f64::from(self.window_frames) / span.as_secs_f64();
            self.window_frames = 0;
            self.window_start = Some(now);
        }
    }

    /// Fold in one telemetry sample.
    pub fn record_sample(&mut self, sample: &TelemetrySample) {
        if let Some(cpu) = sample.cpu_percent {
            self.cpu.push(cpu);
        }
        if let Some(cpu) = sample.process_cpu_percent {
            self.process_cpu.push(cpu);
        }
        if sample.memory_percent.is_some() {
            self.memory_percent = sample.memory_percent;
        }
        if sample.process_memory_mb.is_some() {
            self.process_memory_mb = sample.process_memory_mb;
        }
    }

    /// Most recent frame rate.
    #[inline]
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// The readout text.
    pub fn lines(&self) -> [String; 3] {
        let target = if self.target_fps == 0 {
            "Unlimited".to_owned()
        } else {
            format!("Target {}", self.target_fps)
        };
        let memory = self
            .memory_percent
            .map_or_else(|| "n/a".to_owned(), |m| format!("{m:.0}%"));
        let process_memory = self
            .process_memory_mb
            .map_or_else(|| "n/a".to_owned(), |mb| format!("{mb:.1}MB"));
        [
            format!("FPS {:.0} ({target})", self.fps),
            format!(
                "CPU Total {} Screensaver {}",
                format_cpu(self.cpu.mean()),
                format_cpu(self.process_cpu.mean())
            ),
            format!("Memory Total {memory} Screensaver {process_memory}"),
        ]
    }

    /// Draw the readout, if visible, for an effect running `elapsed`.
    pub fn render(&self, elapsed: Duration, palette: StatsPalette, surface: &mut dyn Surface) {
        if !self.visible {
            return;
        }
        let lines = self.lines();
        let block_w = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let block = (u16::try_from(block_w).unwrap_or(u16::MAX), lines.len() as u16);
        let (x, y) = self.drift.position(elapsed, surface.cell_size(), block);
        let Some(&color) = palette
            .colors
            .get(palette_index(elapsed, palette.period, palette.colors.len()))
        else {
            return;
        };
        for (row, line) in lines.iter().enumerate() {
            surface.put_text(
                i32::from(x),
                i32::from(y) + row as i32,
                line,
                color,
                StyleFlags::BOLD,
            );
        }
    }
}
