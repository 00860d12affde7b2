#![forbid(unsafe_code)]

//! Immutable configuration snapshot and its JSON store.
//!
//! A [`Config`] is a plain value: once built it is never mutated. Callers that
//! want different settings build a new snapshot and hand it over (the
//! lifecycle and the engines hold an `Arc<Config>` and swap it between ticks).
//!
//! # Loading
//!
//! Stored settings are merged over [`Config::default`] one key at a time.
//! A key with the wrong JSON type keeps its default, a numeric key outside its
//! range is clamped into it, and unknown keys are ignored. Loading never fails:
//! a missing or unparsable file yields the defaults.
//!
//! | key                    | default      | range / values                    |
//! |------------------------|--------------|-----------------------------------|
//! | `enabled`              | `true`       |                                   |
//! | `effect`               | `"matrix"`   | `matrix`, `mystify`               |
//! | `color`                | `"green"`    | green red blue cyan magenta yellow white |
//! | `speed`                | `25`         | 0..=50                            |
//! | `bold` (`bold_text`)   | `true`       |                                   |
//! | `rainbow` (`rainbow_mode`) | `false`  |                                   |
//! | `target_fps`           | `15`         | 0..=240, 0 = unlimited            |
//! | `lock_timeout`         | `300`        | seconds, >= 1                     |
//! | `mystify_shapes`       | `3`          | 1..=8                             |
//! | `mystify_complexity`   | `6`          | 3..=12                            |
//! | `mystify_trail_length` | `50`         | 10..=200                          |
//! | `mystify_speed`        | `2`          | 1..=10                            |
//!
//! See the field docs for the rest.
//!
//! # Storage
//!
//! [`ConfigStore`] writes through a temp file and an atomic rename, so a crash
//! mid-save leaves the previous file intact.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::activity::Strictness;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors from reading or writing the settings file.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error during file operations.
    Io(std::io::Error),
    /// The file is not valid JSON, or the snapshot could not be encoded.
    Serialization(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error: {e}"),
            ConfigError::Serialization(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Serialization(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

// ─────────────────────────────────────────────────────────────────────────────
// Enumerated settings
// ─────────────────────────────────────────────────────────────────────────────

/// Error returned when a settings string names no known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value {:?}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// Which animation runs when the idle timeout fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    /// Falling-glyph digital rain.
    #[default]
    Matrix,
    /// Bouncing closed curves with fading trails.
    Mystify,
}

impl EffectKind {
    /// Stable settings name.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Matrix => "matrix",
            Self::Mystify => "mystify",
        }
    }
}

impl FromStr for EffectKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "matrix" | "rain" => Ok(Self::Matrix),
            "mystify" | "curves" => Ok(Self::Mystify),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base color of the rain glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RainColor {
    #[default]
    Green,
    Red,
    Blue,
    Cyan,
    Magenta,
    Yellow,
    White,
}

impl RainColor {
    /// Opaque RGB triple for this color.
    #[inline]
    pub const fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Green => (0, 255, 0),
            Self::Red => (255, 0, 0),
            Self::Blue => (0, 0, 255),
            Self::Cyan => (0, 255, 255),
            Self::Magenta => (255, 0, 255),
            Self::Yellow => (255, 255, 0),
            Self::White => (255, 255, 255),
        }
    }

    /// Stable settings name.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Cyan => "cyan",
            Self::Magenta => "magenta",
            Self::Yellow => "yellow",
            Self::White => "white",
        }
    }
}

impl FromStr for RainColor {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "green" => Ok(Self::Green),
            "red" => Ok(Self::Red),
            "blue" => Ok(Self::Blue),
            "cyan" => Ok(Self::Cyan),
            "magenta" | "purple" => Ok(Self::Magenta),
            "yellow" => Ok(Self::Yellow),
            "white" => Ok(Self::White),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// How curve shapes pick their stroke color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveColorMode {
    /// Each shape uses its own drifting hue.
    #[default]
    Rainbow,
    /// Every shape uses one configured hue.
    Single,
    /// Shapes alternate between two fixed colors based on their hue.
    Duo,
}

impl CurveColorMode {
    /// Stable settings name.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rainbow => "rainbow",
            Self::Single => "single",
            Self::Duo => "duo",
        }
    }
}

impl FromStr for CurveColorMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rainbow" => Ok(Self::Rainbow),
            "single" => Ok(Self::Single),
            "duo" => Ok(Self::Duo),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Which activity-detection policy to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrictnessKind {
    /// Any increase in the input interrupt count is activity.
    #[default]
    Permissive,
    /// The increase must exceed `activity_threshold`.
    Strict,
}

impl FromStr for StrictnessKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" | "any" => Ok(Self::Permissive),
            "strict" | "threshold" => Ok(Self::Strict),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

/// Immutable settings snapshot.
///
/// Field names are the persisted key names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Master switch for idle activation.
    pub enabled: bool,
    /// Effect started by the idle timeout.
    pub effect: EffectKind,
    /// Rain glyph color.
    pub color: RainColor,
    /// Rain speed setting, 25 is nominal.
    pub speed: u32,
    /// Draw rain glyphs bold.
    #[serde(alias = "bold_text")]
    pub bold: bool,
    /// Rain hue cycles with time and column position.
    #[serde(alias = "rainbow_mode")]
    pub rainbow: bool,
    /// Use the half-width katakana glyph set instead of plain ASCII.
    pub use_katakana: bool,
    /// Glyph size hint for front-ends that own the font. Terminals ignore it.
    pub font_size: u32,
    /// Animation frame rate, 0 = as fast as possible.
    pub target_fps: u32,
    /// Let CPU and memory load lower the rendering quality.
    pub auto_cpu_limit: bool,
    /// Draw the FPS / CPU / memory readout.
    pub show_stats: bool,
    /// Move the readout around the screen edges.
    pub stats_drift: bool,
    /// Seconds of inactivity before the effect starts.
    pub lock_timeout: u64,
    /// Seconds of inactivity before the effect blanks the screen.
    pub display_timeout: u64,
    /// In a remote (SSH) login never start the effect on idle.
    /// Previews still run.
    pub physical_only: bool,
    /// Activity-detection policy.
    pub activity_strictness: StrictnessKind,
    /// Interrupt delta that strict detection must exceed.
    pub activity_threshold: u64,
    /// Halve the animation rate and cap quality.
    pub power_saving_mode: bool,
    /// Cap quality after the effect has run for a while.
    pub energy_efficient: bool,
    /// Number of curve shapes.
    pub mystify_shapes: u32,
    /// Curve complexity; control points are half of it, at least 3.
    pub mystify_complexity: u32,
    /// Curve trail depth before quality scaling.
    pub mystify_trail_length: u32,
    /// Control point speed.
    pub mystify_speed: u32,
    /// Curve color policy.
    pub mystify_color_mode: CurveColorMode,
    /// Fill the newest curve of each shape.
    pub mystify_fill: bool,
    /// Hue for `single` mode.
    pub mystify_color_hue: u32,
    /// Primary hue hint for `duo` mode front-ends.
    pub mystify_color_hue1: u32,
    /// Secondary hue hint for `duo` mode front-ends.
    pub mystify_color_hue2: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            effect: EffectKind::Matrix,
            color: RainColor::Green,
            speed: 25,
            bold: true,
            rainbow: false,
            use_katakana: true,
            font_size: 14,
            target_fps: 15,
            auto_cpu_limit: false,
            show_stats: false,
            stats_drift: true,
            lock_timeout: 300,
            display_timeout: 600,
            physical_only: true,
            activity_strictness: StrictnessKind::Permissive,
            activity_threshold: 50,
            power_saving_mode: false,
            energy_efficient: true,
            mystify_shapes: 3,
            mystify_complexity: 6,
            mystify_trail_length: 50,
            mystify_speed: 2,
            mystify_color_mode: CurveColorMode::Rainbow,
            mystify_fill: false,
            mystify_color_hue: 240,
            mystify_color_hue1: 240,
            mystify_color_hue2: 60,
        }
    }
}

impl Config {
    /// Idle time before activation.
    #[inline]
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout)
    }

    /// Idle time before the screen is blanked.
    #[inline]
    pub fn display_timeout(&self) -> Duration {
        Duration::from_secs(self.display_timeout)
    }

    /// Animation tick interval derived from `target_fps`.
    ///
    /// `target_fps = 0` means unlimited and maps to 1 ms.
    #[inline]
    pub fn frame_interval(&self) -> Duration {
        if self.target_fps == 0 {
            Duration::from_millis(1)
        } else {
            Duration::from_millis(u64::from(1000 / self.target_fps.max(1)).max(1))
        }
    }

    /// Activity policy with its threshold resolved.
    #[inline]
    pub fn strictness(&self) -> Strictness {
        match self.activity_strictness {
            StrictnessKind::Permissive => Strictness::Permissive,
            StrictnessKind::Strict => Strictness::Strict(self.activity_threshold),
        }
    }

    /// Parse a settings document, merging it over the defaults.
    ///
    /// Invalid JSON yields the defaults. Use [`Config::try_from_json`] to see
    /// the parse error.
    pub fn from_json(text: &str) -> Self {
        match Self::try_from_json(text) {
            Ok(config) => config,
            Err(e) => {
                crate::warn!(error = %e, "settings are not valid JSON, using defaults");
                Self::default()
            }
        }
    }

    /// Parse a settings document; fails only when the text is not a JSON object.
    pub fn try_from_json(text: &str) -> ConfigResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ConfigError::Serialization(format!("failed to parse settings: {e}")))?;
        match value {
            Value::Object(map) => Ok(Self::from_map(&map)),
            other => Err(ConfigError::Serialization(format!(
                "settings must be a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Merge a key/value map over the defaults.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let d = Self::default();
        let m = Merge { map };
        Self {
            enabled: m.bool(&["enabled"], d.enabled),
            effect: m.parse(&["effect", "effect_type"], d.effect),
            color: m.parse(&["color"], d.color),
            speed: m.uint(&["speed"], 0..=50, d.speed),
            bold: m.bool(&["bold", "bold_text"], d.bold),
            rainbow: m.bool(&["rainbow", "rainbow_mode"], d.rainbow),
            use_katakana: m.bool(&["use_katakana"], d.use_katakana),
            font_size: m.uint(&["font_size"], 6..=72, d.font_size),
            target_fps: m.uint(&["target_fps"], 0..=240, d.target_fps),
            auto_cpu_limit: m.bool(&["auto_cpu_limit"], d.auto_cpu_limit),
            show_stats: m.bool(&["show_stats"], d.show_stats),
            stats_drift: m.bool(&["stats_drift"], d.stats_drift),
            lock_timeout: m.ulong(&["lock_timeout"], 1..=86_400, d.lock_timeout),
            display_timeout: m.ulong(&["display_timeout"], 1..=86_400, d.display_timeout),
            physical_only: m.bool(&["physical_only"], d.physical_only),
            activity_strictness: m.parse(&["activity_strictness"], d.activity_strictness),
            activity_threshold: m.ulong(&["activity_threshold"], 1..=100_000, d.activity_threshold),
            power_saving_mode: m.bool(&["power_saving_mode"], d.power_saving_mode),
            energy_efficient: m.bool(&["energy_efficient"], d.energy_efficient),
            mystify_shapes: m.uint(&["mystify_shapes"], 1..=8, d.mystify_shapes),
            mystify_complexity: m.uint(&["mystify_complexity"], 3..=12, d.mystify_complexity),
            mystify_trail_length: m.uint(&["mystify_trail_length"], 10..=200, d.mystify_trail_length),
            mystify_speed: m.uint(&["mystify_speed"], 1..=10, d.mystify_speed),
            mystify_color_mode: m.parse(&["mystify_color_mode"], d.mystify_color_mode),
            mystify_fill: m.bool(&["mystify_fill"], d.mystify_fill),
            mystify_color_hue: m.uint(&["mystify_color_hue"], 0..=360, d.mystify_color_hue),
            mystify_color_hue1: m.uint(&["mystify_color_hue1"], 0..=360, d.mystify_color_hue1),
            mystify_color_hue2: m.uint(&["mystify_color_hue2"], 0..=360, d.mystify_color_hue2),
        }
    }

    /// Encode as pretty-printed JSON using the canonical key names.
    pub fn to_json(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialization(format!("failed to serialize settings: {e}")))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Per-key lenient reader over a settings object.
///
/// The first key in each alias list that is present wins.
struct Merge<'a> {
    map: &'a Map<String, Value>,
}

impl Merge<'_> {
    fn lookup<'a>(&'a self, keys: &[&'a str]) -> Option<(&'a str, &'a Value)> {
        keys.iter()
            .find_map(|k| self.map.get(*k).map(|v| (*k, v)))
    }

    fn bool(&self, keys: &[&str], default: bool) -> bool {
        match self.lookup(keys) {
            None => default,
            Some((_, Value::Bool(b))) => *b,
            // Older front-ends stored toggles as 0/1.
            Some((_, Value::Number(n))) if n.as_u64().is_some_and(|v| v <= 1) => {
                n.as_u64() == Some(1)
            }
            Some((key, other)) => {
                crate::warn!(key, found = json_kind(other), "expected a boolean, using default");
                default
            }
        }
    }

    fn ulong(&self, keys: &[&str], range: RangeInclusive<u64>, default: u64) -> u64 {
        let Some((key, value)) = self.lookup(keys) else {
            return default;
        };
        let raw = match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.max(0.0).round() as u64)),
            _ => None,
        };
        match raw {
            Some(v) => {
                let clamped = v.clamp(*range.start(), *range.end());
                if clamped != v {
                    crate::warn!(key, value = v, clamped, "setting out of range, clamped");
                }
                clamped
            }
            None => {
                crate::warn!(key, found = json_kind(value), "expected a number, using default");
                default
            }
        }
    }

    fn uint(&self, keys: &[&str], range: RangeInclusive<u32>, default: u32) -> u32 {
        let wide = u64::from(*range.start())..=u64::from(*range.end());
        // Clamped into a u32 range, so the narrowing cannot truncate.
        self.ulong(keys, wide, u64::from(default)) as u32
    }

    fn parse<T: FromStr>(&self, keys: &[&str], default: T) -> T {
        match self.lookup(keys) {
            None => default,
            Some((key, Value::String(s))) => s.parse().unwrap_or_else(|_| {
                crate::warn!(key, value = %s, "unrecognized setting value, using default");
                default
            }),
            Some((key, other)) => {
                crate::warn!(key, found = json_kind(other), "expected a string, using default");
                default
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// JSON settings file with atomic saves.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store at an explicit path. The file need not exist yet.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store at the default location.
    ///
    /// Uses `$XDG_CONFIG_HOME/idlefx/settings.json`, then
    /// `~/.config/idlefx/settings.json`, then `./settings.json`.
    #[must_use]
    pub fn default_location() -> Self {
        Self {
            path: config_dir_or_fallback().join("settings.json"),
        }
    }

    /// Path of the settings file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone();
        tmp.set_extension("json.tmp");
        tmp
    }

    /// Read the stored settings, surfacing I/O and parse errors.
    ///
    /// A missing file is not an error and yields the defaults.
    pub fn try_load(&self) -> ConfigResult<Config> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Config::try_from_json(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the stored settings; any failure yields the defaults.
    pub fn load(&self) -> Config {
        match self.try_load() {
            Ok(config) => {
                crate::debug!(path = %self.path.display(), "loaded settings");
                config
            }
            Err(e) => {
                crate::warn!(path = %self.path.display(), error = %e, "cannot read settings, using defaults");
                Config::default()
            }
        }
    }

    /// Write the snapshot atomically, creating parent directories.
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.temp_path();
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, config)
                .map_err(|e| ConfigError::Serialization(format!("failed to serialize settings: {e}")))?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        crate::debug!(path = %self.path.display(), "saved settings");
        Ok(())
    }

    /// Modification time of the settings file, if it exists.
    pub fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }
}

fn config_dir_or_fallback() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME")
        && !config_home.is_empty()
    {
        return PathBuf::from(config_home).join("idlefx");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config").join("idlefx");
    }
    PathBuf::from(".")
}
