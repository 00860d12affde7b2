#![forbid(unsafe_code)]

//! Log subscriber setup.
//!
//! The screen belongs to the effect, so records only ever go to a file.
//! `IDLEFX_LOG` takes an env-filter directive (default `info`).

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Filter directive variable.
pub const FILTER_ENV: &str = "IDLEFX_LOG";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber writing to `path`.
pub fn init(path: &Path, json: bool) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    let writer = Mutex::new(file);

    let installed = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter())
            .with_writer(writer)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_env_filter(filter())
            .with_writer(writer)
            .try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("cannot install log subscriber: {e}"))
}
