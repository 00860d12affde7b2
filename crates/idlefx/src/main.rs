#![forbid(unsafe_code)]

//! idlefx: idle-triggered terminal screensaver.

mod cli;
mod logging;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use idlefx_core::activity::{ActivityConfig, ActivitySignal, ProcInterrupts};
use idlefx_core::config::{Config, ConfigStore, EffectKind};
use idlefx_core::rng::RngSeed;
use idlefx_core::telemetry;
use idlefx_runtime::{Session, SessionOptions, TerminalGuard, TerminalOptions, is_remote_session};

use crate::cli::{Cli, Command, ConfigAction};

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(path) = &cli.log_file {
        logging::init(path, cli.log_json)?;
    }
    let store = cli
        .config
        .as_ref()
        .map_or_else(ConfigStore::default_location, ConfigStore::new);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_effects(&store, cli.seed, None),
        Command::Test { effect } => {
            let effect = effect.map(EffectKind::from);
            run_effects(&store, cli.seed, Some(effect.unwrap_or(store.load().effect)))
        }
        Command::Config { action } => config_command(&store, action),
    }
}

fn config_command(store: &ConfigStore, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let text = store.load().to_json().context("cannot serialize settings")?;
            println!("{text}");
        }
        ConfigAction::Path => println!("{}", store.path().display()),
        ConfigAction::Reset => {
            store
                .save(&Config::default())
                .with_context(|| format!("cannot write {}", store.path().display()))?;
            println!("reset {}", store.path().display());
        }
    }
    Ok(())
}

/// Monitor for idle time, or preview `preview` and exit when it ends.
fn run_effects(store: &ConfigStore, seed: Option<u64>, preview: Option<EffectKind>) -> Result<()> {
    let config = Arc::new(store.load());
    let remote = is_remote_session();
    tracing::info!(
        path = %store.path().display(),
        effect = config.effect.as_str(),
        lock_timeout = config.lock_timeout,
        remote,
        "idlefx starting"
    );

    let activity = ActivitySignal::new(
        ProcInterrupts::default(),
        ActivityConfig {
            strictness: config.strictness(),
            ..ActivityConfig::default()
        },
    );
    let options = SessionOptions {
        seed: seed.map_or(RngSeed::Entropy, RngSeed::Fixed),
        remote,
        preview_only: preview.is_some(),
        store: Some(store.clone()),
        ..SessionOptions::default()
    };

    let terminal =
        TerminalGuard::new(&TerminalOptions::default()).context("cannot prepare terminal")?;
    let size = terminal.size().context("cannot read terminal size")?;
    let now = Instant::now();
    let mut session = Session::new(
        config,
        activity,
        telemetry::default_source(),
        size,
        options,
        now,
    );
    match preview {
        Some(effect) => {
            session.start_test(effect, now);
        }
        None => session.enable(now),
    }

    let summary = idlefx_runtime::run(&mut session, &terminal);
    drop(terminal);
    let summary = summary.context("terminal I/O failed")?;
    tracing::info!(
        frames = session.counters().frames,
        presented = summary.presented,
        signalled = summary.signalled,
        "idlefx stopped"
    );
    Ok(())
}
