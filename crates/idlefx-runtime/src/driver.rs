#![forbid(unsafe_code)]

//! The event loop: wait for input or the next timer, tick, present.

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use idlefx_core::activity::InterruptSource;
use idlefx_render::Presenter;

use crate::session::{InputEvent, Session};
use crate::terminal::TerminalGuard;

/// Upper bound on one wait, so the shutdown flag is noticed promptly.
pub const MAX_WAIT: Duration = Duration::from_millis(250);

/// What the loop did, for the exit log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Frames written to the terminal.
    pub presented: u64,
    /// Cells written over the whole run.
    pub cells: u64,
    /// Loop ended by a termination signal.
    pub signalled: bool,
}

/// Drive `session` on the real terminal until it finishes or a termination
/// signal arrives. The session is shut down before returning.
///
/// # Errors
///
/// Returns terminal I/O errors. The session still receives its shutdown.
pub fn run<S: InterruptSource>(
    session: &mut Session<S>,
    terminal: &TerminalGuard,
) -> io::Result<RunSummary> {
    let mut presenter: Presenter<Stdout> = Presenter::new(io::stdout());
    let result = drive(session, terminal, &mut presenter);
    session.shutdown(Instant::now());
    let _ = presenter.blank();
    result
}

fn drive<S: InterruptSource>(
    session: &mut Session<S>,
    terminal: &TerminalGuard,
    presenter: &mut Presenter<Stdout>,
) -> io::Result<RunSummary> {
    let mut summary = RunSummary::default();
    let (width, height) = terminal.size()?;
    session.resize(width, height);

    while !session.is_finished() {
        if terminal.shutdown_requested() {
            summary.signalled = true;
            break;
        }

        let now = Instant::now();
        let wait = session
            .time_until_next(now)
            .map_or(MAX_WAIT, |d| d.min(MAX_WAIT));
        if let Some(input) = terminal.next_input(wait)? {
            if matches!(input, InputEvent::Resize { .. }) {
                presenter.invalidate();
            }
            session.handle_input(input, Instant::now());
        }

        if session.tick(Instant::now()) {
            let stats = presenter.present(session.frame())?;
            summary.presented += 1;
            summary.cells += stats.cells as u64;
        }
    }

    idlefx_core::info!(
        presented = summary.presented,
        cells = summary.cells,
        signalled = summary.signalled,
        "event loop finished"
    );
    Ok(summary)
}
