#![forbid(unsafe_code)]

//! Terminal session lifecycle guard.
//!
//! [`TerminalGuard`] puts the terminal into the state a full-screen effect
//! needs (raw mode, alternate screen, mouse capture, hidden cursor) and
//! restores it on drop, including when a panic unwinds through the driver.
//! A panic hook performs the same best-effort restore for panics that never
//! reach the guard.
//!
//! Termination signals do not exit the process from the signal thread.
//! They raise a shared flag the driver checks between ticks, so the running
//! effect is stopped through the normal lifecycle path before the guard
//! restores the terminal.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[cfg(unix)]
use signal_hook::consts::signal::{SIGINT, SIGTERM};
#[cfg(unix)]
use signal_hook::iterator::Signals;

use crate::session::InputEvent;

/// Environment variables set by an SSH login.
pub const REMOTE_ENV_VARS: &[&str] = &["SSH_CONNECTION", "SSH_CLIENT", "SSH_TTY"];

/// Whether this process runs inside a remote login.
pub fn is_remote_session() -> bool {
    REMOTE_ENV_VARS
        .iter()
        .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()))
}

/// Terminal features to enable.
#[derive(Debug, Clone)]
pub struct TerminalOptions {
    /// Draw on the alternate screen.
    pub alternate_screen: bool,
    /// Report mouse movement and clicks (pointer activity ends an effect).
    pub mouse_capture: bool,
}

impl Default for TerminalOptions {
    fn default() -> Self {
        Self {
            alternate_screen: true,
            mouse_capture: true,
        }
    }
}

/// RAII owner of the terminal state.
#[derive(Debug)]
pub struct TerminalGuard {
    alternate_screen_enabled: bool,
    mouse_enabled: bool,
    shutdown: Arc<AtomicBool>,
    #[cfg(unix)]
    signal_guard: Option<SignalGuard>,
}

impl TerminalGuard {
    /// Enter raw mode and enable the requested features.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode cannot be enabled or a feature cannot be
    /// switched on. Features enabled before the failure are restored.
    pub fn new(options: &TerminalOptions) -> io::Result<Self> {
        install_panic_hook();

        let shutdown = Arc::new(AtomicBool::new(false));
        crossterm::terminal::enable_raw_mode()?;
        idlefx_core::debug!("terminal raw mode enabled");

        let mut guard = Self {
            alternate_screen_enabled: false,
            mouse_enabled: false,
            shutdown: Arc::clone(&shutdown),
            #[cfg(unix)]
            signal_guard: None,
        };
        #[cfg(unix)]
        {
            guard.signal_guard = Some(SignalGuard::new(Arc::clone(&shutdown))?);
        }

        let mut stdout = io::stdout();
        if options.alternate_screen {
            crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
            guard.alternate_screen_enabled = true;
        }
        if options.mouse_capture {
            crossterm::execute!(stdout, crossterm::event::EnableMouseCapture)?;
            guard.mouse_enabled = true;
        }
        crossterm::execute!(stdout, crossterm::cursor::Hide)?;
        idlefx_core::debug!(
            alternate_screen = guard.alternate_screen_enabled,
            mouse = guard.mouse_enabled,
            "terminal prepared"
        );
        Ok(guard)
    }

    /// Current terminal size (columns, rows).
    pub fn size(&self) -> io::Result<(u16, u16)> {
        crossterm::terminal::size()
    }

    /// Flag raised when SIGINT or SIGTERM arrives.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Whether a termination signal arrived.
    #[inline]
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Wait up to `timeout` for input and decode it.
    ///
    /// Returns `Ok(None)` on timeout or for events the runtime ignores.
    pub fn next_input(&self, timeout: Duration) -> io::Result<Option<InputEvent>> {
        if !crossterm::event::poll(timeout)? {
            return Ok(None);
        }
        Ok(map_event(crossterm::event::read()?))
    }

    fn cleanup(&mut self) {
        #[cfg(unix)]
        let _ = self.signal_guard.take();

        let mut stdout = io::stdout();
        if self.mouse_enabled {
            let _ = crossterm::execute!(stdout, crossterm::event::DisableMouseCapture);
            self.mouse_enabled = false;
        }
        let _ = crossterm::execute!(stdout, crossterm::cursor::Show);
        if self.alternate_screen_enabled {
            let _ = crossterm::execute!(stdout, crossterm::terminal::LeaveAlternateScreen);
            self.alternate_screen_enabled = false;
        }
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = stdout.flush();
        idlefx_core::debug!("terminal restored");
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn install_panic_hook() {
    static HOOK: OnceLock<()> = OnceLock::new();
    HOOK.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            best_effort_cleanup();
            previous(info);
        }));
    });
}

fn best_effort_cleanup() {
    let mut stdout = io::stdout();
    let _ = crossterm::execute!(stdout, crossterm::event::DisableMouseCapture);
    let _ = crossterm::execute!(stdout, crossterm::cursor::Show);
    let _ = crossterm::execute!(stdout, crossterm::terminal::LeaveAlternateScreen);
    let _ = crossterm::terminal::disable_raw_mode();
    let _ = stdout.flush();
}

#[cfg(unix)]
#[derive(Debug)]
struct SignalGuard {
    handle: signal_hook::iterator::Handle,
    thread: Option<std::thread::JoinHandle<()>>,
}

#[cfg(unix)]
impl SignalGuard {
    fn new(shutdown: Arc<AtomicBool>) -> io::Result<Self> {
        let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(io::Error::other)?;
        let handle = signals.handle();
        let thread = std::thread::spawn(move || {
            for signal in signals.forever() {
                idlefx_core::warn!(signal, "termination signal received");
                shutdown.store(true, Ordering::Relaxed);
            }
        });
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

#[cfg(unix)]
impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Decode a crossterm event into runtime input.
pub fn map_event(event: Event) -> Option<InputEvent> {
    match event {
        Event::Key(key) => map_key(key),
        Event::Mouse(_) => Some(InputEvent::Pointer),
        Event::Resize(width, height) => Some(InputEvent::Resize { width, height }),
        _ => None,
    }
}

fn map_key(key: KeyEvent) -> Option<InputEvent> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(InputEvent::Interrupt)
        }
        KeyCode::Char(ch) => Some(InputEvent::Char(ch)),
        _ => Some(InputEvent::Key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventState, MouseButton, MouseEvent, MouseEventKind};

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    #[test]
    fn keys_map_to_runtime_input() {
        assert_eq!(
            map_event(key(KeyCode::Char('f'), KeyModifiers::NONE)),
            Some(InputEvent::Char('f'))
        );
        assert_eq!(
            map_event(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(InputEvent::Interrupt)
        );
        assert_eq!(
            map_event(key(KeyCode::Enter, KeyModifiers::NONE)),
            Some(InputEvent::Key)
        );
    }

    #[test]
    fn key_release_ignored() {
        let event = Event::Key(KeyEvent {
            code: KeyCode::Char('x'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(map_event(event), None);
    }

    #[test]
    fn mouse_and_resize() {
        let click = Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 3,
            row: 4,
            modifiers: KeyModifiers::NONE,
        });
        assert_eq!(map_event(click), Some(InputEvent::Pointer));
        assert_eq!(
            map_event(Event::Resize(80, 24)),
            Some(InputEvent::Resize {
                width: 80,
                height: 24
            })
        );
        assert_eq!(map_event(Event::FocusLost), None);
    }

    #[test]
    fn default_options_capture_everything() {
        let options = TerminalOptions::default();
        assert!(options.alternate_screen);
        assert!(options.mouse_capture);
    }
}
