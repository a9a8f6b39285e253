//! Terminal handling: raw mode, round prompts and the crossterm key source
//!
//! Every backend keeps the terminal in raw mode while a round is recorded so
//! the typed phrase is not echoed and Ctrl+C arrives as a key rather than a
//! signal. The terminal itself can also be the key source when it supports
//! the keyboard enhancement protocol (key release reporting).

use super::{KeyCode, KeyEvent, KeySource};
use crate::error::CaptureError;
use crossterm::event::{
    self, Event, KeyCode as CtKeyCode, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::{self, stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

/// How long prompt loops wait for a terminal event before rechecking abort
const PROMPT_TICK: Duration = Duration::from_millis(50);

/// Keeps the terminal in raw mode until restored or dropped
pub struct RawModeGuard {
    enhanced: bool,
    active: bool,
}

impl RawModeGuard {
    /// Enter raw mode, optionally asking the terminal to report key releases
    pub fn enable(report_releases: bool) -> io::Result<Self> {
        enable_raw_mode()?;
        if report_releases {
            if let Err(e) = execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            ) {
                let _ = disable_raw_mode();
                return Err(e);
            }
        }
        Ok(Self {
            enhanced: report_releases,
            active: true,
        })
    }

    /// Leave raw mode, reporting any failure
    pub fn restore(mut self) -> io::Result<()> {
        self.reset()
    }

    fn reset(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        if self.enhanced {
            execute!(stdout(), PopKeyboardEnhancementFlags)?;
        }
        disable_raw_mode()
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = self.reset();
    }
}

/// Whether the terminal can report key releases
pub fn supports_release_events() -> bool {
    crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false)
}

fn is_interrupt(key: &event::KeyEvent) -> bool {
    key.kind != KeyEventKind::Release
        && key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, CtKeyCode::Char('c') | CtKeyCode::Char('C'))
}

/// Consume pending terminal input, flagging an abort on Ctrl+C.
///
/// Backends that read keys elsewhere still call this so typed text does not
/// pile up in the terminal buffer.
pub fn drain_input(abort: &AtomicBool) -> io::Result<()> {
    while event::poll(Duration::ZERO)? {
        if let Event::Key(key) = event::read()? {
            if is_interrupt(&key) {
                abort.store(true, Ordering::SeqCst);
            }
        }
    }
    Ok(())
}

/// Outcome of waiting for the user to start a round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartSignal {
    Start,
    Abort,
}

/// Block until Enter (start) or Ctrl+C / Esc (abort)
pub fn wait_for_start(abort: &AtomicBool) -> io::Result<StartSignal> {
    let guard = RawModeGuard::enable(false)?;
    let signal = loop {
        if abort.load(Ordering::SeqCst) {
            break StartSignal::Abort;
        }
        if !event::poll(PROMPT_TICK)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Release {
                continue;
            }
            if is_interrupt(&key) || key.code == CtKeyCode::Esc {
                abort.store(true, Ordering::SeqCst);
                break StartSignal::Abort;
            }
            if key.code == CtKeyCode::Enter {
                break StartSignal::Start;
            }
        }
    };
    guard.restore()?;
    Ok(signal)
}

/// Map a crossterm key to the scancode the other backends would report
fn scancode(code: CtKeyCode) -> Option<KeyCode> {
    match code {
        CtKeyCode::Char(c) => KeyCode::from_char(c),
        CtKeyCode::Enter => Some(KeyCode::ENTER),
        CtKeyCode::Backspace => Some(KeyCode(14)),
        CtKeyCode::Tab | CtKeyCode::BackTab => Some(KeyCode(15)),
        CtKeyCode::Esc => Some(KeyCode::ESCAPE),
        CtKeyCode::Left => Some(KeyCode(105)),
        CtKeyCode::Right => Some(KeyCode(106)),
        CtKeyCode::Up => Some(KeyCode(103)),
        CtKeyCode::Down => Some(KeyCode(108)),
        CtKeyCode::Home => Some(KeyCode(102)),
        CtKeyCode::End => Some(KeyCode(107)),
        CtKeyCode::PageUp => Some(KeyCode(104)),
        CtKeyCode::PageDown => Some(KeyCode(109)),
        CtKeyCode::Insert => Some(KeyCode(110)),
        CtKeyCode::Delete => Some(KeyCode(111)),
        _ => None,
    }
}

/// Key source reading the terminal's own key events
pub struct TerminalListener {
    event_tx: mpsc::Sender<KeyEvent>,
    abort: Arc<AtomicBool>,
    report_releases: bool,
    warned_no_releases: bool,
    raw_mode: Option<RawModeGuard>,
}

impl TerminalListener {
    pub fn new(event_tx: mpsc::Sender<KeyEvent>, abort: Arc<AtomicBool>) -> Self {
        Self {
            event_tx,
            abort,
            report_releases: supports_release_events(),
            warned_no_releases: false,
            raw_mode: None,
        }
    }

    pub fn reports_releases(&self) -> bool {
        self.report_releases
    }
}

impl KeySource for TerminalListener {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn begin_round(&mut self) -> Result<(), CaptureError> {
        if !self.report_releases && !self.warned_no_releases {
            log::warn!(
                "terminal does not report key releases; hold times will be recorded as zero"
            );
            self.warned_no_releases = true;
        }
        self.raw_mode = Some(RawModeGuard::enable(self.report_releases)?);
        Ok(())
    }

    fn poll(&mut self) -> Result<usize, CaptureError> {
        let mut event_count = 0;
        if !event::poll(Duration::from_millis(1))? {
            return Ok(0);
        }
        while event::poll(Duration::ZERO)? {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            let now = Instant::now();
            if is_interrupt(&key) {
                self.abort.store(true, Ordering::SeqCst);
                continue;
            }
            let Some(code) = scancode(key.code) else {
                log::debug!("ignoring a terminal key with no scancode");
                continue;
            };
            match key.kind {
                KeyEventKind::Press => {
                    let _ = self.event_tx.send(KeyEvent::press(code, now));
                    event_count += 1;
                    if !self.report_releases {
                        let _ = self.event_tx.send(KeyEvent::release(code, now));
                        event_count += 1;
                    }
                }
                KeyEventKind::Release => {
                    let _ = self.event_tx.send(KeyEvent::release(code, now));
                    event_count += 1;
                }
                // Autorepeat is not a new keystroke
                KeyEventKind::Repeat => {}
            }
        }
        Ok(event_count)
    }

    fn end_round(&mut self) -> Result<(), CaptureError> {
        if let Some(guard) = self.raw_mode.take() {
            guard.restore()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent as CtKeyEvent;

    #[test]
    fn ctrl_c_is_interrupt() {
        let key = CtKeyEvent::new(CtKeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(is_interrupt(&key));
        let plain = CtKeyEvent::new(CtKeyCode::Char('c'), KeyModifiers::NONE);
        assert!(!is_interrupt(&plain));
    }

    #[test]
    fn terminal_keys_share_scancodes_with_other_backends() {
        assert_eq!(scancode(CtKeyCode::Char('t')), Some(KeyCode(20)));
        assert_eq!(scancode(CtKeyCode::Char('T')), Some(KeyCode(20)));
        assert_eq!(scancode(CtKeyCode::Enter), Some(KeyCode::ENTER));
        assert_eq!(scancode(CtKeyCode::F(5)), None);
    }
}
