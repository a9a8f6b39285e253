//! Keyboard capture: key sources, key identities and round recording

mod event;
pub mod keymap;
mod recorder;
mod scripted;
pub mod terminal;

#[cfg(target_os = "linux")]
mod evdev_listener;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use event::{DeviceQueryListener, KeyEvent, KeyEventType, KeySource};
pub use keymap::{KeyCode, KeyInfo, KEYMAP};
pub use recorder::{Feed, KeyStroke, RecordedRound, Recorder, RoundOutcome, StrokeBuilder};
pub use scripted::ScriptedSource;
pub use terminal::TerminalListener;

#[cfg(target_os = "linux")]
pub use evdev_listener::EvdevListener;
