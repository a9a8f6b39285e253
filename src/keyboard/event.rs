//! Keyboard event types, the capture source trait and the polled listener

use super::terminal::{self, RawModeGuard};
use super::KeyCode;
use crate::error::CaptureError;
use device_query::{DeviceQuery, DeviceState};
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

/// Type of keyboard event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventType {
    /// Key was pressed down
    Press,
    /// Key was released
    Release,
}

/// A keyboard event with timing information
#[derive(Debug, Clone)]
pub struct KeyEvent {
    /// The key code
    pub key: KeyCode,
    /// Type of event (press/release)
    pub event_type: KeyEventType,
    /// When the event occurred
    pub timestamp: Instant,
}

impl KeyEvent {
    pub fn new(key: KeyCode, event_type: KeyEventType, timestamp: Instant) -> Self {
        Self {
            key,
            event_type,
            timestamp,
        }
    }

    pub fn press(key: KeyCode, timestamp: Instant) -> Self {
        Self::new(key, KeyEventType::Press, timestamp)
    }

    pub fn release(key: KeyCode, timestamp: Instant) -> Self {
        Self::new(key, KeyEventType::Release, timestamp)
    }
}

/// A backend that turns keyboard activity into [`KeyEvent`]s.
///
/// Sources push events into the `mpsc::Sender` they were built with; the
/// recorder drains the matching receiver between polls.
pub trait KeySource {
    /// Short backend name, recorded in report metadata
    fn name(&self) -> &'static str;

    /// Prepare for a new round, forgetting any keys held from before it
    fn begin_round(&mut self) -> Result<(), CaptureError>;

    /// Poll for keyboard state changes.
    /// Returns the number of events generated
    fn poll(&mut self) -> Result<usize, CaptureError>;

    /// Release whatever `begin_round` acquired
    fn end_round(&mut self) -> Result<(), CaptureError>;
}

impl<S: KeySource + ?Sized> KeySource for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn begin_round(&mut self) -> Result<(), CaptureError> {
        (**self).begin_round()
    }

    fn poll(&mut self) -> Result<usize, CaptureError> {
        (**self).poll()
    }

    fn end_round(&mut self) -> Result<(), CaptureError> {
        (**self).end_round()
    }
}

/// Keyboard listener that polls for key state changes
pub struct DeviceQueryListener {
    device_state: DeviceState,
    last_keys: Vec<device_query::Keycode>,
    event_tx: mpsc::Sender<KeyEvent>,
    abort: Arc<AtomicBool>,
    raw_mode: Option<RawModeGuard>,
}

impl DeviceQueryListener {
    /// Create a new keyboard listener
    pub fn new(
        event_tx: mpsc::Sender<KeyEvent>,
        abort: Arc<AtomicBool>,
    ) -> Result<Self, CaptureError> {
        let device_state = Self::device_state()?;
        Ok(Self {
            device_state,
            last_keys: Vec::new(),
            event_tx,
            abort,
            raw_mode: None,
        })
    }

    // Without a display server the X11 backend cannot be opened
    #[cfg(target_os = "linux")]
    fn device_state() -> Result<DeviceState, CaptureError> {
        DeviceState::checked_new().ok_or_else(|| {
            CaptureError::Unavailable("device_query could not open the X11 display".to_string())
        })
    }

    #[cfg(not(target_os = "linux"))]
    fn device_state() -> Result<DeviceState, CaptureError> {
        Ok(DeviceState::new())
    }
}

impl KeySource for DeviceQueryListener {
    fn name(&self) -> &'static str {
        "device-query"
    }

    fn begin_round(&mut self) -> Result<(), CaptureError> {
        self.raw_mode = Some(RawModeGuard::enable(false)?);
        // Keys already down (the Enter that started the round) are not new presses
        self.last_keys = self.device_state.get_keys();
        Ok(())
    }

    fn poll(&mut self) -> Result<usize, CaptureError> {
        terminal::drain_input(&self.abort)?;

        let now = Instant::now();
        let current_keys = self.device_state.get_keys();
        let mut event_count = 0;

        // Check for new key presses
        for key in &current_keys {
            if !self.last_keys.contains(key) {
                let _ = self.event_tx.send(KeyEvent::press(KeyCode::from(*key), now));
                event_count += 1;
            }
        }

        // Check for key releases
        for key in &self.last_keys {
            if !current_keys.contains(key) {
                let _ = self.event_tx.send(KeyEvent::release(KeyCode::from(*key), now));
                event_count += 1;
            }
        }

        self.last_keys = current_keys;
        Ok(event_count)
    }

    fn end_round(&mut self) -> Result<(), CaptureError> {
        if let Some(guard) = self.raw_mode.take() {
            guard.restore()?;
        }
        Ok(())
    }
}
