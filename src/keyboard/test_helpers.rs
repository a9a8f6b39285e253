//! Shared test utilities for keyboard and metrics modules
//!
//! Provides common helper functions for creating timed events.

use crate::keyboard::{KeyCode, KeyEvent, KeyEventType};
use std::time::{Duration, Instant};

pub use crate::keyboard::ScriptedSource;

/// An instant `secs` seconds after `origin`
pub fn at(origin: Instant, secs: f64) -> Instant {
    origin + Duration::from_secs_f64(secs)
}

/// Creates a key press event with a specific timestamp.
pub fn press_at(key: KeyCode, timestamp: Instant) -> KeyEvent {
    KeyEvent::new(key, KeyEventType::Press, timestamp)
}

/// Creates a key release event with a specific timestamp.
pub fn release_at(key: KeyCode, timestamp: Instant) -> KeyEvent {
    KeyEvent::new(key, KeyEventType::Release, timestamp)
}

/// Asserts two durations agree to within a microsecond
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_at_uses_provided_timestamp() {
        let ts = Instant::now();
        let event = press_at(KeyCode(30), ts);
        assert_eq!(event.timestamp, ts);
        assert_eq!(event.event_type, KeyEventType::Press);
    }

    #[test]
    fn release_at_creates_release_event() {
        let origin = Instant::now();
        let event = release_at(KeyCode(31), at(origin, 0.25));
        assert_eq!(event.key, KeyCode(31));
        assert_eq!(event.event_type, KeyEventType::Release);
        assert_eq!(event.timestamp.duration_since(origin), Duration::from_millis(250));
    }
}
