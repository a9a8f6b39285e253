//! Raw evdev-based keyboard listener for Linux
//!
//! Reads `input_event` records straight from `/dev/input/event*`, which sees
//! every physical key regardless of terminal or display server.

use super::terminal::{self, RawModeGuard};
use super::{KeyCode, KeyEvent, KeyEventType, KeySource};
use crate::error::CaptureError;
use nix::libc;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

/// A raw input event from the kernel
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct InputEvent {
    tv_sec: i64,
    tv_usec: i64,
    event_type: u16,
    code: u16,
    value: i32,
}

impl InputEvent {
    /// Kernel timestamp of the event
    fn timestamp(&self) -> Duration {
        let secs = u64::try_from(self.tv_sec).unwrap_or(0);
        let micros = u64::try_from(self.tv_usec).unwrap_or(0);
        Duration::from_secs(secs) + Duration::from_micros(micros)
    }
}

/// Places kernel event times on the monotonic clock for one round.
///
/// The first event of a round is pinned to the moment it was read; every
/// later event keeps its kernel spacing from that one, so polling latency
/// does not leak into intervals or hold times.
#[derive(Debug, Default)]
struct EventClock {
    anchor: Option<(Duration, Instant)>,
}

impl EventClock {
    fn reset(&mut self) {
        self.anchor = None;
    }

    fn place(&mut self, kernel: Duration, received: Instant) -> Instant {
        let (base, origin) = *self.anchor.get_or_insert((kernel, received));
        origin + kernel.saturating_sub(base)
    }
}

const EV_KEY: u16 = 0x01;
const KEY_RELEASE: i32 = 0;
const KEY_PRESS: i32 = 1;
const INPUT_EVENT_SIZE: usize = std::mem::size_of::<InputEvent>();

/// Find all keyboard input devices
fn find_keyboard_devices() -> Result<Vec<PathBuf>, CaptureError> {
    let input_dir = PathBuf::from("/dev/input");
    if !input_dir.exists() {
        return Err(CaptureError::Unavailable(
            "/dev/input does not exist".to_string(),
        ));
    }

    let keyboards: Vec<PathBuf> = fs::read_dir(&input_dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("event"))
        })
        .filter(|path| is_keyboard_device(path))
        .collect();

    if keyboards.is_empty() {
        return Err(CaptureError::NoDevices);
    }

    Ok(keyboards)
}

/// Check if a device is a keyboard by examining /sys/class/input
fn is_keyboard_device(device_path: &Path) -> bool {
    let Some(name) = device_path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    // The capabilities are hex bitmaps showing which keys are supported
    let caps_path = format!("/sys/class/input/{}/device/capabilities/key", name);
    if let Ok(caps) = fs::read_to_string(&caps_path) {
        let trimmed = caps.trim();
        if !trimmed.is_empty() && trimmed != "0" {
            let total_bits: u32 = trimmed
                .split_whitespace()
                .filter_map(|hex| u64::from_str_radix(hex, 16).ok())
                .map(|n| n.count_ones())
                .sum();
            // A typical keyboard has 80+ keys mapped
            return total_bits > 50;
        }
    }

    // Fallback: check device name in /sys
    let name_path = format!("/sys/class/input/{}/device/name", name);
    if let Ok(dev_name) = fs::read_to_string(&name_path) {
        let dev_name_lower = dev_name.to_lowercase();
        return dev_name_lower.contains("keyboard") || dev_name_lower.contains("kbd");
    }
    false
}

/// Evdev-based keyboard listener for raw scancode detection
pub struct EvdevListener {
    devices: Vec<File>,
    pressed_keys: HashSet<u16>,
    event_tx: mpsc::Sender<KeyEvent>,
    abort: Arc<AtomicBool>,
    buffer: Vec<u8>,
    raw_mode: Option<RawModeGuard>,
    clock: EventClock,
}

impl EvdevListener {
    /// Open every readable keyboard device in non-blocking mode
    pub fn new(
        event_tx: mpsc::Sender<KeyEvent>,
        abort: Arc<AtomicBool>,
    ) -> Result<Self, CaptureError> {
        let device_paths = find_keyboard_devices()?;
        let mut devices = Vec::new();

        for path in &device_paths {
            match File::open(path) {
                Ok(file) => {
                    let fd = file.as_raw_fd();
                    unsafe {
                        let flags = libc::fcntl(fd, libc::F_GETFL);
                        libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                    }
                    log::debug!("evdev: opened {}", path.display());
                    devices.push(file);
                }
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    log::debug!("evdev: no permission for {}", path.display());
                    continue;
                }
                Err(e) => return Err(CaptureError::Io(e)),
            }
        }

        if devices.is_empty() {
            return Err(CaptureError::PermissionDenied(
                "cannot read any keyboard device; add your user to the 'input' group".to_string(),
            ));
        }

        Ok(Self {
            devices,
            pressed_keys: HashSet::new(),
            event_tx,
            abort,
            buffer: vec![0u8; INPUT_EVENT_SIZE * 64],
            raw_mode: None,
            clock: EventClock::default(),
        })
    }

    /// Get the number of opened devices
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Discard whatever the kernel queued before the round began
    fn flush_devices(&mut self) {
        for device in &mut self.devices {
            while let Ok(n) = device.read(&mut self.buffer) {
                if n == 0 {
                    break;
                }
            }
        }
    }
}

impl KeySource for EvdevListener {
    fn name(&self) -> &'static str {
        "evdev"
    }

    fn begin_round(&mut self) -> Result<(), CaptureError> {
        self.raw_mode = Some(RawModeGuard::enable(false)?);
        self.flush_devices();
        self.pressed_keys.clear();
        self.clock.reset();
        Ok(())
    }

    fn poll(&mut self) -> Result<usize, CaptureError> {
        terminal::drain_input(&self.abort)?;

        let received = Instant::now();
        let mut event_count = 0;

        for device in &mut self.devices {
            loop {
                match device.read(&mut self.buffer) {
                    Ok(bytes_read) if bytes_read >= INPUT_EVENT_SIZE => {
                        let num_events = bytes_read / INPUT_EVENT_SIZE;
                        for i in 0..num_events {
                            let offset = i * INPUT_EVENT_SIZE;
                            let event_bytes = &self.buffer[offset..offset + INPUT_EVENT_SIZE];

                            let input_event: InputEvent = unsafe {
                                std::ptr::read_unaligned(event_bytes.as_ptr() as *const InputEvent)
                            };

                            if input_event.event_type != EV_KEY {
                                continue;
                            }
                            let scancode = input_event.code;
                            let event_type = match input_event.value {
                                KEY_PRESS => KeyEventType::Press,
                                KEY_RELEASE => KeyEventType::Release,
                                // Autorepeat (KEY_REPEAT) is not a new keystroke
                                _ => continue,
                            };

                            // A release for a key pressed before the round is
                            // forwarded; the recorder discards it as unmatched.
                            match event_type {
                                KeyEventType::Press => {
                                    if !self.pressed_keys.insert(scancode) {
                                        continue;
                                    }
                                }
                                KeyEventType::Release => {
                                    self.pressed_keys.remove(&scancode);
                                }
                            }

                            let at = self.clock.place(input_event.timestamp(), received);
                            let event = KeyEvent::new(KeyCode::new(scancode), event_type, at);
                            let _ = self.event_tx.send(event);
                            event_count += 1;
                        }
                    }
                    Ok(_) => break,
                    Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(e) => {
                        log::warn!("evdev: read failed, skipping device: {}", e);
                        break;
                    }
                }
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

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn input_event_matches_kernel_layout() {
        // struct input_event on 64-bit Linux: timeval (16) + u16 + u16 + i32
        assert_eq!(INPUT_EVENT_SIZE, 24);
    }

    fn event_at(tv_sec: i64, tv_usec: i64) -> InputEvent {
        InputEvent {
            tv_sec,
            tv_usec,
            event_type: EV_KEY,
            code: 30,
            value: KEY_PRESS,
        }
    }

    #[test]
    fn kernel_timestamp_combines_seconds_and_micros() {
        assert_eq!(event_at(12, 250_000).timestamp(), Duration::from_millis(12_250));
        assert_eq!(event_at(-1, 5).timestamp(), Duration::from_micros(5));
    }

    #[test]
    fn clock_keeps_kernel_spacing_within_a_round() {
        let mut clock = EventClock::default();
        let received = Instant::now();
        let first = clock.place(event_at(100, 0).timestamp(), received);
        // Read in the same poll, but 80 ms apart in the kernel
        let second = clock.place(event_at(100, 80_000).timestamp(), received);

        assert_eq!(first, received);
        assert_eq!(second - first, Duration::from_millis(80));
    }

    #[test]
    fn clock_never_places_events_before_the_anchor() {
        let mut clock = EventClock::default();
        let received = Instant::now();
        clock.place(event_at(100, 500).timestamp(), received);
        let earlier = clock.place(event_at(100, 0).timestamp(), received);
        assert_eq!(earlier, received);
    }

    #[test]
    fn clock_reanchors_after_reset() {
        let mut clock = EventClock::default();
        let first_round = Instant::now();
        clock.place(event_at(100, 0).timestamp(), first_round);

        clock.reset();
        let next_round = first_round + Duration::from_secs(30);
        let placed = clock.place(event_at(5_000, 0).timestamp(), next_round);
        assert_eq!(placed, next_round);
    }

    #[test]
    fn find_devices_does_not_panic() {
        // Depends on the machine; only the absence of a panic is checked
        match find_keyboard_devices() {
            Ok(devices) => assert!(!devices.is_empty()),
            Err(e) => assert!(!e.to_string().is_empty()),
        }
    }
}
