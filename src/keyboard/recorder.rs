//! Round recording: pairs press/release events into keystrokes

use super::{KeyCode, KeyEvent, KeyEventType, KeySource};
use crate::error::CaptureError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

/// One key press paired with its release.
///
/// Times are seconds since the round started. `key` holds the raw key name
/// until the session's labeler replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyStroke {
    pub key: String,
    pub down: f64,
    pub up: f64,
}

impl KeyStroke {
    pub fn new(key: impl Into<String>, down: f64, up: f64) -> Self {
        Self {
            key: key.into(),
            down,
            up,
        }
    }
}

/// Keystrokes captured for one round, ordered by key-down time
#[derive(Debug, Clone, Default)]
pub struct RecordedRound {
    pub strokes: Vec<KeyStroke>,
    /// Latest timestamp minus earliest timestamp, in seconds
    pub duration: f64,
}

impl RecordedRound {
    pub fn from_strokes(strokes: Vec<KeyStroke>) -> Self {
        let first = strokes.iter().map(|s| s.down).fold(f64::INFINITY, f64::min);
        let last = strokes
            .iter()
            .map(|s| s.up.max(s.down))
            .fold(f64::NEG_INFINITY, f64::max);
        let duration = if strokes.is_empty() { 0.0 } else { last - first };
        Self { strokes, duration }
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}

/// How a recording attempt ended
#[derive(Debug, Clone)]
pub enum RoundOutcome {
    Completed(RecordedRound),
    /// The user interrupted; partial data has been discarded
    Aborted,
}

/// Result of feeding one event to a [`StrokeBuilder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Continue,
    Terminated,
}

#[derive(Debug)]
struct OpenStroke {
    key: KeyCode,
    down: Instant,
    up: Option<Instant>,
}

/// Pairs raw events into strokes for a single round
#[derive(Debug)]
pub struct StrokeBuilder {
    origin: Instant,
    strokes: Vec<OpenStroke>,
    /// Index into `strokes` of each key currently held
    held: HashMap<KeyCode, usize>,
    unmatched_releases: u32,
}

impl StrokeBuilder {
    pub fn new(origin: Instant) -> Self {
        Self {
            origin,
            strokes: Vec::new(),
            held: HashMap::new(),
            unmatched_releases: 0,
        }
    }

    /// Feed one event; returns [`Feed::Terminated`] on the end-of-round key
    pub fn feed(&mut self, event: &KeyEvent) -> Feed {
        if event.key.is_terminator() {
            return match event.event_type {
                KeyEventType::Press => Feed::Terminated,
                KeyEventType::Release => Feed::Continue,
            };
        }

        match event.event_type {
            KeyEventType::Press => {
                // Autorepeat while held is not a new stroke
                if self.held.contains_key(&event.key) {
                    return Feed::Continue;
                }
                self.held.insert(event.key, self.strokes.len());
                self.strokes.push(OpenStroke {
                    key: event.key,
                    down: event.timestamp,
                    up: None,
                });
            }
            KeyEventType::Release => match self.held.remove(&event.key) {
                Some(index) => self.strokes[index].up = Some(event.timestamp),
                None => {
                    log::debug!("discarding key release with no matching press");
                    self.unmatched_releases += 1;
                }
            },
        }
        Feed::Continue
    }

    fn seconds(&self, at: Instant) -> f64 {
        at.saturating_duration_since(self.origin).as_secs_f64()
    }

    /// Close the round, pairing keys still held with a zero hold time
    pub fn finish(self) -> RecordedRound {
        if self.unmatched_releases > 0 {
            log::warn!(
                "discarded {} key release(s) with no matching press",
                self.unmatched_releases
            );
        }
        let still_held = self.held.len();
        if still_held > 0 {
            log::warn!(
                "{} key(s) still held at end of round; hold recorded as zero",
                still_held
            );
        }

        let strokes = self
            .strokes
            .iter()
            .map(|open| {
                let down = self.seconds(open.down);
                let up = open.up.map(|t| self.seconds(t)).unwrap_or(down);
                KeyStroke::new(open.key.name(), down, up)
            })
            .collect();
        RecordedRound::from_strokes(strokes)
    }
}

/// Drives a [`KeySource`] through one round at a time
pub struct Recorder<S: KeySource> {
    source: S,
    events: mpsc::Receiver<KeyEvent>,
    abort: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl<S: KeySource> Recorder<S> {
    pub fn new(
        source: S,
        events: mpsc::Receiver<KeyEvent>,
        abort: Arc<AtomicBool>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            events,
            abort,
            poll_interval,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Record one round, returning once the end-of-round key is pressed or
    /// the user aborts.
    pub fn record_round(&mut self) -> Result<RoundOutcome, CaptureError> {
        // Anything queued between rounds belongs to neither
        while self.events.try_recv().is_ok() {}

        self.source.begin_round()?;
        let outcome = self.capture();
        let restored = self.source.end_round();
        let outcome = outcome?;
        restored?;
        Ok(outcome)
    }

    fn capture(&mut self) -> Result<RoundOutcome, CaptureError> {
        let mut builder = StrokeBuilder::new(Instant::now());
        loop {
            if self.abort.load(Ordering::SeqCst) {
                return Ok(RoundOutcome::Aborted);
            }
            self.source.poll()?;
            while let Ok(event) = self.events.try_recv() {
                if builder.feed(&event) == Feed::Terminated {
                    if self.abort.load(Ordering::SeqCst) {
                        return Ok(RoundOutcome::Aborted);
                    }
                    return Ok(RoundOutcome::Completed(builder.finish()));
                }
            }
            if !self.poll_interval.is_zero() {
                thread::sleep(self.poll_interval);
            }
        }
    }
}
