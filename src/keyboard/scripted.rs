//! A key source that replays predetermined rounds
//!
//! Used to drive the full pipeline without a keyboard: each scripted round
//! is delivered on the first poll after `begin_round`, followed by an Enter
//! press, or by an abort for rounds scripted as interrupted.

use super::{KeyCode, KeyEvent, KeyEventType, KeySource};
use crate::error::CaptureError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct ScriptedRound {
    /// (key, event type, seconds after the round's first poll)
    events: Vec<(KeyCode, KeyEventType, f64)>,
    terminated: bool,
}

/// Replays scripted rounds through the [`KeySource`] interface
pub struct ScriptedSource {
    event_tx: mpsc::Sender<KeyEvent>,
    abort: Arc<AtomicBool>,
    rounds: VecDeque<ScriptedRound>,
    current: Option<ScriptedRound>,
}

impl ScriptedSource {
    pub fn new(event_tx: mpsc::Sender<KeyEvent>, abort: Arc<AtomicBool>) -> Self {
        Self {
            event_tx,
            abort,
            rounds: VecDeque::new(),
            current: None,
        }
    }

    /// Queue a round of `(char, down, up)` keystrokes ended by Enter
    pub fn round(self, keys: &[(&str, f64, f64)]) -> Self {
        self.push_keys(keys, true)
    }

    /// Queue a round that the user interrupts before pressing Enter
    pub fn aborted_round(self, keys: &[(&str, f64, f64)]) -> Self {
        self.push_keys(keys, false)
    }

    /// Queue a round of raw events, delivered in the given order
    pub fn events_round(mut self, events: Vec<(KeyCode, KeyEventType, f64)>) -> Self {
        self.rounds.push_back(ScriptedRound {
            events,
            terminated: true,
        });
        self
    }

    fn push_keys(mut self, keys: &[(&str, f64, f64)], terminated: bool) -> Self {
        let mut events = Vec::with_capacity(keys.len() * 2);
        for (key, down, up) in keys {
            let code = key
                .chars()
                .next()
                .and_then(KeyCode::from_char)
                .unwrap_or(KeyCode(0));
            events.push((code, KeyEventType::Press, *down));
            events.push((code, KeyEventType::Release, *up));
        }
        events.sort_by(|a, b| a.2.total_cmp(&b.2));
        self.rounds.push_back(ScriptedRound { events, terminated });
        self
    }
}

impl KeySource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn begin_round(&mut self) -> Result<(), CaptureError> {
        self.current = self.rounds.pop_front();
        Ok(())
    }

    fn poll(&mut self) -> Result<usize, CaptureError> {
        let Some(round) = self.current.take() else {
            // Script exhausted: behave like a user walking away with Ctrl+C
            self.abort.store(true, Ordering::SeqCst);
            return Ok(0);
        };

        let base = Instant::now();
        let at = |secs: f64| base + Duration::from_secs_f64(secs.max(0.0));
        let mut sent = 0;
        let mut last = 0.0f64;
        for (key, event_type, secs) in &round.events {
            let _ = self.event_tx.send(KeyEvent::new(*key, *event_type, at(*secs)));
            last = last.max(*secs);
            sent += 1;
        }
        if round.terminated {
            let _ = self
                .event_tx
                .send(KeyEvent::press(KeyCode::ENTER, at(last + 0.01)));
            sent += 1;
        } else {
            self.abort.store(true, Ordering::SeqCst);
        }
        Ok(sent)
    }

    fn end_round(&mut self) -> Result<(), CaptureError> {
        self.current = None;
        Ok(())
    }
}
