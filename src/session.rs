//! Session context and the round-by-round pipeline driver
//!
//! A [`Session`] owns everything that lives for the whole run: the session
//! id, the phrase, the key labeler (and with it the salt) and the metrics of
//! every completed round. It is passed explicitly to each stage; nothing is
//! read from global state.

use crate::anonymize::KeyLabeler;
use crate::error::{CaptureError, SetupError};
use crate::keyboard::terminal::StartSignal;
use crate::keyboard::{KeySource, KeyStroke, RecordedRound, Recorder, RoundOutcome};
use crate::metrics::{RoundMetrics, SessionAggregate};
use chrono::{DateTime, Utc};

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Recording(u32),
    AggregatingRound(u32),
    SessionAggregating,
    Done,
}

/// Interaction around each round: asking the user to start, and feedback
/// once a round is measured
pub trait RoundGate {
    /// Block until the user starts round `round` or asks to stop
    fn wait_for_start(
        &mut self,
        round: u32,
        session: &Session,
    ) -> Result<StartSignal, CaptureError>;

    /// Called after a round's metrics are computed
    fn round_finished(&mut self, _metrics: &RoundMetrics) {}
}

/// State of one capture session
#[derive(Debug)]
pub struct Session {
    id: String,
    phrase: String,
    rounds_requested: u32,
    labeler: KeyLabeler,
    created_at: DateTime<Utc>,
    rounds: Vec<RoundMetrics>,
    phase: Phase,
    interrupted: bool,
}

impl Session {
    /// Validate the settings and start a new session with a fresh id
    pub fn new(
        phrase: impl Into<String>,
        rounds_requested: u32,
        labeler: KeyLabeler,
    ) -> Result<Self, SetupError> {
        let phrase = phrase.into();
        if phrase.trim().is_empty() {
            return Err(SetupError::EmptyPhrase);
        }
        if rounds_requested < 1 {
            return Err(SetupError::InvalidRounds(rounds_requested));
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            phrase,
            rounds_requested,
            labeler,
            created_at: Utc::now(),
            rounds: Vec::new(),
            phase: Phase::Idle,
            interrupted: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn rounds_requested(&self) -> u32 {
        self.rounds_requested
    }

    pub fn rounds_completed(&self) -> u32 {
        self.rounds.len() as u32
    }

    pub fn is_anonymized(&self) -> bool {
        self.labeler.is_anonymized()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn rounds(&self) -> &[RoundMetrics] {
        &self.rounds
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the session ended before all requested rounds completed
    pub fn was_interrupted(&self) -> bool {
        self.interrupted
    }

    fn transition(&mut self, next: Phase) {
        debug_assert!(self.phase != Phase::Done, "no transition out of Done");
        log::debug!("session {}: {:?} -> {:?}", self.id, self.phase, next);
        self.phase = next;
    }

    /// Replace raw key names with the session's labels
    pub fn label_strokes(&self, strokes: Vec<KeyStroke>) -> Vec<KeyStroke> {
        strokes
            .into_iter()
            .map(|stroke| KeyStroke {
                key: self.labeler.label(&stroke.key),
                ..stroke
            })
            .collect()
    }

    /// Label a recorded round, compute its metrics and keep them
    pub fn complete_round(&mut self, recorded: RecordedRound) -> &RoundMetrics {
        let round_index = self.rounds_completed() + 1;
        if recorded.is_empty() {
            log::warn!("round {}: no keystrokes captured; recording empty metrics", round_index);
        }
        let duration = recorded.duration;
        let strokes = self.label_strokes(recorded.strokes);
        let metrics = RoundMetrics::compute(round_index, duration, &strokes);
        log::info!(
            "round {} complete: {} keystrokes in {:.4}s",
            round_index,
            metrics.keystrokes,
            metrics.duration
        );
        self.rounds.push(metrics);
        &self.rounds[self.rounds.len() - 1]
    }

    /// Fold every completed round into session statistics
    pub fn aggregate(&self) -> SessionAggregate {
        SessionAggregate::from_rounds(&self.rounds)
    }

    /// Run every requested round, then aggregate.
    ///
    /// An abort or a capture failure ends the session early; only rounds
    /// that completed contribute to the aggregate.
    pub fn run<S, G>(&mut self, recorder: &mut Recorder<S>, gate: &mut G) -> SessionAggregate
    where
        S: KeySource,
        G: RoundGate,
    {
        if self.phase != Phase::Idle {
            log::warn!("session {} already ran; returning its aggregate", self.id);
            return self.aggregate();
        }

        for round in 1..=self.rounds_requested {
            match gate.wait_for_start(round, self) {
                Ok(StartSignal::Start) => {}
                Ok(StartSignal::Abort) => {
                    log::info!("session stopped before round {}", round);
                    self.interrupted = true;
                    break;
                }
                Err(e) => {
                    log::error!("could not start round {}: {}", round, e);
                    self.interrupted = true;
                    break;
                }
            }

            self.transition(Phase::Recording(round));
            match recorder.record_round() {
                Ok(RoundOutcome::Completed(recorded)) => {
                    self.transition(Phase::AggregatingRound(round));
                    let metrics = self.complete_round(recorded);
                    gate.round_finished(metrics);
                }
                Ok(RoundOutcome::Aborted) => {
                    log::warn!("round {} interrupted; partial data discarded", round);
                    self.interrupted = true;
                    break;
                }
                Err(e) => {
                    log::error!("capture failed during round {}: {}", round, e);
                    self.interrupted = true;
                    break;
                }
            }
        }

        self.transition(Phase::SessionAggregating);
        let aggregate = self.aggregate();
        self.transition(Phase::Done);
        aggregate
    }
}
