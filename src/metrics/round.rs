//! Per-round cadence metrics

use crate::keyboard::KeyStroke;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cadence measurements derived from one round's keystrokes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundMetrics {
    /// 1-based position of the round in the session
    pub round_index: u32,
    /// Seconds from the first key-down to the last key-up
    pub duration: f64,
    /// Number of keystrokes recorded
    pub keystrokes: usize,
    /// Seconds between consecutive key-downs, in typing order
    pub inter_key_intervals: Vec<f64>,
    /// Hold durations in seconds, grouped by key label
    pub key_hold_times: BTreeMap<String, Vec<f64>>,
}

impl RoundMetrics {
    /// Derive intervals and hold times from strokes ordered by key-down.
    ///
    /// Negative durations can only come from a capture defect; they are
    /// clamped to zero and logged rather than propagated.
    pub fn compute(round_index: u32, duration: f64, strokes: &[KeyStroke]) -> Self {
        let mut clamped = 0usize;
        let mut non_negative = |value: f64| {
            if value < 0.0 {
                clamped += 1;
                0.0
            } else {
                value
            }
        };

        let inter_key_intervals: Vec<f64> = strokes
            .windows(2)
            .map(|pair| non_negative(pair[1].down - pair[0].down))
            .collect();

        let mut key_hold_times: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for stroke in strokes {
            key_hold_times
                .entry(stroke.key.clone())
                .or_default()
                .push(non_negative(stroke.up - stroke.down));
        }

        if clamped > 0 {
            log::warn!(
                "round {}: clamped {} negative duration(s) to zero",
                round_index,
                clamped
            );
        }

        Self {
            round_index,
            duration: duration.max(0.0),
            keystrokes: strokes.len(),
            inter_key_intervals,
            key_hold_times,
        }
    }

    /// Number of distinct key labels seen in the round
    pub fn distinct_keys(&self) -> usize {
        self.key_hold_times.len()
    }

    /// Every hold duration in the round, regardless of key
    pub fn hold_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.key_hold_times.values().flatten().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::test_helpers::assert_close;

    fn the() -> Vec<KeyStroke> {
        vec![
            KeyStroke::new("t", 0.0, 0.05),
            KeyStroke::new("h", 0.5, 0.58),
            KeyStroke::new("e", 1.1, 1.20),
        ]
    }

    #[test]
    fn intervals_between_consecutive_downs() {
        let metrics = RoundMetrics::compute(1, 1.2, &the());
        assert_eq!(metrics.inter_key_intervals.len(), 2);
        assert_close(metrics.inter_key_intervals[0], 0.5);
        assert_close(metrics.inter_key_intervals[1], 0.6);
    }

    #[test]
    fn holds_grouped_by_key() {
        let metrics = RoundMetrics::compute(1, 1.2, &the());
        assert_eq!(metrics.distinct_keys(), 3);
        assert_close(metrics.key_hold_times["t"][0], 0.05);
        assert_close(metrics.key_hold_times["h"][0], 0.08);
        assert_close(metrics.key_hold_times["e"][0], 0.10);
    }

    #[test]
    fn repeated_key_keeps_every_hold_in_order() {
        let strokes = vec![
            KeyStroke::new("o", 0.0, 0.1),
            KeyStroke::new("x", 0.2, 0.25),
            KeyStroke::new("o", 0.4, 0.43),
        ];
        let metrics = RoundMetrics::compute(2, 0.43, &strokes);
        let holds = &metrics.key_hold_times["o"];
        assert_eq!(holds.len(), 2);
        assert_close(holds[0], 0.1);
        assert_close(holds[1], 0.03);
    }

    #[test]
    fn fewer_than_two_strokes_have_no_intervals() {
        assert!(RoundMetrics::compute(1, 0.0, &[]).inter_key_intervals.is_empty());
        let single = [KeyStroke::new("a", 0.0, 0.1)];
        let metrics = RoundMetrics::compute(1, 0.1, &single);
        assert!(metrics.inter_key_intervals.is_empty());
        assert_eq!(metrics.keystrokes, 1);
    }

    #[test]
    fn malformed_input_is_clamped_not_rejected() {
        let strokes = vec![
            KeyStroke::new("a", 0.5, 0.4),
            KeyStroke::new("b", 0.3, 0.35),
        ];
        let metrics = RoundMetrics::compute(1, 0.2, &strokes);
        assert_eq!(metrics.key_hold_times["a"], vec![0.0]);
        assert_eq!(metrics.inter_key_intervals, vec![0.0]);
        assert!(metrics.hold_values().all(|v| v >= 0.0));
    }
}
