//! Session-wide descriptive statistics

use super::RoundMetrics;
use crate::utils::MinMaxExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Count, mean, sample standard deviation and range of a set of durations
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Bessel-corrected; 0.0 when fewer than two values
    pub stdev: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    /// Summarize values; an empty input gives zero count and zero statistics
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let values: Vec<f64> = values.into_iter().collect();
        let count = values.len();
        if count == 0 {
            return Self::default();
        }

        let mut min: Option<f64> = None;
        let mut max: Option<f64> = None;
        for &value in &values {
            min.update_min(value);
            max.update_max(value);
        }

        let mean = values.iter().sum::<f64>() / count as f64;
        let stdev = if count < 2 {
            0.0
        } else {
            let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (squares / (count - 1) as f64).sqrt()
        };

        Self {
            count,
            mean,
            stdev,
            min: min.unwrap_or(0.0),
            max: max.unwrap_or(0.0),
        }
    }
}

/// Statistics folded over every completed round of a session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionAggregate {
    /// All inter-key intervals from all rounds
    pub inter_key_intervals: Summary,
    /// All hold durations from all rounds and keys
    pub key_hold_times: Summary,
    /// Hold durations broken out per key label
    pub key_hold_times_by_key: BTreeMap<String, Summary>,
}

impl SessionAggregate {
    pub fn from_rounds(rounds: &[RoundMetrics]) -> Self {
        let inter_key_intervals = Summary::from_values(
            rounds
                .iter()
                .flat_map(|round| round.inter_key_intervals.iter().copied()),
        );
        let key_hold_times = Summary::from_values(rounds.iter().flat_map(|r| r.hold_values()));

        let mut per_key: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for round in rounds {
            for (key, holds) in &round.key_hold_times {
                per_key.entry(key.as_str()).or_default().extend(holds);
            }
        }
        let key_hold_times_by_key = per_key
            .into_iter()
            .map(|(key, holds)| (key.to_string(), Summary::from_values(holds)))
            .collect();

        Self {
            inter_key_intervals,
            key_hold_times,
            key_hold_times_by_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::test_helpers::assert_close;
    use crate::keyboard::KeyStroke;

    #[test]
    fn sample_stdev_uses_bessel_correction() {
        let summary = Summary::from_values([0.10, 0.12, 0.14]);
        assert_eq!(summary.count, 3);
        assert_close(summary.mean, 0.12);
        assert_close(summary.stdev, 0.02);
        assert_close(summary.min, 0.10);
        assert_close(summary.max, 0.14);
    }

    #[test]
    fn stdev_is_zero_below_two_values() {
        assert_eq!(Summary::from_values([0.3]).stdev, 0.0);
        assert_eq!(Summary::from_values([0.3]).mean, 0.3);
        assert_eq!(Summary::from_values(Vec::new()), Summary::default());
    }

    #[test]
    fn empty_session_yields_zero_statistics() {
        let aggregate = SessionAggregate::from_rounds(&[]);
        assert_eq!(aggregate.inter_key_intervals.count, 0);
        assert_eq!(aggregate.key_hold_times.mean, 0.0);
        assert!(aggregate.key_hold_times_by_key.is_empty());
    }

    #[test]
    fn interval_count_sums_strokes_minus_one_per_round() {
        let round = |index, n: usize| {
            let strokes: Vec<KeyStroke> = (0..n)
                .map(|i| KeyStroke::new("k", i as f64 * 0.2, i as f64 * 0.2 + 0.05))
                .collect();
            RoundMetrics::compute(index, 1.0, &strokes)
        };
        let rounds = vec![round(1, 5), round(2, 1), round(3, 0), round(4, 3)];
        let aggregate = SessionAggregate::from_rounds(&rounds);

        assert_eq!(aggregate.inter_key_intervals.count, 4 + 0 + 0 + 2);
        assert_eq!(aggregate.key_hold_times.count, 9);
    }

    #[test]
    fn holds_collapse_across_keys_and_rounds() {
        let first = RoundMetrics::compute(
            1,
            0.3,
            &[KeyStroke::new("a", 0.0, 0.10), KeyStroke::new("b", 0.2, 0.32)],
        );
        let second = RoundMetrics::compute(2, 0.14, &[KeyStroke::new("a", 0.0, 0.14)]);
        let aggregate = SessionAggregate::from_rounds(&[first, second]);

        assert_eq!(aggregate.key_hold_times.count, 3);
        assert_close(aggregate.key_hold_times.mean, 0.12);
        assert_close(aggregate.key_hold_times.stdev, 0.02);

        let a = aggregate.key_hold_times_by_key["a"];
        assert_eq!(a.count, 2);
        assert_close(a.mean, 0.12);
        assert_eq!(aggregate.key_hold_times_by_key["b"].count, 1);
    }
}
