//! Shared utility functions and traits

/// Extension trait for tracking minimum and maximum values in `Option<T>`.
///
/// Works with `PartialOrd` so it covers the `f64` durations used throughout
/// the metrics; comparisons involving NaN leave the current value in place.
///
/// # Example
///
/// ```
/// use keycadence::utils::MinMaxExt;
///
/// let mut min: Option<f64> = None;
/// let mut max: Option<f64> = None;
///
/// for value in [0.12, 0.08, 0.15] {
///     min.update_min(value);
///     max.update_max(value);
/// }
/// assert_eq!(min, Some(0.08));
/// assert_eq!(max, Some(0.15));
/// ```
pub trait MinMaxExt<T: PartialOrd + Copy> {
    /// Stores `value` if it is smaller than the current minimum or if no
    /// minimum exists yet.
    fn update_min(&mut self, value: T);

    /// Stores `value` if it is larger than the current maximum or if no
    /// maximum exists yet.
    fn update_max(&mut self, value: T);
}

impl<T: PartialOrd + Copy> MinMaxExt<T> for Option<T> {
    fn update_min(&mut self, value: T) {
        if self.map_or(true, |current| value < current) {
            *self = Some(value);
        }
    }

    fn update_max(&mut self, value: T) {
        if self.map_or(true, |current| value > current) {
            *self = Some(value);
        }
    }
}

/// Format a duration in seconds the way reports print it
pub fn format_secs(secs: f64) -> String {
    format!("{:.4}s", secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_min_from_none() {
        let mut min: Option<u64> = None;
        min.update_min(100);
        assert_eq!(min, Some(100));
    }

    #[test]
    fn update_min_larger_value_unchanged() {
        let mut min: Option<u64> = Some(50);
        min.update_min(100);
        assert_eq!(min, Some(50));
    }

    #[test]
    fn update_max_smaller_value_unchanged() {
        let mut max: Option<u64> = Some(200);
        max.update_max(100);
        assert_eq!(max, Some(200));
    }

    #[test]
    fn update_min_max_sequence_f64() {
        let mut min: Option<f64> = None;
        let mut max: Option<f64> = None;

        for value in [0.5, 0.3, 0.7, 0.2, 0.8, 0.4] {
            min.update_min(value);
            max.update_max(value);
        }

        assert_eq!(min, Some(0.2));
        assert_eq!(max, Some(0.8));
    }

    #[test]
    fn nan_does_not_replace_value() {
        let mut min = Some(0.1);
        min.update_min(f64::NAN);
        assert_eq!(min, Some(0.1));
    }

    #[test]
    fn format_secs_uses_four_decimals() {
        assert_eq!(format_secs(0.12345), "0.1235s");
        assert_eq!(format_secs(2.0), "2.0000s");
    }
}
