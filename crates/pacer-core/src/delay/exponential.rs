use std::iter::FusedIterator;
use std::time::Duration;

use crate::error::{CoreError, Result};

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Sequence growing geometrically from a first delay.
///
/// Term `i` is `first_delay * factor^i`, rounded to the nearest nanosecond
/// and saturated at [`Duration::MAX`]. The first term is `first_delay`
/// itself, as is every term when `factor` is exactly 1.
#[derive(Debug, Clone)]
pub struct Exponential {
    first_delay: Duration,
    factor: f64,
    index: usize,
    count: usize,
}

impl Exponential {
    pub(super) fn new(first_delay: Duration, count: usize, factor: f64) -> Result<Self> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(CoreError::invalid_argument(
                "factor",
                format!("should be a finite number > 0, got {factor}"),
            ));
        }

        Ok(Self {
            first_delay,
            factor,
            index: 0,
            count,
        })
    }

    fn term(&self, index: usize) -> Duration {
        if index == 0 || self.factor == 1.0 {
            return self.first_delay;
        }

        let exponent = i32::try_from(index).unwrap_or(i32::MAX);
        let nanos = self.first_delay.as_nanos() as f64 * self.factor.powi(exponent);

        if !nanos.is_finite() || nanos >= Duration::MAX.as_nanos() as f64 {
            return Duration::MAX;
        }

        let nanos = (nanos.round() as u128).min(Duration::MAX.as_nanos());
        Duration::new(
            (nanos / NANOS_PER_SEC) as u64,
            (nanos % NANOS_PER_SEC) as u32,
        )
    }
}

impl Iterator for Exponential {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.index >= self.count {
            return None;
        }
        let delay = self.term(self.index);
        self.index += 1;
        Some(delay)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Exponential {}

impl FusedIterator for Exponential {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubling() {
        let delays: Vec<_> = Exponential::new(Duration::from_millis(100), 4, 2.0)
            .unwrap()
            .collect();

        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
            ]
        );
    }

    #[test]
    fn test_fractional_factor() {
        let delays: Vec<_> = Exponential::new(Duration::from_secs(1), 3, 0.5)
            .unwrap()
            .collect();

        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_millis(500),
                Duration::from_millis(250),
            ]
        );
    }

    #[test]
    fn test_rejects_non_positive_factor() {
        for factor in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = Exponential::new(Duration::from_secs(1), 3, factor).unwrap_err();
            assert!(err.is_invalid_argument(), "factor {factor} accepted");
        }
    }

    #[test]
    fn test_saturates_instead_of_overflowing() {
        let last = Exponential::new(Duration::from_secs(u64::MAX / 2), 3, 10.0)
            .unwrap()
            .last()
            .unwrap();

        assert_eq!(last, Duration::MAX);
    }

    #[test]
    fn test_first_term_is_exact() {
        let first = Duration::new(10_000_000, 1);

        let mut doubling = Exponential::new(first, 2, 2.0).unwrap();
        assert_eq!(doubling.next(), Some(first));

        let flat: Vec<_> = Exponential::new(first, 3, 1.0).unwrap().collect();
        assert_eq!(flat, vec![first; 3]);
    }

    #[test]
    fn test_zero_count_is_empty() {
        let delays = Exponential::new(Duration::from_secs(1), 0, 2.0).unwrap();
        assert_eq!(delays.len(), 0);
    }
}
