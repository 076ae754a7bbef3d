use std::iter::FusedIterator;
use std::time::Duration;

use super::random::JitterSource;

/// Empirical scaling that makes the median of the first delay land near the
/// requested value.
const SCALE: f64 = 0.714_285_714_285_714_3;

/// Arithmetic is carried out in 100 ns ticks.
const NANOS_PER_TICK: u64 = 100;
const TICKS_PER_SEC: i64 = 10_000_000;

/// Upper bound for a single delay, in ticks.
const MAX_TICKS: f64 = i64::MAX as f64 - 1000.0;

/// Decorrelated-jitter backoff sequence.
///
/// For index `i` a uniform `u` is drawn and `x = i + u`. The curve
/// `2^x * tanh(sqrt(4x))` is sampled and each delay is the increase over the
/// previous sample, scaled by `5/7` of the median first delay. The curve grows
/// roughly exponentially while the random offset keeps independent callers
/// from retrying in lockstep.
#[derive(Debug)]
pub struct DecorrelatedJitter {
    median_ticks: f64,
    index: usize,
    count: usize,
    fast_first: bool,
    previous: f64,
    source: JitterSource,
}

impl DecorrelatedJitter {
    pub(super) fn new(
        median_first_delay: Duration,
        count: usize,
        seed: Option<u64>,
        fast_first: bool,
    ) -> Self {
        Self {
            median_ticks: (median_first_delay.as_nanos() / NANOS_PER_TICK as u128) as f64,
            index: 0,
            count,
            fast_first,
            previous: 0.0,
            source: JitterSource::new(seed),
        }
    }
}

impl Iterator for DecorrelatedJitter {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.index >= self.count {
            return None;
        }

        let index = self.index;
        self.index += 1;

        if index == 0 && self.fast_first {
            return Some(Duration::ZERO);
        }

        let x = index as f64 + self.source.next_f64();
        let curve = 2f64.powf(x) * (4.0 * x).sqrt().tanh();
        let ticks = ((curve - self.previous) * SCALE * self.median_ticks)
            .min(MAX_TICKS)
            .max(0.0);
        self.previous = curve;

        Some(from_ticks(ticks as i64))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DecorrelatedJitter {}

impl FusedIterator for DecorrelatedJitter {}

fn from_ticks(ticks: i64) -> Duration {
    let ticks = ticks.max(0);
    Duration::new(
        (ticks / TICKS_PER_SEC) as u64,
        ((ticks % TICKS_PER_SEC) as u64 * NANOS_PER_TICK) as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_is_five_sevenths() {
        assert_eq!(SCALE, 5.0 / 7.0);
    }

    #[test]
    fn test_from_ticks() {
        assert_eq!(from_ticks(0), Duration::ZERO);
        assert_eq!(from_ticks(1), Duration::from_nanos(100));
        assert_eq!(from_ticks(10_000_000), Duration::from_secs(1));
        assert_eq!(from_ticks(15_000_001), Duration::new(1, 500_000_100));
    }

    #[test]
    fn test_fast_first_consumes_a_slot() {
        let delays: Vec<_> =
            DecorrelatedJitter::new(Duration::from_millis(100), 3, Some(1), true).collect();

        assert_eq!(delays.len(), 3);
        assert_eq!(delays[0], Duration::ZERO);
        assert!(delays[1..].iter().all(|d| *d > Duration::ZERO));
    }

    #[test]
    fn test_zero_median_yields_zero_delays() {
        let delays: Vec<_> = DecorrelatedJitter::new(Duration::ZERO, 5, None, false).collect();
        assert_eq!(delays, vec![Duration::ZERO; 5]);
    }

    #[test]
    fn test_first_delay_is_bounded_by_median_scale() {
        // x in [0, 1): curve(1) = 2 * tanh(2) ~ 1.93, so the first delay stays
        // below ~1.38 * median.
        for seed in 0..64 {
            let first = DecorrelatedJitter::new(Duration::from_secs(1), 1, Some(seed), false)
                .next()
                .unwrap();
            assert!(first < Duration::from_millis(1400), "seed {seed}: {first:?}");
        }
    }

    #[test]
    fn test_huge_median_is_capped() {
        let delays: Vec<_> =
            DecorrelatedJitter::new(Duration::from_secs(u64::MAX / 4), 40, Some(3), false)
                .collect();

        let cap = from_ticks(MAX_TICKS as i64);
        assert!(delays.iter().all(|d| *d <= cap));
    }
}
