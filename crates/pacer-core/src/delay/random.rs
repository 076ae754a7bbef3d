//! Uniform random source for jitter draws.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{LazyLock, Mutex, PoisonError};

/// Process-wide source used by every unseeded jitter sequence.
static SHARED: LazyLock<Mutex<StdRng>> = LazyLock::new(|| Mutex::new(StdRng::from_entropy()));

/// Either the shared source or a private seeded one.
#[derive(Debug)]
pub(super) enum JitterSource {
    Shared,
    Seeded(Box<StdRng>),
}

impl JitterSource {
    pub(super) fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::Seeded(Box::new(StdRng::seed_from_u64(seed))),
            None => Self::Shared,
        }
    }

    /// Uniform draw from `[0, 1)`.
    pub(super) fn next_f64(&mut self) -> f64 {
        match self {
            // Draws are serialized; a panic while holding the lock leaves the
            // generator state intact, so the poison flag is ignored.
            Self::Shared => SHARED
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .r#gen::<f64>(),
            Self::Seeded(rng) => rng.r#gen::<f64>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draws_are_in_unit_interval() {
        let mut source = JitterSource::new(None);
        for _ in 0..1000 {
            let u = source.next_f64();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn test_same_seed_same_draws() {
        let mut a = JitterSource::new(Some(7));
        let mut b = JitterSource::new(Some(7));
        for _ in 0..16 {
            assert_eq!(a.next_f64(), b.next_f64());
        }
    }

    #[test]
    fn test_shared_source_under_contention() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    let mut source = JitterSource::new(None);
                    (0..500).map(|_| source.next_f64()).collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            let draws = handle.join().unwrap();
            assert!(draws.iter().all(|u| (0.0..1.0).contains(u)));
        }
    }
}
