use std::iter::FusedIterator;
use std::time::Duration;

/// Sequence yielding the same delay a fixed number of times.
#[derive(Debug, Clone)]
pub struct Constant {
    delay: Duration,
    remaining: usize,
}

impl Constant {
    pub(super) fn new(delay: Duration, count: usize) -> Self {
        Self {
            delay,
            remaining: count,
        }
    }
}

impl Iterator for Constant {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.delay)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Constant {}

impl FusedIterator for Constant {}
