//! Backoff delay sequences.
//!
//! Every factory returns a lazy, finite, single-pass iterator of
//! [`Duration`]s. A sequence is built once per logical call and consumed by
//! the retry loop; a new call builds a new sequence, so no cursor is ever
//! shared between calls.
//!
//! # Examples
//!
//! ```rust
//! use pacer_core::delay;
//! use std::time::Duration;
//!
//! let delays: Vec<_> = delay::exponential(Duration::from_millis(100), 3, 2.0)
//!     .unwrap()
//!     .collect();
//!
//! assert_eq!(
//!     delays,
//!     vec![
//!         Duration::from_millis(100),
//!         Duration::from_millis(200),
//!         Duration::from_millis(400),
//!     ]
//! );
//! ```

mod constant;
mod exponential;
mod jitter;
mod random;

use std::sync::Arc;
use std::time::Duration;

pub use constant::Constant;
pub use exponential::Exponential;
pub use jitter::DecorrelatedJitter;

use crate::error::Result;

/// A boxed, sendable delay sequence.
pub type DelaySequence = Box<dyn Iterator<Item = Duration> + Send>;

/// Builds a fresh [`DelaySequence`] for each logical call.
pub type DelayFactory = Arc<dyn Fn() -> DelaySequence + Send + Sync>;

/// `count` repetitions of `delay`.
///
/// ```rust
/// use pacer_core::delay;
/// use std::time::Duration;
///
/// let delays: Vec<_> = delay::constant(Duration::from_secs(1), 2).collect();
/// assert_eq!(delays, vec![Duration::from_secs(1); 2]);
/// ```
pub fn constant(delay: Duration, count: usize) -> Constant {
    Constant::new(delay, count)
}

/// `first_delay, first_delay * factor, first_delay * factor^2, ...` for
/// `count` terms.
///
/// # Errors
///
/// Returns [`CoreError::InvalidArgument`](crate::error::CoreError::InvalidArgument)
/// if `factor` is not a finite number greater than zero.
pub fn exponential(first_delay: Duration, count: usize, factor: f64) -> Result<Exponential> {
    Exponential::new(first_delay, count, factor)
}

/// Randomized, bounded-growth backoff that de-synchronizes competing callers.
///
/// When `seed` is `None` draws come from a process-wide source shared by all
/// callers; a seed gives the sequence a private, reproducible source. With
/// `fast_first` the first element is exactly zero and counts towards `count`.
pub fn decorrelated_jitter(
    median_first_delay: Duration,
    count: usize,
    seed: Option<u64>,
    fast_first: bool,
) -> DecorrelatedJitter {
    DecorrelatedJitter::new(median_first_delay, count, seed, fast_first)
}

/// Wraps a closure into a [`DelayFactory`].
///
/// ```rust
/// use pacer_core::delay::{self, DelayFactory};
/// use std::time::Duration;
///
/// let factory: DelayFactory =
///     delay::factory(|| Box::new(delay::constant(Duration::from_millis(10), 3)));
/// assert_eq!(factory().count(), 3);
/// assert_eq!(factory().count(), 3);
/// ```
pub fn factory<F>(f: F) -> DelayFactory
where
    F: Fn() -> DelaySequence + Send + Sync + 'static,
{
    Arc::new(f)
}
