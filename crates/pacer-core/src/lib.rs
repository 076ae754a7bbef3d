#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Resilience primitives for outbound calls.
//!
//! This crate bounds how fast a client may start requests and recovers from
//! transient failures without overwhelming the remote side:
//!
//! - **Admission control** via [`RateGate`](gate::RateGate): at most `N`
//!   operation starts in any trailing window, enforced exactly
//! - **Backoff delays** via [`delay`]: constant, exponential and
//!   decorrelated-jitter sequences
//! - **Retry orchestration** via [`RetryOrchestrator`](retry::RetryOrchestrator):
//!   wraps a plain async send function, classifies each outcome and retries
//!   transient failures
//!
//! The crate is transport-agnostic. Transports plug in a send function and a
//! [`ResponseClassifier`](retry::ResponseClassifier).
//!
//! # Examples
//!
//! ```rust
//! use pacer_core::prelude::*;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = RetryOrchestrator::builder(
//!     |request: u32, _cancel: CancellationToken| async move {
//!         Ok::<u32, std::io::Error>(request * 2)
//!     },
//!     |_: &u32| Classification::Success,
//! )
//! .retry_budget(3)
//! .rate_limit(10, Duration::from_secs(1))
//! .build()?;
//!
//! let doubled = orchestrator.send(21, &CancellationToken::new()).await?;
//! assert_eq!(doubled, 42);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod delay;
pub mod error;
pub mod gate;
pub mod outcome;
pub mod retry;

/// Convenient re-exports of commonly used items.
///
/// Import all core abstractions with:
///
/// ```rust
/// use pacer_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{RateLimitConfig, RetryConfig};
    pub use crate::delay::{DelayFactory, DelaySequence};
    pub use crate::error::CoreError;
    pub use crate::gate::{AdmissionGate, GateError, RateGate};
    pub use crate::outcome::{Classification, FailureKind};
    pub use crate::retry::{ResponseClassifier, RetryError, RetryOrchestrator};
}
