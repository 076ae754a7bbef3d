//! Retry orchestration.
//!
//! [`RetryOrchestrator`] wraps a plain async send function. Each physical
//! attempt first passes the optional admission gate, then the outcome is
//! classified and either returned or retried after the next backoff delay.
//!
//! # Key Types
//!
//! - [`RetryOrchestrator`] - the retry loop
//! - [`ResponseClassifier`] - tells the loop which outcomes are worth retrying
//! - [`RetryError`] - the single final failure a caller sees
//!
//! # Examples
//!
//! ```rust
//! use pacer_core::outcome::{Classification, FailureKind};
//! use pacer_core::retry::RetryOrchestrator;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let calls = Arc::new(AtomicU32::new(0));
//! let counter = Arc::clone(&calls);
//!
//! let orchestrator = RetryOrchestrator::builder(
//!     move |_request: (), _cancel: CancellationToken| {
//!         let counter = Arc::clone(&counter);
//!         async move {
//!             // 503 first, then 200.
//!             let status = if counter.fetch_add(1, Ordering::SeqCst) == 0 { 503 } else { 200 };
//!             Ok::<u16, std::io::Error>(status)
//!         }
//!     },
//!     |status: &u16| match *status {
//!         200..=299 => Classification::Success,
//!         500..=599 => Classification::Failure(FailureKind::TransientServiceFailure),
//!         _ => Classification::Failure(FailureKind::PermanentFailure),
//!     },
//! )
//! .retry_budget(2)
//! .first_retry_delay(Duration::from_millis(1))
//! .build()?;
//!
//! let status = orchestrator.send((), &CancellationToken::new()).await?;
//! assert_eq!(status, 200);
//! assert_eq!(calls.load(Ordering::SeqCst), 2);
//! # Ok(())
//! # }
//! ```

mod classifier;
mod error;
mod orchestrator;

pub use classifier::ResponseClassifier;
pub use error::RetryError;
pub use orchestrator::{RetryOrchestrator, RetryOrchestratorBuilder};
