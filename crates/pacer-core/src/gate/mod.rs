//! Sliding-window admission control.
//!
//! An admission gate bounds how many operations may *start* within any
//! trailing time window. The retry orchestrator consults a gate before every
//! physical attempt, so retries are rate limited exactly like first attempts.
//!
//! # Key Types
//!
//! - [`AdmissionGate`] - the seam the orchestrator depends on
//! - [`RateGate`] - exact sliding-window gate backed by a semaphore and a
//!   background reaper

mod rate_gate;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::error::CoreError;

pub use rate_gate::{MAX_WINDOW, RateGate};

/// Errors returned by admission gates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GateError {
    /// Bad construction or call parameters.
    #[error(transparent)]
    InvalidArgument(#[from] CoreError),

    /// The gate was used after [`AdmissionGate::dispose`].
    #[error("rate gate is already disposed")]
    Disposed,

    /// The caller's cancellation token fired while waiting for a slot.
    #[error("admission wait was cancelled")]
    Cancelled,

    /// The gate was created outside of a Tokio runtime.
    #[error("rate gate requires a running Tokio runtime")]
    NoRuntime,
}

/// Controls how many operations may start per unit of time.
///
/// Implementations must be safe to share between many concurrent callers.
/// A cancelled wait never consumes a slot.
#[async_trait]
pub trait AdmissionGate: Send + Sync {
    /// Wait until a slot is available.
    ///
    /// # Errors
    ///
    /// - [`GateError::Cancelled`] if `cancel` fires while waiting
    /// - [`GateError::Disposed`] if the gate is (or becomes) disposed
    async fn acquire(&self, cancel: &CancellationToken) -> Result<(), GateError>;

    /// Wait at most `timeout` for a slot.
    ///
    /// Returns `Ok(true)` if a slot was reserved and `Ok(false)` if the
    /// timeout elapsed first. A zero timeout performs a non-blocking check.
    async fn try_acquire_for(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<bool, GateError>;

    /// Millisecond flavour of [`try_acquire_for`](Self::try_acquire_for).
    ///
    /// `-1` waits indefinitely, `0` is a non-blocking check.
    ///
    /// # Errors
    ///
    /// [`GateError::InvalidArgument`] if `millis` is below `-1`.
    async fn try_acquire_for_millis(
        &self,
        millis: i64,
        cancel: &CancellationToken,
    ) -> Result<bool, GateError> {
        match millis {
            -1 => self.acquire(cancel).await.map(|()| true),
            m if m < -1 => Err(CoreError::invalid_argument(
                "millis",
                format!("should be >= -1, got {m}"),
            )
            .into()),
            m => self.try_acquire_for(Duration::from_millis(m as u64), cancel).await,
        }
    }

    /// Release background resources. Idempotent.
    fn dispose(&self);

    /// Whether [`dispose`](Self::dispose) has been called.
    fn is_disposed(&self) -> bool;
}
