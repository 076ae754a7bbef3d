//! Exact sliding-window rate gate.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, SemaphorePermit, TryAcquireError};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{AdmissionGate, GateError};
use crate::error::CoreError;

/// Longest accepted window (exclusive): `2^32 - 1` milliseconds.
pub const MAX_WINDOW: Duration = Duration::from_millis(u32::MAX as u64);

/// Admits at most `capacity` operation starts within any trailing `window`.
///
/// Every granted slot is returned to the pool exactly one window after it was
/// granted, so the limit holds for every window position rather than on
/// average. Admission order among concurrent waiters is not FIFO.
///
/// A background task (the reaper) sleeps until the earliest pending release,
/// returns every expired slot and reschedules itself. The gate is disposed on
/// drop.
///
/// # Examples
///
/// ```rust
/// use pacer_core::gate::{AdmissionGate, RateGate};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let gate = RateGate::new(2, Duration::from_millis(200))?;
/// let cancel = CancellationToken::new();
///
/// gate.acquire(&cancel).await?;
/// gate.acquire(&cancel).await?;
///
/// // Third start inside the same window is refused by a non-blocking check.
/// assert!(!gate.try_acquire_for(Duration::ZERO, &cancel).await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RateGate {
    state: Arc<GateState>,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug)]
struct GateState {
    capacity: usize,
    window: Duration,
    semaphore: Semaphore,
    /// Release instants, oldest first.
    releases: Mutex<VecDeque<Instant>>,
    disposed: AtomicBool,
    shutdown: CancellationToken,
}

impl RateGate {
    /// Create a gate admitting `capacity` starts per `window`.
    ///
    /// Must be called from within a Tokio runtime, which hosts the reaper.
    ///
    /// # Errors
    ///
    /// - [`GateError::InvalidArgument`] if `capacity` is zero or above
    ///   [`Semaphore::MAX_PERMITS`], or `window` is zero or not below
    ///   [`MAX_WINDOW`]
    /// - [`GateError::NoRuntime`] outside a Tokio runtime
    pub fn new(capacity: usize, window: Duration) -> Result<Self, GateError> {
        if capacity == 0 {
            return Err(CoreError::invalid_argument(
                "capacity",
                "number of occurrences must be a positive integer",
            )
            .into());
        }
        if capacity > Semaphore::MAX_PERMITS {
            return Err(CoreError::invalid_argument(
                "capacity",
                format!("must not exceed {}", Semaphore::MAX_PERMITS),
            )
            .into());
        }
        if window.is_zero() {
            return Err(CoreError::invalid_argument(
                "window",
                "time window must be a positive span of time",
            )
            .into());
        }
        if window >= MAX_WINDOW {
            return Err(CoreError::invalid_argument(
                "window",
                "time window must be less than 2^32 milliseconds",
            )
            .into());
        }

        let runtime = Handle::try_current().map_err(|_| GateError::NoRuntime)?;

        let state = Arc::new(GateState {
            capacity,
            window,
            semaphore: Semaphore::new(capacity),
            releases: Mutex::new(VecDeque::new()),
            disposed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        });

        let reaper = runtime.spawn(reap(
            Arc::downgrade(&state),
            state.shutdown.clone(),
            window,
        ));

        debug!("Created rate gate: {} per {:?}", capacity, window);

        Ok(Self {
            state,
            reaper: Mutex::new(Some(reaper)),
        })
    }

    /// Maximum number of starts per window.
    pub fn capacity(&self) -> usize {
        self.state.capacity
    }

    /// Length of the sliding window.
    pub fn window(&self) -> Duration {
        self.state.window
    }

    /// Slots that can be granted right now.
    pub fn available_slots(&self) -> usize {
        self.state.semaphore.available_permits()
    }

    /// Granted slots still waiting to be returned.
    pub fn pending_releases(&self) -> usize {
        self.state.releases().len()
    }

    async fn acquire_within(
        &self,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<bool, GateError> {
        self.check_disposed()?;
        if cancel.is_cancelled() {
            return Err(GateError::Cancelled);
        }

        let semaphore = &self.state.semaphore;
        let permit = match timeout {
            Some(timeout) if timeout.is_zero() => match semaphore.try_acquire() {
                Ok(permit) => permit,
                Err(TryAcquireError::NoPermits) => return Ok(false),
                Err(TryAcquireError::Closed) => return Err(GateError::Disposed),
            },
            Some(timeout) => tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GateError::Cancelled),
                acquired = tokio::time::timeout(timeout, semaphore.acquire()) => match acquired {
                    Ok(Ok(permit)) => permit,
                    Ok(Err(_)) => return Err(GateError::Disposed),
                    Err(_) => return Ok(false),
                },
            },
            None => tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GateError::Cancelled),
                acquired = semaphore.acquire() => acquired.map_err(|_| GateError::Disposed)?,
            },
        };

        self.state.reserve(permit);
        Ok(true)
    }

    fn check_disposed(&self) -> Result<(), GateError> {
        if self.state.disposed.load(Ordering::Acquire) {
            Err(GateError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl GateState {
    fn releases(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        self.releases.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Turn a granted permit into a pending release one window from now.
    fn reserve(&self, permit: SemaphorePermit<'_>) {
        let mut releases = self.releases();
        permit.forget();
        let release_at = Instant::now() + self.window;
        releases.push_back(release_at);
        debug!(
            "Admitted by rate gate ({} slots left, {} pending)",
            self.semaphore.available_permits(),
            releases.len()
        );
    }

    /// Return every expired slot and report how long to sleep until the next
    /// release is due.
    fn release_expired(&self, now: Instant) -> Duration {
        let mut releases = self.releases();

        let mut expired = 0;
        while releases.front().is_some_and(|due| *due <= now) {
            releases.pop_front();
            expired += 1;
        }

        if expired > 0 {
            self.semaphore.add_permits(expired);
            debug!("Rate gate released {} slots", expired);
        }

        match releases.front() {
            Some(due) => due.saturating_duration_since(now).min(self.window),
            None => self.window,
        }
    }
}

/// Reaper loop. Exits quietly once the gate is disposed or dropped.
async fn reap(state: Weak<GateState>, shutdown: CancellationToken, window: Duration) {
    let mut next_check = window;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(next_check) => {}
        }

        let Some(state) = state.upgrade() else {
            break;
        };
        if state.disposed.load(Ordering::Acquire) {
            break;
        }
        next_check = state.release_expired(Instant::now());
        trace!("Rate gate reaper sleeping for {:?}", next_check);
    }
    trace!("Rate gate reaper stopped");
}

#[async_trait]
impl AdmissionGate for RateGate {
    async fn acquire(&self, cancel: &CancellationToken) -> Result<(), GateError> {
        self.acquire_within(None, cancel).await.map(|_| ())
    }

    async fn try_acquire_for(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<bool, GateError> {
        self.acquire_within(Some(timeout), cancel).await
    }

    fn dispose(&self) {
        if self.state.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        // Wakes every suspended waiter with `Disposed`.
        self.state.semaphore.close();
        self.state.shutdown.cancel();
        drop(
            self.reaper
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        debug!("Disposed rate gate");
    }

    fn is_disposed(&self) -> bool {
        self.state.disposed.load(Ordering::Acquire)
    }
}

impl Drop for RateGate {
    fn drop(&mut self) {
        self.dispose();
    }
}
