use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ResponseClassifier, RetryError};
use crate::config::{RateLimitConfig, RetryConfig};
use crate::delay::{DelayFactory, DelaySequence};
use crate::gate::{AdmissionGate, GateError, RateGate};

/// Executes a wrapped send operation with admission control and
/// retry-on-transient-failure.
///
/// Per call the loop is:
///
/// ```text
/// Ready -> Sending -> Success (terminal)
///                  -> Evaluating -> Terminal (return outcome)
///                                -> Waiting -> Sending
/// ```
///
/// The wrapped operation runs at most `1 + retry_budget` times. Two failure
/// channels are distinguished:
///
/// - **transport failures** (the send returned `Err`) are retried only when
///   `retry_on_transport_failure` is set and the classifier agrees
/// - **response failures** (the send returned a response the classifier marks
///   as transient) are retried while budget remains; the last response is
///   returned as-is once it runs out
///
/// Cancellation is honoured before every attempt, while waiting for
/// admission and while sleeping between attempts. The in-flight send receives
/// the token and is responsible for its own cancellation.
pub struct RetryOrchestrator<S, C> {
    send: S,
    classifier: C,
    retry_budget: u32,
    retry_on_transport_failure: bool,
    first_retry_delay: Duration,
    delays: Option<DelayFactory>,
    gate: Option<Arc<dyn AdmissionGate>>,
    owns_gate: bool,
    disposed: AtomicBool,
}

/// What a failed attempt left behind.
enum Failed<R, E> {
    Response(R),
    Transport(E),
}

impl<R, E> Failed<R, E> {
    fn into_final(self) -> Result<R, RetryError<E>> {
        match self {
            Self::Response(response) => Ok(response),
            Self::Transport(err) => Err(RetryError::Transport(err)),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Response(_) => "retryable response",
            Self::Transport(_) => "transport failure",
        }
    }
}

impl<S, C> RetryOrchestrator<S, C> {
    /// Start configuring an orchestrator around `send`, judged by
    /// `classifier`.
    pub fn builder(send: S, classifier: C) -> RetryOrchestratorBuilder<S, C> {
        RetryOrchestratorBuilder {
            send,
            classifier,
            config: RetryConfig::default(),
            gate: None,
            delays: None,
        }
    }

    /// Maximum number of retries after the first attempt.
    pub fn retry_budget(&self) -> u32 {
        self.retry_budget
    }

    /// Whether transport failures are retried.
    pub fn retries_transport_failures(&self) -> bool {
        self.retry_on_transport_failure
    }

    /// The admission gate consulted before every attempt, if any.
    pub fn rate_gate(&self) -> Option<&Arc<dyn AdmissionGate>> {
        self.gate.as_ref()
    }

    /// Send `request`, retrying transient failures.
    ///
    /// Returns the first non-retryable response, or the last response once
    /// the budget is exhausted.
    ///
    /// # Errors
    ///
    /// - [`RetryError::Transport`] with the last transport error
    /// - [`RetryError::Cancelled`] if `cancel` fires at a suspension point
    /// - [`RetryError::Disposed`] after [`dispose`](Self::dispose), or if the
    ///   gate was disposed
    pub async fn send<Req, Resp, E, Fut>(
        &self,
        request: Req,
        cancel: &CancellationToken,
    ) -> Result<Resp, RetryError<E>>
    where
        S: Fn(Req, CancellationToken) -> Fut,
        Fut: Future<Output = Result<Resp, E>>,
        C: ResponseClassifier<Resp, E>,
        Req: Clone,
    {
        let mut remaining = self.retry_budget;
        let mut delays: Option<DelaySequence> = None;
        let mut attempt: u32 = 0;

        loop {
            if self.is_disposed() {
                return Err(RetryError::Disposed);
            }
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }

            if let Some(gate) = &self.gate {
                gate.acquire(cancel).await?;
            }

            attempt += 1;
            debug!("Sending attempt {} ({} retries left)", attempt, remaining);

            let failed = match (self.send)(request.clone(), cancel.clone()).await {
                Ok(response) => {
                    let classification = self.classifier.classify(&response);
                    if !classification.is_retryable() {
                        debug!("Attempt {} finished: {:?}", attempt, classification);
                        return Ok(response);
                    }
                    Failed::Response(response)
                }
                Err(err) => {
                    if !self.retry_on_transport_failure || !self.classifier.is_retryable_error(&err)
                    {
                        debug!("Attempt {} failed with a non-retryable transport error", attempt);
                        return Err(RetryError::Transport(err));
                    }
                    Failed::Transport(err)
                }
            };

            if remaining == 0 {
                warn!(
                    "Retry budget exhausted after {} attempts, returning last {}",
                    attempt,
                    failed.describe()
                );
                return failed.into_final();
            }

            let sequence = delays.get_or_insert_with(|| self.delay_sequence());
            let Some(delay) = sequence.next() else {
                warn!(
                    "Delay sequence exhausted after {} attempts, returning last {}",
                    attempt,
                    failed.describe()
                );
                return failed.into_final();
            };

            remaining -= 1;
            debug!(
                "Attempt {} ended with {}, retrying in {:?}",
                attempt,
                failed.describe(),
                delay
            );
            drop(failed);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Release the owned admission gate. Idempotent.
    ///
    /// Gates handed in with
    /// [`shared_rate_gate`](RetryOrchestratorBuilder::shared_rate_gate) are
    /// left untouched. Later calls to [`send`](Self::send) fail with
    /// [`RetryError::Disposed`].
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.owns_gate
            && let Some(gate) = &self.gate
        {
            gate.dispose();
        }
        debug!("Disposed retry orchestrator");
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn delay_sequence(&self) -> DelaySequence {
        match &self.delays {
            Some(factory) => factory(),
            None => Box::new(crate::delay::decorrelated_jitter(
                self.first_retry_delay,
                self.retry_budget as usize,
                None,
                false,
            )),
        }
    }
}

impl<S, C> Drop for RetryOrchestrator<S, C> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<S, C> std::fmt::Debug for RetryOrchestrator<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryOrchestrator")
            .field("retry_budget", &self.retry_budget)
            .field("retry_on_transport_failure", &self.retry_on_transport_failure)
            .field("first_retry_delay", &self.first_retry_delay)
            .field("custom_delays", &self.delays.is_some())
            .field("rate_gate", &self.gate.is_some())
            .field("owns_gate", &self.owns_gate)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Builder for [`RetryOrchestrator`].
///
/// Unset values come from [`RetryConfig::default`].
pub struct RetryOrchestratorBuilder<S, C> {
    send: S,
    classifier: C,
    config: RetryConfig,
    gate: Option<(Arc<dyn AdmissionGate>, bool)>,
    delays: Option<DelayFactory>,
}

impl<S, C> RetryOrchestratorBuilder<S, C> {
    /// Replace all retry settings at once.
    ///
    /// A `rate_limit` in the config creates an owned [`RateGate`] at build
    /// time unless a gate was set explicitly.
    pub fn config(mut self, config: RetryConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the maximum number of retries after the first attempt.
    ///
    /// Default: 3
    pub fn retry_budget(mut self, retry_budget: u32) -> Self {
        self.config.retry_budget = retry_budget;
        self
    }

    /// Retry failures to produce a response.
    ///
    /// Default: false
    pub fn retry_on_transport_failure(mut self, enabled: bool) -> Self {
        self.config.retry_on_transport_failure = enabled;
        self
    }

    /// Median delay before the first retry, used by the default
    /// decorrelated-jitter sequence.
    ///
    /// Default: 100ms
    pub fn first_retry_delay(mut self, delay: Duration) -> Self {
        self.config.first_retry_delay = delay;
        self
    }

    /// Limit attempts to `capacity` starts per `window` with an owned
    /// [`RateGate`] created at build time.
    pub fn rate_limit(mut self, capacity: usize, window: Duration) -> Self {
        self.config.rate_limit = Some(RateLimitConfig::new(capacity, window));
        self
    }

    /// Hand over a gate; it is disposed together with the orchestrator.
    pub fn rate_gate(mut self, gate: impl AdmissionGate + 'static) -> Self {
        self.gate = Some((Arc::new(gate), true));
        self
    }

    /// Use a gate shared with other callers; it is never disposed by the
    /// orchestrator.
    pub fn shared_rate_gate(mut self, gate: Arc<dyn AdmissionGate>) -> Self {
        self.gate = Some((gate, false));
        self
    }

    /// Replace the default decorrelated-jitter delays. The factory is called
    /// once per logical call.
    pub fn retry_delays(mut self, factory: DelayFactory) -> Self {
        self.delays = Some(factory);
        self
    }

    /// Build the orchestrator.
    ///
    /// # Errors
    ///
    /// Fails when a configured `rate_limit` cannot be turned into a
    /// [`RateGate`] (bad parameters, or no Tokio runtime).
    pub fn build(self) -> Result<RetryOrchestrator<S, C>, GateError> {
        let (gate, owns_gate) = match (self.gate, &self.config.rate_limit) {
            (Some((gate, owned)), _) => (Some(gate), owned),
            (None, Some(limit)) => {
                let gate: Arc<dyn AdmissionGate> =
                    Arc::new(RateGate::new(limit.capacity, limit.window)?);
                (Some(gate), true)
            }
            (None, None) => (None, false),
        };

        Ok(RetryOrchestrator {
            send: self.send,
            classifier: self.classifier,
            retry_budget: self.config.retry_budget,
            retry_on_transport_failure: self.config.retry_on_transport_failure,
            first_retry_delay: self.config.first_retry_delay,
            delays: self.delays,
            gate,
            owns_gate,
            disposed: AtomicBool::new(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay;
    use crate::outcome::{Classification, FailureKind};
    use std::sync::atomic::AtomicU32;

    fn by_status(status: &u16) -> Classification {
        match *status {
            200..=299 => Classification::Success,
            408 | 429 | 500..=599 => Classification::Failure(FailureKind::TransientServiceFailure),
            _ => Classification::Failure(FailureKind::PermanentFailure),
        }
    }

    fn no_delays() -> DelayFactory {
        delay::factory(|| Box::new(delay::constant(Duration::ZERO, usize::MAX)))
    }

    #[tokio::test]
    async fn test_budget_is_decremented_per_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let orchestrator = RetryOrchestrator::builder(
            move |_: (), _: CancellationToken| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<u16, std::io::Error>(503)
                }
            },
            by_status,
        )
        .retry_budget(2)
        .retry_delays(no_delays())
        .build()
        .unwrap();

        let status = orchestrator.send((), &CancellationToken::new()).await.unwrap();

        assert_eq!(status, 503);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_default_delays_follow_config() {
        let orchestrator = RetryOrchestrator::builder(
            |_: (), _: CancellationToken| async { Ok::<u16, std::io::Error>(200) },
            by_status,
        )
        .config(RetryConfig {
            retry_budget: 4,
            first_retry_delay: Duration::from_millis(50),
            ..Default::default()
        })
        .build()
        .unwrap();

        let delays: Vec<_> = orchestrator.delay_sequence().collect();
        assert_eq!(delays.len(), 4);
        assert!(delays.iter().all(|d| *d < Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_short_delay_sequence_ends_retries_early() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let orchestrator = RetryOrchestrator::builder(
            move |_: (), _: CancellationToken| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<u16, std::io::Error>(500)
                }
            },
            by_status,
        )
        .retry_budget(5)
        .retry_delays(delay::factory(|| {
            Box::new(delay::constant(Duration::from_millis(1), 1))
        }))
        .build()
        .unwrap();

        let status = orchestrator.send((), &CancellationToken::new()).await.unwrap();

        assert_eq!(status, 500);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_delay_factory_called_once_per_call() {
        let built = Arc::new(AtomicU32::new(0));
        let built_counter = Arc::clone(&built);

        let orchestrator = RetryOrchestrator::builder(
            |_: (), _: CancellationToken| async { Ok::<u16, std::io::Error>(500) },
            by_status,
        )
        .retry_budget(3)
        .retry_delays(delay::factory(move || {
            built_counter.fetch_add(1, Ordering::SeqCst);
            Box::new(delay::constant(Duration::ZERO, 3))
        }))
        .build()
        .unwrap();

        let cancel = CancellationToken::new();
        orchestrator.send((), &cancel).await.unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);

        orchestrator.send((), &cancel).await.unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_first_success_never_builds_delays() {
        let built = Arc::new(AtomicU32::new(0));
        let built_counter = Arc::clone(&built);

        let orchestrator = RetryOrchestrator::builder(
            |_: (), _: CancellationToken| async { Ok::<u16, std::io::Error>(200) },
            by_status,
        )
        .retry_delays(delay::factory(move || {
            built_counter.fetch_add(1, Ordering::SeqCst);
            Box::new(delay::constant(Duration::ZERO, 3))
        }))
        .build()
        .unwrap();

        orchestrator.send((), &CancellationToken::new()).await.unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_classifier_can_refuse_transport_retries() {
        struct TimeoutsOnly;

        impl ResponseClassifier<u16, std::io::Error> for TimeoutsOnly {
            fn classify(&self, status: &u16) -> Classification {
                by_status(status)
            }

            fn is_retryable_error(&self, error: &std::io::Error) -> bool {
                error.kind() == std::io::ErrorKind::TimedOut
            }
        }

        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let orchestrator = RetryOrchestrator::builder(
            move |_: (), _: CancellationToken| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<u16, _>(std::io::Error::new(
                        std::io::ErrorKind::PermissionDenied,
                        "denied",
                    ))
                }
            },
            TimeoutsOnly,
        )
        .retry_budget(3)
        .retry_on_transport_failure(true)
        .retry_delays(no_delays())
        .build()
        .unwrap();

        let err = orchestrator
            .send((), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(
            err.transport_error().unwrap().kind(),
            std::io::ErrorKind::PermissionDenied
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_send_after_dispose() {
        let orchestrator = RetryOrchestrator::builder(
            |_: (), _: CancellationToken| async { Ok::<u16, std::io::Error>(200) },
            by_status,
        )
        .build()
        .unwrap();

        orchestrator.dispose();
        orchestrator.dispose();

        let err = orchestrator
            .send((), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_disposed());
    }

    #[tokio::test]
    async fn test_config_rate_limit_creates_owned_gate() {
        let orchestrator = RetryOrchestrator::builder(
            |_: (), _: CancellationToken| async { Ok::<u16, std::io::Error>(200) },
            by_status,
        )
        .config(RetryConfig {
            rate_limit: Some(RateLimitConfig::new(2, Duration::from_secs(1))),
            ..Default::default()
        })
        .build()
        .unwrap();

        let gate = Arc::clone(orchestrator.rate_gate().unwrap());
        assert!(!gate.is_disposed());

        orchestrator.dispose();
        assert!(gate.is_disposed());
    }

    #[tokio::test]
    async fn test_shared_gate_survives_dispose() {
        let gate: Arc<dyn AdmissionGate> =
            Arc::new(RateGate::new(2, Duration::from_secs(1)).unwrap());

        let orchestrator = RetryOrchestrator::builder(
            |_: (), _: CancellationToken| async { Ok::<u16, std::io::Error>(200) },
            by_status,
        )
        .shared_rate_gate(Arc::clone(&gate))
        .build()
        .unwrap();

        drop(orchestrator);
        assert!(!gate.is_disposed());
    }

    #[tokio::test]
    async fn test_invalid_rate_limit_fails_build() {
        let err = RetryOrchestrator::builder(
            |_: (), _: CancellationToken| async { Ok::<u16, std::io::Error>(200) },
            by_status,
        )
        .rate_limit(0, Duration::from_secs(1))
        .build()
        .unwrap_err();

        assert!(matches!(err, GateError::InvalidArgument(_)));
    }
}
