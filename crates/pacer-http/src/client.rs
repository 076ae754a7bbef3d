//! Retrying HTTP client
//!
//! [`RetryClient`] wraps any [`Transport`] with the core retry loop:
//! rate-limited attempts, status-code classification and jittered backoff.

use pacer_core::config::RetryConfig;
use pacer_core::delay::DelayFactory;
use pacer_core::gate::{AdmissionGate, GateError};
use pacer_core::retry::{RetryError, RetryOrchestrator, RetryOrchestratorBuilder};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::status::HttpStatusClassifier;
use crate::traits::{HttpRequest, HttpResponse, Transport};

type SendFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send>>;
type SendFn = Box<dyn Fn(HttpRequest, CancellationToken) -> SendFuture + Send + Sync>;

/// HTTP client that resends requests on transient errors and limits how many
/// requests start per unit of time.
///
/// Retried: 5xx, 408 and 429 responses, and (when enabled) any transport
/// error. Any other response is returned as-is. When the budget
/// runs out the last response or transport error is returned.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use pacer_http::{HttpRequest, HttpResponse, RetryClient, Transport, TransportError};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// struct Echo;
///
/// #[async_trait]
/// impl Transport for Echo {
///     async fn send_http(
///         &self,
///         _request: HttpRequest,
///         _cancel: CancellationToken,
///     ) -> Result<HttpResponse, TransportError> {
///         Ok(HttpResponse::with_status(200))
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RetryClient::builder(Echo)
///     .retry_count(3)
///     .retry_on_transport_error(true)
///     .first_retry_delay(Duration::from_millis(100))
///     .rate_limit(10, Duration::from_secs(1))
///     .build()?;
///
/// let response = client
///     .send(HttpRequest::new("GET", "http://localhost"), &CancellationToken::new())
///     .await?;
/// assert!(response.is_success());
/// # Ok(())
/// # }
/// ```
pub struct RetryClient {
    inner: RetryOrchestrator<SendFn, HttpStatusClassifier>,
}

impl RetryClient {
    /// Create a builder around `transport`.
    pub fn builder<T>(transport: T) -> RetryClientBuilder
    where
        T: Transport + 'static,
    {
        let transport = Arc::new(transport);
        let send: SendFn = Box::new(move |request: HttpRequest, cancel: CancellationToken| -> SendFuture {
            let transport = Arc::clone(&transport);
            Box::pin(async move {
                tracing::debug!("Sending {} request to {}", request.method, request.url);
                let response = transport.send_http(request, cancel).await;
                match &response {
                    Ok(response) => {
                        tracing::debug!("Received response with status: {}", response.status)
                    }
                    Err(err) => tracing::debug!("Transport failed: {}", err),
                }
                response
            })
        });

        RetryClientBuilder {
            inner: RetryOrchestrator::builder(send, HttpStatusClassifier),
        }
    }

    /// Send `request`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// - [`RetryError::Transport`] with the last transport error
    /// - [`RetryError::Cancelled`] if `cancel` fires while waiting for
    ///   admission or between attempts
    /// - [`RetryError::Disposed`] after [`dispose`](Self::dispose)
    pub async fn send(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, RetryError<TransportError>> {
        self.inner.send(request, cancel).await
    }

    /// Maximum number of retries after the first attempt.
    pub fn retry_count(&self) -> u32 {
        self.inner.retry_budget()
    }

    /// The admission gate, if any.
    pub fn rate_gate(&self) -> Option<&Arc<dyn AdmissionGate>> {
        self.inner.rate_gate()
    }

    /// Release the owned rate gate. Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

impl std::fmt::Debug for RetryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryClient")
            .field("inner", &self.inner)
            .finish()
    }
}

/// Builder for [`RetryClient`].
pub struct RetryClientBuilder {
    inner: RetryOrchestratorBuilder<SendFn, HttpStatusClassifier>,
}

impl RetryClientBuilder {
    /// Apply a whole [`RetryConfig`].
    pub fn config(mut self, config: RetryConfig) -> Self {
        self.inner = self.inner.config(config);
        self
    }

    /// Set the maximum number of retries.
    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.inner = self.inner.retry_budget(retry_count);
        self
    }

    /// Resend requests when the transport fails to produce a response.
    pub fn retry_on_transport_error(mut self, enabled: bool) -> Self {
        self.inner = self.inner.retry_on_transport_failure(enabled);
        self
    }

    /// Median delay for the first retry.
    pub fn first_retry_delay(mut self, delay: Duration) -> Self {
        self.inner = self.inner.first_retry_delay(delay);
        self
    }

    /// Limit to `capacity` request starts per `window`.
    pub fn rate_limit(mut self, capacity: usize, window: Duration) -> Self {
        self.inner = self.inner.rate_limit(capacity, window);
        self
    }

    /// Hand over a gate, disposed together with the client.
    pub fn rate_gate(mut self, gate: impl AdmissionGate + 'static) -> Self {
        self.inner = self.inner.rate_gate(gate);
        self
    }

    /// Share a gate with other clients.
    pub fn shared_rate_gate(mut self, gate: Arc<dyn AdmissionGate>) -> Self {
        self.inner = self.inner.shared_rate_gate(gate);
        self
    }

    /// Custom delay sequence instead of decorrelated jitter.
    pub fn retry_delays(mut self, factory: DelayFactory) -> Self {
        self.inner = self.inner.retry_delays(factory);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Fails if a configured rate limit is invalid or no Tokio runtime is
    /// running.
    pub fn build(self) -> Result<RetryClient, GateError> {
        Ok(RetryClient {
            inner: self.inner.build()?,
        })
    }
}
