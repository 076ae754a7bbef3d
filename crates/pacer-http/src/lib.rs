//! Retrying, rate-limited HTTP sending on top of `pacer-core`
//!
//! Provides the HTTP side of the retry loop: request/response carriers, the
//! [`Transport`] trait a concrete client implements, status-code
//! classification and [`RetryClient`].
//!
//! # Architecture
//!
//! - **Transport trait**: sends one request, no retries
//! - **Status classification**: 5xx, 408 and 429 are transient

#![deny(unsafe_code)]
#![warn(missing_docs)]
//! - **RetryClient**: rate gate + retries + backoff around any transport
//! - **Error handling**: [`TransportError`] reports sends that produced no
//!   response
//!
//! # Usage
//!
//! ```ignore
//! use pacer_http::{HttpRequest, RetryClient};
//!
//! let client = RetryClient::builder(my_transport)
//!     .retry_count(3)
//!     .rate_limit(5, Duration::from_secs(1))
//!     .build()?;
//! let response = client.send(HttpRequest::new("GET", "https://example.com"), &cancel).await?;
//! ```

pub mod client;
pub mod error;
pub mod status;
pub mod traits;

// Re-export commonly used types
pub use client::{RetryClient, RetryClientBuilder};
pub use error::{Result, TransportError};
pub use status::HttpStatusClassifier;
pub use traits::{HttpRequest, HttpResponse, Transport};
