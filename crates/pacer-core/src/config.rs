//! Typed configuration for the retry orchestrator.
//!
//! These structs only carry values; where they come from (files,
//! environment, code) is up to the caller.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry settings.
///
/// Missing fields fall back to [`RetryConfig::default`] when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries, not counting the first attempt.
    pub retry_budget: u32,

    /// Whether failures to produce any response are retried.
    pub retry_on_transport_failure: bool,

    /// Median delay before the first retry.
    pub first_retry_delay: Duration,

    /// Optional admission limit applied to every physical attempt.
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for RetryConfig {
    /// Defaults:
    /// - `retry_budget`: 3
    /// - `retry_on_transport_failure`: false
    /// - `first_retry_delay`: 100ms
    /// - `rate_limit`: none
    fn default() -> Self {
        Self {
            retry_budget: 3,
            retry_on_transport_failure: false,
            first_retry_delay: Duration::from_millis(100),
            rate_limit: None,
        }
    }
}

/// Sliding-window admission limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Starts allowed per window.
    pub capacity: usize,

    /// Window length.
    pub window: Duration,
}

impl RateLimitConfig {
    /// `capacity` starts per `window`.
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self { capacity, window }
    }
}
