//! Example: rate-limited retries around an unreliable service
//!
//! This example demonstrates:
//! 1. Retrying transient failures with decorrelated-jitter backoff
//! 2. Bounding request starts with a sliding-window rate gate
//! 3. Comparing the three delay sequences
//!
//! Run with:
//! ```bash
//! RUST_LOG=pacer_core=debug cargo run -p pacer-core --example retry_example
//! ```

use pacer_core::delay;
use pacer_core::prelude::*;
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// A simulated API that answers 503 the first few times
#[derive(Clone)]
struct UnreliableApi {
    attempts: Arc<AtomicU32>,
    fail_count: u32,
}

impl UnreliableApi {
    fn new(fail_count: u32) -> Self {
        Self {
            attempts: Arc::new(AtomicU32::new(0)),
            fail_count,
        }
    }

    async fn call(&self, path: &str) -> Result<u16, std::io::Error> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);

        if attempt < self.fail_count {
            println!("  Attempt {} {}: 503 Service Unavailable", attempt + 1, path);
            Ok(503)
        } else {
            println!("  Attempt {} {}: 200 OK", attempt + 1, path);
            Ok(200)
        }
    }

    fn total_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

fn classify(status: &u16) -> Classification {
    match *status {
        200..=299 => Classification::Success,
        408 | 429 | 500..=599 => Classification::Failure(FailureKind::TransientServiceFailure),
        _ => Classification::Failure(FailureKind::PermanentFailure),
    }
}

/// Example 1: Retry with jittered backoff
async fn example_simple_retry() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 1: Retry with Decorrelated Jitter ===\n");

    let api = UnreliableApi::new(2);
    let send_api = api.clone();

    let orchestrator = RetryOrchestrator::builder(
        move |path: &'static str, _cancel: CancellationToken| {
            let api = send_api.clone();
            async move { api.call(path).await }
        },
        classify,
    )
    .retry_budget(3)
    .first_retry_delay(Duration::from_millis(100))
    .build()?;

    let start = Instant::now();
    let status = orchestrator
        .send("/v1/items", &CancellationToken::new())
        .await?;

    println!("\nResult: {}", status);
    println!("Total attempts: {}", api.total_attempts());
    println!("Total time: {:?}", start.elapsed());

    Ok(())
}

/// Example 2: Rate limiting every physical attempt
async fn example_rate_limit() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 2: 3 Requests per 500ms ===\n");

    let api = UnreliableApi::new(0);
    let send_api = api.clone();

    let orchestrator = RetryOrchestrator::builder(
        move |path: &'static str, _cancel: CancellationToken| {
            let api = send_api.clone();
            async move { api.call(path).await }
        },
        classify,
    )
    .rate_limit(3, Duration::from_millis(500))
    .build()?;

    let cancel = CancellationToken::new();
    let start = Instant::now();
    for _ in 0..9 {
        orchestrator.send("/v1/items", &cancel).await?;
        println!("    at {:?}", start.elapsed());
    }

    println!("\n9 requests at 3 per 500ms took {:?} (expected >= 1s)", start.elapsed());
    orchestrator.dispose();

    Ok(())
}

/// Example 3: Delay sequences side by side
fn example_delay_sequences() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 3: Delay Sequences ===\n");

    let first = Duration::from_millis(100);

    let constant: Vec<_> = delay::constant(first, 5).collect();
    let exponential: Vec<_> = delay::exponential(first, 5, 2.0)?.collect();
    let jitter: Vec<_> = delay::decorrelated_jitter(first, 5, Some(42), false).collect();
    let fast: Vec<_> = delay::decorrelated_jitter(first, 5, Some(42), true).collect();

    println!("  Constant:           {:?}", constant);
    println!("  Exponential:        {:?}", exponential);
    println!("  Jitter (seed 42):   {:?}", jitter);
    println!("  Jitter, fast first: {:?}", fast);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("==============================================");
    println!("   pacer-core: Retry and Rate Gate Examples");
    println!("==============================================");

    example_simple_retry().await?;
    example_rate_limit().await?;
    example_delay_sequences()?;

    println!("\n==============================================");
    println!("   All examples completed successfully!");
    println!("==============================================\n");

    Ok(())
}
