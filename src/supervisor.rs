//! Restart policy for the chat transport.
//!
//! Retryable channel errors (poll conflicts, disconnects) restart the run
//! after an exponential backoff with jitter. A run that stayed up for at
//! least `max_backoff` counts as healthy and resets the failure count.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::RetryConfig;
use crate::error::ChannelError;

/// Delay before restart number `failures` (1-based), without jitter.
pub fn backoff_delay(retry: &RetryConfig, failures: u32) -> Duration {
    let exp = failures.saturating_sub(1).min(16);
    retry
        .initial_backoff
        .saturating_mul(1u32 << exp)
        .min(retry.max_backoff)
}

/// Add up to 10% random jitter, still capped at `max`.
fn jittered(delay: Duration, max: Duration) -> Duration {
    let spread = (delay.as_millis() / 10) as u64;
    if spread == 0 {
        return delay;
    }
    let extra = rand::thread_rng().gen_range(0..=spread);
    (delay + Duration::from_millis(extra)).min(max)
}

/// Run `run` until it returns `Ok`, a non-retryable error, or the retry
/// budget is spent.
pub async fn supervise<F, Fut>(name: &str, retry: &RetryConfig, mut run: F) -> Result<(), ChannelError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), ChannelError>>,
{
    let mut failures: u32 = 0;

    loop {
        let started = Instant::now();
        let err = match run().await {
            Ok(()) => return Ok(()),
            Err(e) if !e.is_retryable() => {
                error!(channel = name, error = %e, "Channel failed permanently");
                return Err(e);
            }
            Err(e) => e,
        };

        if started.elapsed() >= retry.max_backoff {
            failures = 0;
        }
        failures += 1;

        let delay = backoff_delay(retry, failures);
        if failures >= retry.max_attempts {
            error!(channel = name, attempts = failures, error = %err, "Channel retries exhausted");
            return Err(ChannelError::RetriesExhausted {
                name: name.to_string(),
                attempts: failures,
                backoff: delay,
            });
        }

        let delay = jittered(delay, retry.max_backoff);
        warn!(
            channel = name,
            attempt = failures,
            max_attempts = retry.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Channel stopped; restarting after backoff"
        );
        tokio::time::sleep(delay).await;
        info!(channel = name, "Restarting channel");
    }
}
