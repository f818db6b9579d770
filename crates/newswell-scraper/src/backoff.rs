//! Retry with exponential backoff for transient HTTP errors.
//!
//! Retriable: 429, 5xx, and network-level failures. Everything else —
//! including a 403 block, which must reach the circuit-breaker bookkeeping
//! untouched — propagates immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ScrapeError;

fn is_retriable(err: &ScrapeError) -> bool {
    match err {
        ScrapeError::RateLimited { .. } | ScrapeError::Http(_) => true,
        ScrapeError::UnexpectedStatus { status, .. } => (500..=599).contains(status),
        _ => false,
    }
}

/// Executes `operation`, sleeping `backoff_base_secs * 2^attempt` seconds
/// between attempts, up to `max_retries` additional attempts after the first.
/// Non-retriable errors are returned without sleeping.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let mut last_err;
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                last_err = err;
            }
        }

        // Cap the shift to keep the multiplication from overflowing on
        // extreme configs.
        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %last_err,
            "transient fetch error — retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}
