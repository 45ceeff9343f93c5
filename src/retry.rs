//! Retry logic with exponential backoff
//!
//! Rate-limited (HTTP 429) responses and transient transport failures are
//! retried against the same page with a growing delay, up to a fixed number of
//! attempts. Waits between attempts are cut short by cancellation.
//!
//! # Example
//!
//! ```no_run
//! use faers_fetch::retry::{IsRetryable, fetch_with_retry};
//! use faers_fetch::config::RetryConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Busy,
//!     Broken,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Busy)
//!     }
//! }
//!
//! # async fn example() -> Result<(), faers_fetch::RetryError<MyError>> {
//! let config = RetryConfig::default();
//! let cancel = CancellationToken::new();
//! let page = fetch_with_retry(&config, &cancel, || async {
//!     Ok::<_, MyError>(vec![1, 2, 3])
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // The server asked us to slow down
            Error::RateLimited => true,
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::Interrupted
            ),
            Error::RequestFailed { .. }
            | Error::Cancelled
            | Error::Config { .. }
            | Error::Serialization(_)
            | Error::Csv(_)
            | Error::InvalidUrl(_) => false,
        }
    }
}

/// Outcome of a retried operation that did not succeed
#[derive(Debug)]
pub enum RetryError<E> {
    /// The operation failed permanently or ran out of attempts
    Failed(E),
    /// Cancellation was requested while waiting to retry
    Cancelled,
}

impl<E: std::fmt::Display> std::fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryError::Failed(e) => write!(f, "{}", e),
            RetryError::Cancelled => write!(f, "cancelled while waiting to retry"),
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for RetryError<E> {}

impl From<RetryError<Error>> for Error {
    fn from(e: RetryError<Error>) -> Self {
        match e {
            RetryError::Failed(e) => e,
            RetryError::Cancelled => Error::Cancelled,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// The operation runs once, then up to `config.max_attempts` more times while
/// it keeps failing with a retryable error. Each wait is
/// `initial_delay * backoff_multiplier^n`, capped at `max_delay`, optionally
/// jittered. If `cancel` fires during a wait the function returns
/// [`RetryError::Cancelled`] without another attempt.
pub async fn fetch_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Request succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                let wait = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = wait.as_millis(),
                    "Request failed, waiting before retrying"
                );

                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("Cancellation requested during retry wait");
                        return Err(RetryError::Cancelled);
                    }
                    _ = tokio::time::sleep(wait) => {}
                }

                // Past Duration's range the product saturates at the cap
                let next_secs = delay.as_secs_f64() * config.backoff_multiplier;
                delay = Duration::try_from_secs_f64(next_secs)
                    .unwrap_or(config.max_delay)
                    .min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "Request failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(error = %e, "Request failed with non-retryable error");
                }
                return Err(RetryError::Failed(e));
            }
        }
    }
}

/// Add random jitter to a delay
///
/// The result lies between `delay` and `2 * delay`. Delays too large to
/// jitter are returned unchanged.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::try_from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor)).unwrap_or(delay)
}
