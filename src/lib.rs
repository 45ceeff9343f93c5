//! # faers-fetch
//!
//! Harvests adverse-event reports from the openFDA `drug/event` search API and
//! flattens them into a CSV file, one row per drug × reaction pair.
//!
//! ## How a run works
//!
//! - The first page reports the total number of matching records
//! - Each following page is fetched with `skip` advanced by the page size
//! - Every page is flattened in memory and appended to the CSV before the next
//!   request, so an interrupted run leaves a valid file behind
//! - HTTP 429 responses are retried with exponential backoff
//! - A [`CancellationToken`](tokio_util::sync::CancellationToken) stops the loop
//!   between pages
//!
//! ## Quick Start
//!
//! ```no_run
//! use faers_fetch::{Config, harvest, spawn_signal_listener};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cancel = CancellationToken::new();
//!     spawn_signal_listener(cancel.clone());
//!
//!     let summary = harvest(&Config::default(), cancel).await?;
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Paginated API access
pub mod fetcher;
/// Event to row expansion
pub mod flatten;
/// Fetch, flatten and write loop
pub mod harvest;
/// Search expression builder
pub mod query;
/// Retry logic with exponential backoff
pub mod retry;
/// Raw records and output rows
pub mod types;
/// Incremental CSV output
pub mod writer;

// Re-export commonly used types
pub use config::{ApiConfig, Config, OutputConfig, QueryConfig, RetryConfig};
pub use error::{Error, Result};
pub use fetcher::{EventSource, Fetcher};
pub use flatten::flatten;
pub use harvest::{Harvester, Outcome, RunSummary, harvest, harvest_until};
pub use query::SearchQuery;
pub use retry::RetryError;
pub use types::{EventRecord, FlatRow, SearchPage};
pub use writer::{CsvSink, write_rows};

use tokio_util::sync::CancellationToken;

/// Cancel `cancel` when the process receives its first termination signal
///
/// Only the token is touched; the harvest loop notices it at its next
/// page boundary.
pub fn spawn_signal_listener(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_signal().await;
        cancel.cancel();
    })
}

/// Wait for a termination signal
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

/// Wait for a termination signal
#[cfg(not(unix))]
pub async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
