//! The harvest loop: fetch a page, flatten it, append it, pause, repeat
//!
//! Pages are processed strictly in order, one request in flight at a time.
//! Cancellation is checked at the top of every iteration, so a page that was
//! already requested is still flattened and written before the loop stops.
//! Batches are written without yielding to the runtime, so dropping the loop
//! future (see [`Harvester::run_until`]) never leaves a half-written batch.

use crate::config::{Config, RetryConfig};
use crate::error::{Error, Result};
use crate::fetcher::{EventSource, Fetcher};
use crate::flatten::flatten;
use crate::query::SearchQuery;
use crate::retry::{RetryError, fetch_with_retry};
use crate::types::{EventRecord, FlatRow};
use crate::writer::CsvSink;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Why the loop stopped
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Every page up to the reported total was fetched
    Completed,
    /// A stop was requested; pages already in flight were saved
    Cancelled,
    /// A page request failed with a non-retryable HTTP status
    Stopped {
        /// Status returned by the API
        status: u16,
    },
    /// The API kept answering 429 after every retry
    RateLimitExhausted,
    /// An unexpected failure (transport, decoding, output) ended the run
    Aborted {
        /// Error description for the operator
        reason: String,
    },
}

/// Counters reported at the end of a run
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    /// Event records received from the API
    pub processed: u64,
    /// Total matching records reported by the first page
    pub total: u64,
    /// Pages successfully fetched, including the first
    pub pages_fetched: u64,
    /// CSV rows written
    pub rows_written: u64,
    /// Why the loop stopped
    pub outcome: Outcome,
}

impl RunSummary {
    /// Fraction of the total processed, clamped to [0, 1]
    pub fn progress(&self) -> f64 {
        progress_fraction(self.processed, self.total)
    }

    /// [`progress`](Self::progress) as a percentage
    pub fn percent(&self) -> f64 {
        self.progress() * 100.0
    }

    /// True when the run ended on an unexpected error rather than a handled stop
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Aborted { .. })
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Completed => write!(
                f,
                "Successfully fetched and processed all {} records.",
                self.processed
            ),
            Outcome::Cancelled => write!(
                f,
                "Successfully fetched and processed {} records before stopping.\n\
                 This represents {:.2}% of the total available data.",
                self.processed,
                self.percent()
            ),
            Outcome::Stopped { status } => write!(
                f,
                "Stopped after HTTP {} with {} of {} records processed ({:.2}%).",
                status,
                self.processed,
                self.total,
                self.percent()
            ),
            Outcome::RateLimitExhausted => write!(
                f,
                "Stopped after repeated rate limiting with {} of {} records processed ({:.2}%).",
                self.processed,
                self.total,
                self.percent()
            ),
            Outcome::Aborted { reason } => write!(
                f,
                "An error occurred: {}\n{} of {} records were saved before the failure ({:.2}%).",
                reason,
                self.processed,
                self.total,
                self.percent()
            ),
        }
    }
}

fn progress_fraction(processed: u64, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (processed as f64 / total as f64).min(1.0)
}

/// Drives an [`EventSource`] into a [`CsvSink`]
pub struct Harvester<S> {
    source: S,
    sink: CsvSink,
    retry: RetryConfig,
    request_delay: Duration,
    cancel: CancellationToken,
}

impl<S: EventSource> Harvester<S> {
    /// Create a harvester; pacing and retry settings start at their defaults
    pub fn new(source: S, sink: CsvSink, cancel: CancellationToken) -> Self {
        Self {
            source,
            sink,
            retry: RetryConfig::default(),
            request_delay: crate::config::ApiConfig::default().request_delay,
            cancel,
        }
    }

    /// Backoff used for rate-limited and transient failures
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Pause between a successful page and the next request
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Run the loop to completion, cancellation, or the first fatal error
    ///
    /// # Errors
    ///
    /// Only a failed initial request is returned as an error; nothing is
    /// written in that case. Every later failure is folded into the
    /// [`RunSummary`] so the rows already on disk are reported.
    pub async fn run(mut self) -> Result<RunSummary> {
        let (first, total) = self.source.begin().await?;
        info!(total, "Total records to fetch: {}", total);

        let page_size = self.source.page_size();
        let mut summary = RunSummary {
            processed: first.len() as u64,
            total,
            pages_fetched: 1,
            rows_written: 0,
            outcome: Outcome::Completed,
        };

        if let Err(e) = self.store(&first) {
            error!(error = %e, "Failed to save first batch");
            summary.outcome = Outcome::Aborted {
                reason: e.to_string(),
            };
            summary.rows_written = self.sink.rows_written();
            return Ok(summary);
        }

        let mut offset = page_size;
        summary.outcome = loop {
            if offset >= total {
                break Outcome::Completed;
            }
            if self.cancel.is_cancelled() {
                info!(offset, "Stop requested, not fetching further pages");
                break Outcome::Cancelled;
            }

            // Only reached after a successful page
            let stopped = tokio::select! {
                _ = self.cancel.cancelled() => true,
                _ = tokio::time::sleep(self.request_delay) => false,
            };
            if stopped {
                info!(offset, "Stop requested during pacing delay");
                break Outcome::Cancelled;
            }

            info!(
                "Fetching records {} to {}...",
                offset,
                offset + page_size - 1
            );

            let source = &self.source;
            let fetched = fetch_with_retry(&self.retry, &self.cancel, || source.next(offset)).await;

            match fetched {
                Ok(batch) => {
                    summary.pages_fetched += 1;
                    if let Err(e) = self.store(&batch) {
                        error!(error = %e, offset, "Failed to save batch");
                        break Outcome::Aborted {
                            reason: e.to_string(),
                        };
                    }
                    summary.processed += batch.len() as u64;
                    offset += page_size;

                    info!(
                        processed = summary.processed,
                        total,
                        "Progress: {:.2}% ({}/{} records)",
                        progress_fraction(summary.processed, total) * 100.0,
                        summary.processed,
                        total
                    );
                }
                Err(RetryError::Cancelled) | Err(RetryError::Failed(Error::Cancelled)) => {
                    break Outcome::Cancelled;
                }
                Err(RetryError::Failed(Error::RateLimited)) => {
                    warn!(offset, "Rate limit persisted after all retries");
                    break Outcome::RateLimitExhausted;
                }
                Err(RetryError::Failed(Error::RequestFailed { status, body })) => {
                    error!(status, offset, body = %body, "Page request failed");
                    break Outcome::Stopped { status };
                }
                Err(RetryError::Failed(e)) => {
                    error!(error = %e, offset, "Unexpected failure during harvest");
                    break Outcome::Aborted {
                        reason: e.to_string(),
                    };
                }
            }
        };

        summary.rows_written = self.sink.rows_written();
        Ok(summary)
    }

    /// Run the loop, abandoning it if `interrupt` resolves first
    ///
    /// The loop can only be abandoned while it waits on a request, a retry
    /// or the pacing delay, so the file always ends on a complete batch. The
    /// page in flight at that moment is discarded. Returns `Ok(None)` when
    /// interrupted.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub async fn run_until<F>(self, interrupt: F) -> Result<Option<RunSummary>>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            result = self.run() => result.map(Some),
            _ = interrupt => {
                warn!("Interrupted, abandoning the page in flight");
                Ok(None)
            }
        }
    }

    // The whole batch is flattened before anything touches the file
    fn store(&mut self, batch: &[EventRecord]) -> Result<usize> {
        let rows: Vec<FlatRow> = flatten(batch).collect();
        self.sink.write_batch(&rows)
    }
}

fn build(config: &Config, cancel: CancellationToken) -> Result<Harvester<Fetcher>> {
    config.validate()?;

    let query = SearchQuery::from(&config.query);
    let fetcher = Fetcher::new(&config.api, &query)?;
    info!(search = fetcher.search(), "Fetching adverse events");

    Ok(
        Harvester::new(fetcher, CsvSink::new(&config.output.path), cancel)
            .with_retry(config.retry.clone())
            .with_request_delay(config.api.request_delay),
    )
}

/// Build the HTTP fetcher and CSV sink from `config` and run a full harvest
pub async fn harvest(config: &Config, cancel: CancellationToken) -> Result<RunSummary> {
    build(config, cancel)?.run().await
}

/// [`harvest`], abandoned between batches if `interrupt` resolves first
///
/// Returns `Ok(None)` when interrupted; see [`Harvester::run_until`].
pub async fn harvest_until<F>(
    config: &Config,
    cancel: CancellationToken,
    interrupt: F,
) -> Result<Option<RunSummary>>
where
    F: Future<Output = ()>,
{
    build(config, cancel)?.run_until(interrupt).await
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Drug, Patient, Reaction};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;
    use tokio::sync::Notify;

    /// Scripted source: `begin` returns the first page, `next` pops responses in order
    struct ScriptedSource {
        page_size: u64,
        total: u64,
        first: Vec<EventRecord>,
        script: Mutex<VecDeque<Result<Vec<EventRecord>>>>,
        requested: Mutex<Vec<u64>>,
        requested_at: Mutex<Vec<Instant>>,
        cancel_on_request: Option<(u64, CancellationToken)>,
    }

    impl ScriptedSource {
        fn new(page_size: u64, total: u64, first: Vec<EventRecord>) -> Self {
            Self {
                page_size,
                total,
                first,
                script: Mutex::new(VecDeque::new()),
                requested: Mutex::new(Vec::new()),
                requested_at: Mutex::new(Vec::new()),
                cancel_on_request: None,
            }
        }

        fn then(self, response: Result<Vec<EventRecord>>) -> Self {
            self.script.lock().unwrap().push_back(response);
            self
        }

        fn requested(&self) -> Vec<u64> {
            self.requested.lock().unwrap().clone()
        }

        fn requested_at(&self) -> Vec<Instant> {
            self.requested_at.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl<'a> EventSource for &'a ScriptedSource {
        fn page_size(&self) -> u64 {
            self.page_size
        }

        async fn begin(&self) -> Result<(Vec<EventRecord>, u64)> {
            Ok((self.first.clone(), self.total))
        }

        async fn next(&self, offset: u64) -> Result<Vec<EventRecord>> {
            self.requested.lock().unwrap().push(offset);
            self.requested_at.lock().unwrap().push(Instant::now());
            if let Some((at, token)) = &self.cancel_on_request {
                if *at == offset {
                    token.cancel();
                }
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(events(self.page_size as usize, "filler")))
        }
    }

    struct FailingSource;

    #[async_trait]
    impl EventSource for FailingSource {
        fn page_size(&self) -> u64 {
            10
        }

        async fn begin(&self) -> Result<(Vec<EventRecord>, u64)> {
            Err(Error::RequestFailed {
                status: 500,
                body: "down".to_string(),
            })
        }

        async fn next(&self, _offset: u64) -> Result<Vec<EventRecord>> {
            unreachable!("next must not be called after a failed begin")
        }
    }

    /// Serves the first page, then signals `interrupt` and hangs on every later request
    struct StallingSource {
        interrupt: Arc<Notify>,
    }

    #[async_trait]
    impl EventSource for StallingSource {
        fn page_size(&self) -> u64 {
            2
        }

        async fn begin(&self) -> Result<(Vec<EventRecord>, u64)> {
            Ok((events(2, "a"), 10))
        }

        async fn next(&self, _offset: u64) -> Result<Vec<EventRecord>> {
            self.interrupt.notify_one();
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(events(2, "late"))
        }
    }

    fn events(n: usize, prefix: &str) -> Vec<EventRecord> {
        (0..n)
            .map(|i| EventRecord {
                report_id: format!("{prefix}-{i}"),
                patient: Patient {
                    drugs: vec![Drug {
                        medicinal_product: "CRESTOR".to_string(),
                        ..Drug::default()
                    }],
                    reactions: vec![Reaction {
                        reaction_term: "MYALGIA".to_string(),
                    }],
                },
                ..EventRecord::default()
            })
            .collect()
    }

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    fn harvester<'a>(
        source: &'a ScriptedSource,
        path: &std::path::Path,
        cancel: CancellationToken,
    ) -> Harvester<&'a ScriptedSource> {
        Harvester::new(source, CsvSink::new(path), cancel)
            .with_retry(fast_retry(2))
            .with_request_delay(Duration::ZERO)
    }

    fn csv_lines(path: &std::path::Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn test_pagination_issues_ceil_of_remaining_over_page_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        // T = 35, P = 10 -> ceil(25 / 10) = 3 follow-up requests
        let source = ScriptedSource::new(10, 35, events(10, "p0"));

        let summary = harvester(&source, &path, CancellationToken::new())
            .run()
            .await
            .unwrap();

        assert_eq!(source.requested(), vec![10, 20, 30]);
        assert_eq!(summary.outcome, Outcome::Completed);
        assert_eq!(summary.pages_fetched, 4);
        assert_eq!(summary.processed, 40);
        assert_eq!(summary.progress(), 1.0, "progress is clamped to 1");
    }

    #[tokio::test]
    async fn test_single_page_total_issues_no_follow_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let source = ScriptedSource::new(10, 7, events(7, "only"));

        let summary = harvester(&source, &path, CancellationToken::new())
            .run()
            .await
            .unwrap();

        assert!(source.requested().is_empty());
        assert_eq!(summary.processed, 7);
        assert_eq!(summary.rows_written, 7);
        assert_eq!(csv_lines(&path).len(), 8);
    }

    #[tokio::test]
    async fn test_header_written_once_across_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let source = ScriptedSource::new(2, 6, events(2, "a"))
            .then(Ok(events(2, "b")))
            .then(Ok(events(2, "c")));

        harvester(&source, &path, CancellationToken::new())
            .run()
            .await
            .unwrap();

        let lines = csv_lines(&path);
        assert_eq!(lines.len(), 7);
        assert_eq!(lines.iter().filter(|l| l.starts_with("report_id")).count(), 1);
        assert!(lines[0].starts_with("report_id"));
        assert!(lines[1].starts_with("a-0"));
        assert!(lines[6].starts_with("c-1"));
    }

    #[tokio::test]
    async fn test_progress_counts_events_not_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut first = events(1, "multi");
        first[0].patient.reactions.push(Reaction {
            reaction_term: "NAUSEA".to_string(),
        });
        let source = ScriptedSource::new(1, 2, first).then(Ok(vec![]));

        let summary = harvester(&source, &path, CancellationToken::new())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.processed, 1, "empty page adds nothing");
        assert_eq!(summary.rows_written, 2);
        assert_eq!(summary.outcome, Outcome::Completed);
        assert!((summary.percent() - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_cancellation_saves_in_flight_page_then_stops() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let cancel = CancellationToken::new();
        let mut source = ScriptedSource::new(2, 10, events(2, "a")).then(Ok(events(2, "b")));
        source.cancel_on_request = Some((2, cancel.clone()));

        let summary = harvester(&source, &path, cancel).run().await.unwrap();

        assert_eq!(source.requested(), vec![2], "no request after cancellation");
        assert_eq!(summary.outcome, Outcome::Cancelled);
        assert_eq!(summary.processed, 4);
        let lines = csv_lines(&path);
        assert_eq!(lines.len(), 5);
        assert!(lines[4].starts_with("b-1"), "in-flight page must be written");
        assert!(summary.to_string().contains("40.00%"));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_follow_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let source = ScriptedSource::new(2, 10, events(2, "a"));

        let summary = harvester(&source, &path, cancel).run().await.unwrap();

        assert!(source.requested().is_empty());
        assert_eq!(summary.outcome, Outcome::Cancelled);
        assert_eq!(csv_lines(&path).len(), 3, "first page is still saved");
    }

    #[tokio::test]
    async fn test_rate_limit_retries_same_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let source = ScriptedSource::new(2, 4, events(2, "a"))
            .then(Err(Error::RateLimited))
            .then(Ok(events(2, "b")));

        let summary = harvester(&source, &path, CancellationToken::new())
            .run()
            .await
            .unwrap();

        assert_eq!(source.requested(), vec![2, 2]);
        assert_eq!(summary.outcome, Outcome::Completed);
        assert_eq!(summary.processed, 4);
    }

    #[tokio::test]
    async fn test_rate_limit_exhaustion_stops_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let source = ScriptedSource::new(2, 6, events(2, "a"))
            .then(Err(Error::RateLimited))
            .then(Err(Error::RateLimited))
            .then(Err(Error::RateLimited));

        let summary = harvester(&source, &path, CancellationToken::new())
            .run()
            .await
            .unwrap();

        assert_eq!(source.requested(), vec![2, 2, 2]);
        assert_eq!(summary.outcome, Outcome::RateLimitExhausted);
        assert_eq!(csv_lines(&path).len(), 3);
    }

    #[tokio::test]
    async fn test_http_error_stops_and_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let source = ScriptedSource::new(2, 8, events(2, "a"))
            .then(Ok(events(2, "b")))
            .then(Err(Error::RequestFailed {
                status: 500,
                body: "Internal".to_string(),
            }));

        let summary = harvester(&source, &path, CancellationToken::new())
            .run()
            .await
            .unwrap();

        assert_eq!(source.requested(), vec![2, 4]);
        assert_eq!(summary.outcome, Outcome::Stopped { status: 500 });
        assert_eq!(summary.processed, 4);
        assert!(!summary.is_failure());
        assert_eq!(csv_lines(&path).len(), 5);
    }

    #[tokio::test]
    async fn test_unexpected_error_aborts_with_reason() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let bad_json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let source = ScriptedSource::new(2, 8, events(2, "a")).then(Err(bad_json.into()));

        let summary = harvester(&source, &path, CancellationToken::new())
            .run()
            .await
            .unwrap();

        assert!(matches!(summary.outcome, Outcome::Aborted { .. }));
        assert!(summary.is_failure());
        assert_eq!(csv_lines(&path).len(), 3, "earlier rows remain valid");
    }

    #[tokio::test]
    async fn test_failed_begin_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let result = Harvester::new(FailingSource, CsvSink::new(&path), CancellationToken::new())
            .run()
            .await;

        assert!(matches!(result, Err(Error::RequestFailed { status: 500, .. })));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_request_delay_paces_successful_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let delay = Duration::from_millis(50);
        let source = ScriptedSource::new(2, 6, events(2, "a"))
            .then(Ok(events(2, "b")))
            .then(Ok(events(2, "c")));

        let start = Instant::now();
        let summary = harvester(&source, &path, CancellationToken::new())
            .with_request_delay(delay)
            .run()
            .await
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(summary.outcome, Outcome::Completed);
        assert_eq!(summary.pages_fetched, 3);
        // one pause before each of the two follow-up requests
        assert!(elapsed >= delay * 2, "waited {:?}", elapsed);
        let at = source.requested_at();
        assert_eq!(at.len(), 2);
        assert!(at[0] - start >= delay);
        assert!(at[1] - at[0] >= delay);
    }

    #[tokio::test]
    async fn test_no_delay_after_failed_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let delay = Duration::from_millis(300);
        let source = ScriptedSource::new(2, 6, events(2, "a")).then(Err(Error::RequestFailed {
            status: 500,
            body: String::new(),
        }));

        let summary = harvester(&source, &path, CancellationToken::new())
            .with_request_delay(delay)
            .run()
            .await
            .unwrap();
        let finished = Instant::now();

        assert_eq!(summary.outcome, Outcome::Stopped { status: 500 });
        let at = source.requested_at();
        assert_eq!(at.len(), 1);
        assert!(
            finished - at[0] < delay,
            "run must end right after the failed page, took {:?}",
            finished - at[0]
        );
    }

    #[tokio::test]
    async fn test_cancel_during_pacing_delay_skips_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(2, 6, events(2, "a"));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let summary = harvester(&source, &path, cancel)
            .with_request_delay(Duration::from_secs(30))
            .run()
            .await
            .unwrap();

        assert_eq!(summary.outcome, Outcome::Cancelled);
        assert!(source.requested().is_empty());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_interrupt_abandons_request_and_keeps_complete_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let interrupt = Arc::new(Notify::new());
        let source = StallingSource {
            interrupt: interrupt.clone(),
        };

        let start = Instant::now();
        let result = Harvester::new(source, CsvSink::new(&path), CancellationToken::new())
            .with_request_delay(Duration::ZERO)
            .run_until(async move { interrupt.notified().await })
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(start.elapsed() < Duration::from_secs(5));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.ends_with('\n'), "last line must be complete");
        let mut reader = csv::Reader::from_reader(contents.as_bytes());
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2, "only the first page is on disk");
        assert!(records.iter().all(|r| r.len() == FlatRow::COLUMNS.len()));
        assert_eq!(&records[1][0], "a-1");
    }

    #[tokio::test]
    async fn test_run_until_without_interrupt_returns_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let source = ScriptedSource::new(2, 4, events(2, "a")).then(Ok(events(2, "b")));

        let summary = harvester(&source, &path, CancellationToken::new())
            .run_until(std::future::pending())
            .await
            .unwrap()
            .expect("run must finish on its own");

        assert_eq!(summary.outcome, Outcome::Completed);
        assert_eq!(summary.rows_written, 4);
    }

    #[test]
    fn test_progress_fraction_bounds() {
        assert_eq!(progress_fraction(0, 0), 1.0);
        assert_eq!(progress_fraction(50, 100), 0.5);
        assert_eq!(progress_fraction(150, 100), 1.0);
    }
}
