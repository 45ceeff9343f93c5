//! Configuration types for faers-fetch

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Main configuration
///
/// Every field has a default, so an empty JSON object (or no file at all)
/// reproduces the stock statin harvest against the public openFDA endpoint.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Endpoint, paging and pacing settings
    #[serde(default)]
    pub api: ApiConfig,

    /// What to search for
    #[serde(default)]
    pub query: QueryConfig,

    /// Backoff applied to rate-limited and transient failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Where the flattened rows go
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load a configuration from a JSON file, filling omitted fields with defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings that would otherwise fail late or loop forever
    pub fn validate(&self) -> Result<()> {
        if self.api.page_size == 0 {
            return Err(Error::config("api.page_size", "must be greater than zero"));
        }
        url::Url::parse(&self.api.base_url)
            .map_err(|e| Error::config("api.base_url", e.to_string()))?;
        if self.query.generic_names.iter().all(|n| n.trim().is_empty()) {
            return Err(Error::config(
                "query.generic_names",
                "at least one generic drug name is required",
            ));
        }
        if self.query.received_from > self.query.received_to {
            return Err(Error::config(
                "query.received_from",
                format!(
                    "start date {} is after end date {}",
                    self.query.received_from, self.query.received_to
                ),
            ));
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "retry.backoff_multiplier",
                "must be a finite number of at least 1.0",
            ));
        }
        if self.output.path.as_os_str().is_empty() {
            return Err(Error::config("output.path", "must not be empty"));
        }
        Ok(())
    }
}

/// API endpoint and paging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Adverse-event search endpoint (default: openFDA drug/event)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Records requested per page, sent as `limit` (default: 100)
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Pause after each successful page (default: 200 ms)
    #[serde(default = "default_request_delay", with = "duration_millis_serde")]
    pub request_delay: Duration,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_millis_serde")]
    pub request_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            request_delay: default_request_delay(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Search filters combined into the openFDA `search` expression
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Generic drug names, OR'd together (default: the three common statins)
    #[serde(default = "default_generic_names")]
    pub generic_names: Vec<String>,

    /// Occurrence country code (default: "US")
    #[serde(default = "default_occurrence_country")]
    pub occurrence_country: Option<String>,

    /// First receive date, inclusive (default: 2020-01-01)
    #[serde(default = "default_received_from")]
    pub received_from: NaiveDate,

    /// Last receive date, inclusive (default: 2024-12-31)
    #[serde(default = "default_received_to")]
    pub received_to: NaiveDate,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            generic_names: default_generic_names(),
            occurrence_country: default_occurrence_country(),
            received_from: default_received_from(),
            received_to: default_received_to(),
        }
    }
}

/// Retry configuration for rate-limited and transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 5 seconds)
    #[serde(default = "default_initial_delay", with = "duration_millis_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_millis_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Output file configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// CSV destination (default: "statin_adverse_events.csv")
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.fda.gov/drug/event.json".to_string()
}

fn default_page_size() -> u64 {
    100
}

fn default_request_delay() -> Duration {
    Duration::from_millis(200)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    concat!("faers-fetch/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_generic_names() -> Vec<String> {
    ["ATORVASTATIN", "SIMVASTATIN", "ROSUVASTATIN"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_occurrence_country() -> Option<String> {
    Some("US".to_string())
}

fn default_received_from() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn default_received_to() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or(NaiveDate::MAX)
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_output_path() -> PathBuf {
    PathBuf::from("statin_adverse_events.csv")
}

// Durations are written as integer milliseconds; pacing delays are sub-second
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
