//! Common test utilities for faers-fetch end-to-end tests

#[allow(dead_code)]
pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::*;

use faers_fetch::{Config, RetryConfig};
use std::path::Path;
use std::time::Duration;
use wiremock::MockServer;

/// Config pointed at `server`, writing to `output`, with no pacing and fast retries
#[allow(dead_code)]
pub fn test_config(server: &MockServer, output: &Path, page_size: u64) -> Config {
    let mut config = Config::default();
    config.api.base_url = format!("{}{}", server.uri(), EVENT_PATH);
    config.api.page_size = page_size;
    config.api.request_delay = Duration::ZERO;
    config.api.request_timeout = Duration::from_secs(5);
    config.retry = RetryConfig {
        max_attempts: 3,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config.output.path = output.to_path_buf();
    config
}

/// Lines of the CSV at `path`
#[allow(dead_code)]
pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(String::from)
        .collect()
}
