//! faers-fetch command line entrypoint.

use chrono::NaiveDate;
use clap::Parser;
use faers_fetch::{Config, Error, harvest_until, spawn_signal_listener, wait_for_signal};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "faers-fetch")]
#[command(version, about = "Fetch openFDA adverse-event reports into a flat CSV file")]
struct Cli {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output CSV path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Generic drug name to include (repeatable)
    #[arg(short, long = "drug")]
    drugs: Vec<String>,

    /// Occurrence country code
    #[arg(long)]
    country: Option<String>,

    /// Search all occurrence countries
    #[arg(long, conflicts_with = "country")]
    any_country: bool,

    /// First receive date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last receive date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Records per request
    #[arg(long)]
    page_size: Option<u64>,

    /// Search endpoint
    #[arg(long)]
    base_url: Option<String>,

    /// Retries per page after rate limiting
    #[arg(long)]
    max_retries: Option<u32>,
}

impl Cli {
    fn into_config(self) -> Result<Config, Error> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(output) = self.output {
            config.output.path = output;
        }
        if !self.drugs.is_empty() {
            config.query.generic_names = self.drugs;
        }
        if self.any_country {
            config.query.occurrence_country = None;
        } else if let Some(country) = self.country {
            config.query.occurrence_country = Some(country);
        }
        if let Some(from) = self.from {
            config.query.received_from = from;
        }
        if let Some(to) = self.to {
            config.query.received_to = to;
        }
        if let Some(page_size) = self.page_size {
            config.api.page_size = page_size;
        }
        if let Some(base_url) = self.base_url {
            config.api.base_url = base_url;
        }
        if let Some(max_retries) = self.max_retries {
            config.retry.max_attempts = max_retries;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "faers_fetch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    println!("Fetching adverse events data from {}...", config.api.base_url);
    println!("You can press Ctrl+C at any time to stop the process and save data collected so far.");

    let cancel = CancellationToken::new();
    let first_signal = spawn_signal_listener(cancel.clone());
    // The first signal lets the current batch finish; a second one abandons
    // the harvest at its next await point, never inside a batch write
    let second_signal = async move {
        if first_signal.await.is_err() {
            return std::future::pending::<()>().await;
        }
        println!("\nStop requested. Completing current batch and saving data...");
        wait_for_signal().await;
    };

    let output = config.output.path.clone();
    match harvest_until(&config, cancel, second_signal).await {
        Ok(Some(summary)) => {
            println!("\n{}", summary);
            if summary.is_failure() {
                println!("Failed to fetch data.");
                std::process::exit(1);
            }
            if summary.rows_written > 0 {
                println!("Data has been saved to {}", output.display());
            } else {
                println!("No rows were produced; {} was not written.", output.display());
            }
        }
        Ok(None) => {
            println!("\nProcess interrupted by user. Data saved up to this point.");
        }
        Err(e) => {
            tracing::error!(error = %e, "Initial request failed");
            eprintln!("Error: {}", e);
            println!("Failed to fetch data.");
            std::process::exit(1);
        }
    }
}
