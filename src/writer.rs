//! Incremental CSV output
//!
//! The first batch truncates the destination and writes the header; later
//! batches append without one. Every call flushes and closes the file before
//! returning, so rows from earlier batches survive an interrupted run.

use crate::error::Result;
use crate::types::FlatRow;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Write `rows` to `destination`
///
/// When `first_batch` is true the file is truncated (or created) and a header
/// row is written first; otherwise rows are appended with no header. An empty
/// `rows` slice is a no-op that leaves the filesystem untouched.
///
/// Returns the number of rows written.
pub fn write_rows(rows: &[FlatRow], destination: &Path, first_batch: bool) -> Result<usize> {
    if rows.is_empty() {
        info!("No data to save in this batch");
        return Ok(0);
    }

    let file = if first_batch {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(destination)?
    } else {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(destination)?
    };

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(first_batch)
        .from_writer(file);

    for row in rows {
        wtr.serialize(row)?;
    }

    let file = wtr.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    info!(
        rows = rows.len(),
        path = %destination.display(),
        "Batch of {} rows saved to {}",
        rows.len(),
        destination.display()
    );
    Ok(rows.len())
}

/// Append-only CSV sink that tracks whether the header has been written
///
/// The header obligation stays pending until a batch actually produces rows,
/// so a leading empty batch cannot leave the file headerless.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    header_pending: bool,
    rows_written: u64,
}

impl CsvSink {
    /// Sink for a fresh run; the first non-empty batch truncates `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            header_pending: true,
            rows_written: 0,
        }
    }

    /// Destination file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written so far in this run
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Write one batch of rows
    pub fn write_batch(&mut self, rows: &[FlatRow]) -> Result<usize> {
        let written = write_rows(rows, &self.path, self.header_pending)?;
        if written > 0 {
            self.header_pending = false;
            self.rows_written += written as u64;
        }
        debug!(total_rows = self.rows_written, "CSV sink updated");
        Ok(written)
    }
}
