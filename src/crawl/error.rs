//! Error types for the crawl module

use std::path::PathBuf;
use thiserror::Error;

/// Error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The crawler process could not be launched or the filesystem failed
    #[error("failed to run crawler: {0}")]
    Io(#[from] std::io::Error),

    /// The crawler process exited with a failure status
    #[error("crawler exited with status {code:?}: {stderr}")]
    CrawlerExit {
        /// Process exit code, if one was reported
        code: Option<i32>,
        /// Trailing stderr output from the crawler
        stderr: String,
    },

    /// The crawler completed but the expected export file is missing
    #[error("crawl export not found at {0}")]
    ExportMissing(PathBuf),

    /// The export file could not be read as CSV
    #[error("failed to read crawl export: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is missing from the export header
    #[error("crawl export is missing required column '{0}'")]
    MissingColumn(&'static str),

    /// Every row in the export was malformed or empty
    #[error("no usable rows in crawl export ({skipped} rows skipped)")]
    NoUsableRows {
        /// Number of rows that were skipped as malformed
        skipped: usize,
    },
}
