//! Error types for report persistence

use thiserror::Error;

/// Error type for report operations
#[derive(Debug, Error)]
pub enum ReportError {
    /// Filesystem failure while writing the report
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    /// The report could not be serialized
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}
