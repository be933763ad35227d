//! Error types for the siteaudit crate

use thiserror::Error;

use crate::crawl::CrawlError;
use crate::llm::LlmError;
use crate::report::ReportError;

/// Result type for siteaudit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for siteaudit operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or incomplete configuration, detected before any batch work begins
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Crawl invocation or crawl-export reading error
    #[error("crawl error: {0}")]
    Crawl(#[from] CrawlError),

    /// LLM API error that was not absorbed by retry or degraded scoring
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Report persistence error
    #[error("report error: {0}")]
    Report(#[from] ReportError),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
