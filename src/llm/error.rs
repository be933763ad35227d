//! Error types for the LLM client

use thiserror::Error;

/// Error type for analysis-model calls.
///
/// The dispatcher treats every variant the same way: retry with backoff, then
/// degrade the batch to fallback scoring. The split exists for logging and for
/// callers that want to distinguish throttling from hard failures.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network-level failure reaching the API
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API throttled the request
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds the API asked us to wait
        retry_after_secs: u64,
    },

    /// The API returned a non-success status
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message body, truncated
        message: String,
    },

    /// The API answered 2xx but the body was not the expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}
