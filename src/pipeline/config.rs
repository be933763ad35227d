//! Configuration for chunking and batch dispatch

use std::time::Duration;

use crate::retry::RetryPolicy;

/// Size limits and thresholds for partitioning records into batches
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkLimits {
    /// Records per batch for fixed-size chunking
    pub batch_size: usize,

    /// Estimated-token budget per batch for token-bounded chunking
    pub token_limit: usize,

    /// Below this record count, token-bounded chunking uses precise estimation
    pub precise_threshold: usize,

    /// Above this record count, fixed-size chunking is used for speed
    pub fixed_threshold: usize,
}

impl Default for ChunkLimits {
    fn default() -> Self {
        Self {
            batch_size: 8,
            token_limit: 3500,
            precise_threshold: 100,
            fixed_threshold: 500,
        }
    }
}

/// Builder for ChunkLimits
#[derive(Debug, Default)]
pub struct ChunkLimitsBuilder {
    limits: ChunkLimits,
}

impl ChunkLimitsBuilder {
    /// Create a new builder with default limits
    pub fn new() -> Self {
        Self {
            limits: ChunkLimits::default(),
        }
    }

    /// Set the records-per-batch cap for fixed-size chunking
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.limits.batch_size = batch_size;
        self
    }

    /// Set the estimated-token budget per batch
    pub fn token_limit(mut self, token_limit: usize) -> Self {
        self.limits.token_limit = token_limit;
        self
    }

    /// Set the record count below which precise estimation is used
    pub fn precise_threshold(mut self, precise_threshold: usize) -> Self {
        self.limits.precise_threshold = precise_threshold;
        self
    }

    /// Set the record count above which fixed-size chunking is used
    pub fn fixed_threshold(mut self, fixed_threshold: usize) -> Self {
        self.limits.fixed_threshold = fixed_threshold;
        self
    }

    /// Build the limits
    pub fn build(self) -> ChunkLimits {
        self.limits
    }
}

impl ChunkLimits {
    /// Create a new builder
    pub fn builder() -> ChunkLimitsBuilder {
        ChunkLimitsBuilder::new()
    }
}

/// Concurrency and retry options for the batch dispatcher
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOptions {
    /// Number of batches analyzed concurrently within one window
    pub concurrency_limit: usize,

    /// Delay between windows, as backpressure against coarse API rate limits
    pub window_delay: Duration,

    /// Retry policy applied to each batch analysis call
    pub retry: RetryPolicy,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            concurrency_limit: 3,
            window_delay: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }
}

/// Builder for DispatchOptions
#[derive(Debug, Default)]
pub struct DispatchOptionsBuilder {
    options: DispatchOptions,
}

impl DispatchOptionsBuilder {
    /// Create a new builder with default options
    pub fn new() -> Self {
        Self {
            options: DispatchOptions::default(),
        }
    }

    /// Set how many batches are analyzed concurrently within one window
    pub fn concurrency_limit(mut self, concurrency_limit: usize) -> Self {
        self.options.concurrency_limit = concurrency_limit.max(1);
        self
    }

    /// Set the delay between windows
    pub fn window_delay(mut self, window_delay: Duration) -> Self {
        self.options.window_delay = window_delay;
        self
    }

    /// Set the per-call retry policy
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.options.retry = retry;
        self
    }

    /// Build the options
    pub fn build(self) -> DispatchOptions {
        self.options
    }
}

impl DispatchOptions {
    /// Create a new builder
    pub fn builder() -> DispatchOptionsBuilder {
        DispatchOptionsBuilder::new()
    }
}
