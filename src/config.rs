//! Audit run configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::crawl::CrawlConfig;
use crate::error::{Error, Result};
use crate::pipeline::{ChunkLimits, DispatchOptions};
use crate::report::AggregateOptions;

/// Configuration for a full audit run.
///
/// Build one with [`AuditConfig::builder`], or [`AuditConfig::from_env`] to
/// pull the API key from the environment. [`validate`](AuditConfig::validate)
/// is called at the start of a run and fails fast on unusable settings.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// OpenAI API key
    pub openai_api_key: String,

    /// Model used for batch analysis and narrative synthesis
    pub model: String,

    /// Chunking thresholds and limits
    pub chunk_limits: ChunkLimits,

    /// Dispatcher concurrency and retry settings
    pub dispatch: DispatchOptions,

    /// Report aggregation settings
    pub aggregate: AggregateOptions,

    /// Overall deadline for the analysis phase; unset means no deadline
    pub run_timeout: Option<Duration>,

    /// Directory reports are written to
    pub output_dir: PathBuf,

    /// Crawler invocation settings
    pub crawl: CrawlConfig,
}

impl AuditConfig {
    /// Create a builder with an API key; everything else defaults.
    pub fn builder(openai_api_key: impl Into<String>) -> AuditConfigBuilder {
        AuditConfigBuilder {
            config: AuditConfig {
                openai_api_key: openai_api_key.into(),
                model: "gpt-4o-mini".to_string(),
                chunk_limits: ChunkLimits::default(),
                dispatch: DispatchOptions::default(),
                aggregate: AggregateOptions::default(),
                run_timeout: Some(Duration::from_secs(1800)),
                output_dir: PathBuf::from("reports"),
                crawl: CrawlConfig::default(),
            },
        }
    }

    /// Build a default configuration from the environment, reading the API
    /// key from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::Configuration("OPENAI_API_KEY is not set".to_string()))?;
        Ok(Self::builder(key).build())
    }

    /// Reject configurations that cannot produce a useful run.
    pub fn validate(&self) -> Result<()> {
        if self.openai_api_key.trim().is_empty() {
            return Err(Error::Configuration("API key is empty".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(Error::Configuration("model name is empty".to_string()));
        }
        if self.chunk_limits.batch_size == 0 {
            return Err(Error::Configuration(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.chunk_limits.token_limit == 0 {
            return Err(Error::Configuration(
                "token limit must be at least 1".to_string(),
            ));
        }
        if let Some(timeout) = self.run_timeout
            && timeout.is_zero()
        {
            return Err(Error::Configuration(
                "run timeout must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`AuditConfig`]
#[derive(Debug, Clone)]
pub struct AuditConfigBuilder {
    config: AuditConfig,
}

impl AuditConfigBuilder {
    /// Set the analysis model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set chunking limits
    pub fn chunk_limits(mut self, limits: ChunkLimits) -> Self {
        self.config.chunk_limits = limits;
        self
    }

    /// Set dispatch options
    pub fn dispatch(mut self, options: DispatchOptions) -> Self {
        self.config.dispatch = options;
        self
    }

    /// Set aggregation options
    pub fn aggregate(mut self, options: AggregateOptions) -> Self {
        self.config.aggregate = options;
        self
    }

    /// Set or clear the overall analysis deadline
    pub fn run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.run_timeout = timeout;
        self
    }

    /// Set the report output directory
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Set crawler settings
    pub fn crawl(mut self, crawl: CrawlConfig) -> Self {
        self.config.crawl = crawl;
        self
    }

    /// Finish building
    pub fn build(self) -> AuditConfig {
        self.config
    }
}
