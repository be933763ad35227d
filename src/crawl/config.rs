//! Configuration for the external crawler invocation

use std::path::PathBuf;

use crate::retry::RetryPolicy;

/// Configuration for launching the crawler CLI
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Path or name of the crawler binary
    pub binary_path: PathBuf,

    /// Directory the crawler writes its exports into
    pub output_dir: PathBuf,

    /// Export tabs requested from the crawler
    pub export_tabs: String,

    /// Whether to run the crawler without a UI
    pub headless: bool,

    /// Retry policy for the crawl invocation
    pub retry: RetryPolicy,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from("screamingfrogseospider"),
            output_dir: PathBuf::from("crawl-output"),
            export_tabs: "Internal:HTML".to_string(),
            headless: true,
            retry: RetryPolicy::default(),
        }
    }
}

/// Builder for CrawlConfig
#[derive(Debug, Default)]
pub struct CrawlConfigBuilder {
    config: CrawlConfig,
}

impl CrawlConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlConfig::default(),
        }
    }

    /// Set the crawler binary path
    pub fn binary_path(mut self, binary_path: impl Into<PathBuf>) -> Self {
        self.config.binary_path = binary_path.into();
        self
    }

    /// Set the directory the crawler writes exports into
    pub fn output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = output_dir.into();
        self
    }

    /// Set the export tabs requested from the crawler
    pub fn export_tabs(mut self, export_tabs: impl Into<String>) -> Self {
        self.config.export_tabs = export_tabs.into();
        self
    }

    /// Set whether the crawler runs headless
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set the retry policy for the crawl invocation
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CrawlConfig {
        self.config
    }
}

impl CrawlConfig {
    /// Create a new builder
    pub fn builder() -> CrawlConfigBuilder {
        CrawlConfigBuilder::new()
    }
}
