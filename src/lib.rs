//! `siteaudit` runs LLM-assisted SEO audits over crawled sites.
//!
//! The pipeline shells out to a crawler CLI, reads its CSV export into typed
//! page records, chunks the records into token-bounded batches, dispatches
//! the batches to an analysis model with bounded concurrency and retries,
//! parses the template-structured responses into per-page findings, and
//! aggregates everything into one site report written as JSON.
//!
//! Failures degrade rather than abort: a batch that exhausts its retries
//! falls back to deterministic heuristic scoring, so a run always produces a
//! complete report.
//!
//! ```no_run
//! use siteaudit::audit::run_audit;
//! use siteaudit::config::AuditConfig;
//! use siteaudit::crawl::{read_page_rows, run_crawler};
//! use siteaudit::llm::{OpenAiClient, OpenAiOptions};
//!
//! # async fn run() -> siteaudit::Result<()> {
//! let config = AuditConfig::from_env()?;
//!
//! let export = run_crawler("https://example.com", &config.crawl).await?;
//! let records = read_page_rows(&export)?;
//!
//! let analyzer = OpenAiClient::new(OpenAiOptions::new(
//!     config.openai_api_key.clone(),
//!     config.model.clone(),
//! ));
//! let summary = run_audit(&config, "https://example.com", records, &analyzer, None).await?;
//!
//! println!(
//!     "audited {} pages, average score {:.1}",
//!     summary.report.page_count, summary.report.average_score
//! );
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod audit;
pub mod config;
pub mod crawl;
mod error;
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod retry;

pub use error::{Error, Result};

/// Convenience re-exports of the types most callers need
pub mod prelude {
    pub use crate::analysis::{PageAnalysis, Priority};
    pub use crate::audit::{AuditSummary, run_audit};
    pub use crate::config::AuditConfig;
    pub use crate::crawl::{PageRecord, read_page_rows, run_crawler};
    pub use crate::error::{Error, Result};
    pub use crate::llm::{BatchAnalyzer, OpenAiClient, OpenAiOptions};
    pub use crate::pipeline::ProgressUpdate;
    pub use crate::report::SiteReport;
}
