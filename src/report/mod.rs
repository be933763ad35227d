//! Site report module
//!
//! Aggregation of per-page analyses into a site-level report, and report
//! persistence.

mod aggregate;
mod error;
mod persist;

pub use aggregate::{AggregateOptions, aggregate};
pub use error::ReportError;
pub use persist::{persist_report, site_slug};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::Priority;

/// Aggregate report for one audit run. Created once per run, written once,
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteReport {
    /// When the report was generated
    pub generated_at: DateTime<Utc>,

    /// Number of pages covered by the report
    pub page_count: usize,

    /// Mean score over all pages; 0 when there are none
    pub average_score: f64,

    /// How many pages landed in each priority
    pub priority_counts: PriorityCounts,

    /// Score distribution across fixed bands
    pub score_bands: ScoreBands,

    /// Best-scoring pages, ties broken by original position
    pub top_pages: Vec<PageSummary>,

    /// Worst-scoring pages, ties broken by original position
    pub bottom_pages: Vec<PageSummary>,

    /// Most frequent issues across the site, most common first
    pub common_issues: Vec<IssueFrequency>,

    /// Suggested actions derived from the most frequent issues
    pub priority_actions: Vec<String>,

    /// Narrative summary of the audit
    pub narrative: String,
}

/// Page counts per priority level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    /// Pages with High priority
    pub high: usize,

    /// Pages with Medium priority
    pub medium: usize,

    /// Pages with Low priority
    pub low: usize,
}

/// Histogram of scores over fixed bands
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBands {
    /// Scores 90 to 100
    pub excellent: usize,

    /// Scores 80 to 89
    pub good: usize,

    /// Scores 70 to 79
    pub fair: usize,

    /// Scores 60 to 69
    pub needs_work: usize,

    /// Scores below 60
    pub poor: usize,
}

/// One page's entry in a top/bottom list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSummary {
    /// Page URL
    pub url: String,

    /// SEO score
    pub score: u8,

    /// Priority of acting on the page
    pub priority: Priority,
}

/// One row of the issue-frequency table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFrequency {
    /// Normalized issue text
    pub issue: String,

    /// Number of pages reporting the issue
    pub count: usize,
}
