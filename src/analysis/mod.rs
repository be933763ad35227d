//! Analysis results module
//!
//! Typed per-page analysis records derived from model responses, plus the
//! deterministic fallback used when a response cannot be parsed or a batch
//! exhausts its retries.

mod fallback;
mod parser;

pub use fallback::{fallback_analysis, fallback_score};
pub use parser::ResponseParser;

use serde::{Deserialize, Serialize};

use crate::crawl::PageRecord;

/// Findings for a single page. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageAnalysis {
    /// URL of the analyzed page
    pub url: String,

    /// SEO score, 0 to 100
    pub score: u8,

    /// Critical issues found on the page
    pub issues: Vec<String>,

    /// Small changes with outsized effect
    pub quick_wins: Vec<String>,

    /// Broader recommendations
    pub recommendations: Vec<String>,

    /// Urgency of acting on this page
    pub priority: Priority,

    /// Estimated impact of fixing the page, derived from score and priority
    pub estimated_impact: Impact,
}

/// Coarse urgency label attached to a page's findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    /// Needs attention now
    High,

    /// Worth scheduling
    #[default]
    Medium,

    /// Fine to defer
    Low,
}

impl Priority {
    /// Parse a priority from free text; anything unrecognized is Medium
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("high") {
            Priority::High
        } else if value.eq_ignore_ascii_case("low") {
            Priority::Low
        } else {
            Priority::Medium
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "High"),
            Priority::Medium => write!(f, "Medium"),
            Priority::Low => write!(f, "Low"),
        }
    }
}

/// Estimated impact of fixing a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Impact {
    /// Large expected improvement
    High,

    /// Moderate expected improvement
    Medium,

    /// Minor expected improvement
    Low,
}

/// Derive estimated impact from score and priority: the lower the score and
/// the higher the priority, the higher the impact.
pub fn estimated_impact(score: u8, priority: Priority) -> Impact {
    match priority {
        Priority::High => {
            if score < 70 {
                Impact::High
            } else {
                Impact::Medium
            }
        }
        Priority::Medium => {
            if score < 50 {
                Impact::High
            } else if score < 80 {
                Impact::Medium
            } else {
                Impact::Low
            }
        }
        Priority::Low => {
            if score < 40 {
                Impact::Medium
            } else {
                Impact::Low
            }
        }
    }
}

/// Result of analyzing one batch: one [`PageAnalysis`] per input page, plus
/// whether the pages came from the model or from fallback scoring.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// Index of the batch this outcome belongs to
    pub batch_index: usize,

    /// One analysis per page in the batch, in batch order
    pub pages: Vec<PageAnalysis>,

    /// Whether the model response was used or the batch degraded
    pub kind: OutcomeKind,
}

/// Provenance of a batch outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeKind {
    /// Pages were derived from a model response
    Analyzed,

    /// Retries were exhausted; pages carry deterministic fallback scores
    Degraded {
        /// Why the batch degraded
        reason: String,
    },
}

impl AnalysisOutcome {
    /// Outcome for a batch whose model response was parsed
    pub fn analyzed(batch_index: usize, pages: Vec<PageAnalysis>) -> Self {
        Self {
            batch_index,
            pages,
            kind: OutcomeKind::Analyzed,
        }
    }

    /// Degraded outcome built from fallback scoring over the raw records
    pub fn degraded(batch_index: usize, records: &[PageRecord], reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let pages = records
            .iter()
            .map(|record| fallback_analysis(record, &reason))
            .collect();
        Self {
            batch_index,
            pages,
            kind: OutcomeKind::Degraded { reason },
        }
    }

    /// Whether this outcome used fallback scoring
    pub fn is_degraded(&self) -> bool {
        matches!(self.kind, OutcomeKind::Degraded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::test_record;

    #[test]
    fn test_priority_parse() {
        assert_eq!(Priority::parse("High"), Priority::High);
        assert_eq!(Priority::parse("  low "), Priority::Low);
        assert_eq!(Priority::parse("medium"), Priority::Medium);
        assert_eq!(Priority::parse("urgent-ish"), Priority::Medium);
    }

    #[test]
    fn test_estimated_impact_rises_with_urgency() {
        assert_eq!(estimated_impact(40, Priority::High), Impact::High);
        assert_eq!(estimated_impact(85, Priority::High), Impact::Medium);
        assert_eq!(estimated_impact(40, Priority::Medium), Impact::High);
        assert_eq!(estimated_impact(65, Priority::Medium), Impact::Medium);
        assert_eq!(estimated_impact(90, Priority::Medium), Impact::Low);
        assert_eq!(estimated_impact(30, Priority::Low), Impact::Medium);
        assert_eq!(estimated_impact(75, Priority::Low), Impact::Low);
    }

    #[test]
    fn test_degraded_outcome_covers_every_record() {
        let records = vec![
            test_record("https://a.test/one"),
            test_record("https://a.test/two"),
        ];
        let outcome = AnalysisOutcome::degraded(4, &records, "analysis unavailable");

        assert!(outcome.is_degraded());
        assert_eq!(outcome.batch_index, 4);
        assert_eq!(outcome.pages.len(), 2);
        assert_eq!(outcome.pages[0].url, "https://a.test/one");
        assert!(
            outcome.pages[0]
                .issues
                .iter()
                .any(|i| i.contains("analysis unavailable"))
        );
    }
}
