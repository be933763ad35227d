//! Report aggregation
//!
//! Pure reduction of per-page analyses into the site-level report. No I/O and
//! no randomness: the same input list always produces the same report, and
//! averages, the histogram, and issue frequencies are independent of input
//! order. Top/bottom page lists are position-stable: ties keep the original
//! input order.

use std::collections::HashMap;

use chrono::Utc;
use tracing::instrument;

use crate::analysis::{PageAnalysis, Priority};
use crate::report::{IssueFrequency, PageSummary, PriorityCounts, ScoreBands, SiteReport};

/// Fixed mapping from well-known issues to priority actions. Matched by
/// substring against the normalized issue text; unknown issues fall back to
/// `Address: <issue>`.
const ISSUE_ACTIONS: [(&str, &str); 6] = [
    (
        "missing meta description",
        "Write unique meta descriptions (150-160 characters) for the affected pages",
    ),
    (
        "missing title",
        "Add descriptive, keyword-relevant title tags to the affected pages",
    ),
    (
        "missing h1",
        "Add a single clear H1 heading to each affected page",
    ),
    (
        "thin content",
        "Expand thin pages with substantive content (300+ words)",
    ),
    (
        "duplicate",
        "Consolidate or canonicalize duplicated content",
    ),
    (
        "non-200 status",
        "Fix or redirect pages returning error status codes",
    ),
];

/// Options for aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOptions {
    /// How many pages appear in the top and bottom lists
    pub top_n: usize,

    /// How many distinct issues the frequency table retains
    pub max_issue_kinds: usize,

    /// How many frequent issues are turned into priority actions
    pub max_actions: usize,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            top_n: 5,
            max_issue_kinds: 10,
            max_actions: 5,
        }
    }
}

/// Reduce all page analyses into a [`SiteReport`].
#[instrument(skip(pages, options), fields(pages = pages.len()))]
pub fn aggregate(pages: &[PageAnalysis], options: &AggregateOptions) -> SiteReport {
    let average_score = if pages.is_empty() {
        0.0
    } else {
        pages.iter().map(|p| p.score as f64).sum::<f64>() / pages.len() as f64
    };

    let mut priority_counts = PriorityCounts::default();
    let mut score_bands = ScoreBands::default();
    for page in pages {
        match page.priority {
            Priority::High => priority_counts.high += 1,
            Priority::Medium => priority_counts.medium += 1,
            Priority::Low => priority_counts.low += 1,
        }
        match page.score {
            90..=100 => score_bands.excellent += 1,
            80..=89 => score_bands.good += 1,
            70..=79 => score_bands.fair += 1,
            60..=69 => score_bands.needs_work += 1,
            _ => score_bands.poor += 1,
        }
    }

    let top_pages = ranked_pages(pages, options.top_n, true);
    let bottom_pages = ranked_pages(pages, options.top_n, false);

    let common_issues = issue_frequencies(pages, options.max_issue_kinds);
    let priority_actions = common_issues
        .iter()
        .take(options.max_actions)
        .map(|entry| action_for(&entry.issue))
        .collect();

    let narrative = template_narrative(pages.len(), average_score, &priority_counts, &common_issues);

    SiteReport {
        generated_at: Utc::now(),
        page_count: pages.len(),
        average_score,
        priority_counts,
        score_bands,
        top_pages,
        bottom_pages,
        common_issues,
        priority_actions,
        narrative,
    }
}

/// Best or worst `n` pages by score. Stable sort, so equal scores keep their
/// original input order.
fn ranked_pages(pages: &[PageAnalysis], n: usize, best_first: bool) -> Vec<PageSummary> {
    let mut order: Vec<usize> = (0..pages.len()).collect();
    if best_first {
        order.sort_by_key(|&i| std::cmp::Reverse(pages[i].score));
    } else {
        order.sort_by_key(|&i| pages[i].score);
    }

    order
        .into_iter()
        .take(n)
        .map(|i| PageSummary {
            url: pages[i].url.clone(),
            score: pages[i].score,
            priority: pages[i].priority,
        })
        .collect()
}

/// Case-normalized issue counts, most frequent first. Ties are broken
/// alphabetically so the table does not depend on input order.
fn issue_frequencies(pages: &[PageAnalysis], max_kinds: usize) -> Vec<IssueFrequency> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for page in pages {
        for issue in &page.issues {
            let normalized = issue.trim().to_lowercase();
            if !normalized.is_empty() {
                *counts.entry(normalized).or_insert(0) += 1;
            }
        }
    }

    let mut frequencies: Vec<IssueFrequency> = counts
        .into_iter()
        .map(|(issue, count)| IssueFrequency { issue, count })
        .collect();
    frequencies.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.issue.cmp(&b.issue)));
    frequencies.truncate(max_kinds);
    frequencies
}

fn action_for(issue: &str) -> String {
    for (needle, action) in ISSUE_ACTIONS {
        if issue.contains(needle) {
            return action.to_string();
        }
    }
    format!("Address: {issue}")
}

fn template_narrative(
    page_count: usize,
    average_score: f64,
    priorities: &PriorityCounts,
    issues: &[IssueFrequency],
) -> String {
    if page_count == 0 {
        return "No pages were analyzed in this audit.".to_string();
    }
    let top_issue = issues
        .first()
        .map(|entry| format!(" The most common issue is \"{}\" ({} pages).", entry.issue, entry.count))
        .unwrap_or_default();
    format!(
        "Audited {} pages with an average SEO score of {:.1}. {} pages need high-priority attention.{}",
        page_count, average_score, priorities.high, top_issue
    )
}
