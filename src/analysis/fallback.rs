//! Deterministic fallback scoring
//!
//! Used whenever the model's output is unavailable for a page: a batch that
//! exhausted its retries, a response section that failed to parse, or a page
//! the model omitted. Scores are computed from the crawl record alone, so the
//! same input always produces the same analysis.

use crate::analysis::{PageAnalysis, Priority, estimated_impact};
use crate::crawl::PageRecord;

/// Word count below which a page is considered thin content
const THIN_CONTENT_WORDS: u32 = 300;

/// Score a page from crawl data alone.
///
/// Starts at 50 and adds fixed bonuses: title +15, meta description +15,
/// H1 +10, word count above 300 +10, status 200 +10. Clamped to 0..=100.
pub fn fallback_score(record: &PageRecord) -> u8 {
    let mut score: i32 = 50;
    if has_text(&record.title) {
        score += 15;
    }
    if has_text(&record.meta_description) {
        score += 15;
    }
    if has_text(&record.h1) {
        score += 10;
    }
    if record.word_count > THIN_CONTENT_WORDS {
        score += 10;
    }
    if record.status_code == Some(200) {
        score += 10;
    }
    score.clamp(0, 100) as u8
}

/// Build a complete [`PageAnalysis`] for a page without model output.
///
/// The `reason` becomes the first issue so downstream consumers can tell
/// fallback-scored pages apart from fully analyzed ones.
pub fn fallback_analysis(record: &PageRecord, reason: &str) -> PageAnalysis {
    let score = fallback_score(record);
    let priority = if score < 50 {
        Priority::High
    } else if score < 70 {
        Priority::Medium
    } else {
        Priority::Low
    };

    let mut issues = vec![reason.to_string()];
    let mut quick_wins = Vec::new();

    if !has_text(&record.title) {
        issues.push("Missing title tag".to_string());
        quick_wins.push("Add a descriptive title tag".to_string());
    }
    if !has_text(&record.meta_description) {
        issues.push("Missing meta description".to_string());
        quick_wins.push("Write a meta description".to_string());
    }
    if !has_text(&record.h1) {
        issues.push("Missing H1 heading".to_string());
        quick_wins.push("Add an H1 heading".to_string());
    }
    if record.word_count <= THIN_CONTENT_WORDS {
        issues.push("Thin content".to_string());
    }
    if let Some(status) = record.status_code
        && status != 200
    {
        issues.push(format!("Non-200 status code ({status})"));
    }
    issues.truncate(5);
    quick_wins.truncate(3);

    PageAnalysis {
        url: record.url.clone(),
        score,
        issues,
        quick_wins,
        recommendations: vec!["Re-run a full analysis for this page".to_string()],
        priority,
        estimated_impact: estimated_impact(score, priority),
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}
