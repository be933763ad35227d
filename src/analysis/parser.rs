//! Model response parsing
//!
//! The analysis model is instructed to answer with one marker-delimited
//! section per page (`URL:`, `SEO SCORE:`, `CRITICAL ISSUES:`, `QUICK WINS:`,
//! `RECOMMENDATIONS:`, `PRIORITY:`, separated by `---` lines). Model output is
//! free text, so every extraction step has an explicit fallback: a missing
//! score is recomputed deterministically, a missing priority defaults to
//! Medium, and a page whose section is absent or unreadable gets a complete
//! fallback analysis. No page is ever dropped.

use std::collections::HashMap;

use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::analysis::fallback::{fallback_analysis, fallback_score};
use crate::analysis::{PageAnalysis, Priority, estimated_impact};
use crate::crawl::PageRecord;

/// Issue text attached to pages that had to be fallback-scored during parsing
pub const PARSE_INCOMPLETE: &str = "Analysis parsing incomplete";

const MAX_ISSUES: usize = 5;
const MAX_QUICK_WINS: usize = 3;
const MAX_RECOMMENDATIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Url,
    Score,
    Issues,
    QuickWins,
    Recommendations,
    Priority,
}

/// Label markers, matched case-insensitively at the start of a line
const LABELS: [(&str, Label); 6] = [
    ("URL:", Label::Url),
    ("SEO SCORE:", Label::Score),
    ("CRITICAL ISSUES:", Label::Issues),
    ("QUICK WINS:", Label::QuickWins),
    ("RECOMMENDATIONS:", Label::Recommendations),
    ("PRIORITY:", Label::Priority),
];

/// Parses raw model responses into per-page analyses
#[derive(Debug)]
pub struct ResponseParser {
    score_re: Regex,
    bullet_re: Regex,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseParser {
    /// Create a parser with the fixed marker vocabulary
    pub fn new() -> Self {
        Self {
            score_re: Regex::new(r"\d{1,3}").expect("score regex must compile"),
            bullet_re: Regex::new(r"^\s*(?:[-*•]+|\d+[.)])\s*").expect("bullet regex must compile"),
        }
    }

    /// Parse a batch response into one [`PageAnalysis`] per input record.
    ///
    /// Sections are matched to records by URL where the model echoed one, and
    /// by position otherwise; the section count may legitimately differ from
    /// the batch size when the model merged or omitted pages.
    #[instrument(skip(self, raw, batch), fields(batch_len = batch.len()))]
    pub fn parse(&self, raw: &str, batch: &[PageRecord]) -> Vec<PageAnalysis> {
        let sections = split_sections(raw);
        if sections.len() != batch.len() {
            debug!(
                "response has {} sections for {} pages; aligning best-effort",
                sections.len(),
                batch.len()
            );
        }

        // First pass: claim sections whose echoed URL matches a record.
        let mut by_url: HashMap<String, usize> = HashMap::new();
        for (index, section) in sections.iter().enumerate() {
            if let Some(url) = &section.url {
                by_url.entry(normalize_url(url)).or_insert(index);
            }
        }

        let mut used = vec![false; sections.len()];
        let mut chosen: Vec<Option<usize>> = vec![None; batch.len()];
        for (i, record) in batch.iter().enumerate() {
            if let Some(&index) = by_url.get(&normalize_url(&record.url))
                && !used[index]
            {
                chosen[i] = Some(index);
                used[index] = true;
            }
        }

        // Second pass: hand remaining sections to unmatched records in order.
        let mut free = (0..sections.len()).filter(|&s| !used[s]);
        for slot in chosen.iter_mut() {
            if slot.is_none() {
                *slot = free.next();
            }
        }

        batch
            .iter()
            .zip(chosen)
            .map(|(record, section)| match section {
                Some(index) => self.parse_section(&sections[index].text, record),
                None => {
                    warn!("no response section for {}; using fallback", record.url);
                    fallback_analysis(record, PARSE_INCOMPLETE)
                }
            })
            .collect()
    }

    /// Extract one page's analysis from its section text. Infallible: every
    /// missing field has a deterministic default.
    fn parse_section(&self, text: &str, record: &PageRecord) -> PageAnalysis {
        let mut score: Option<u8> = None;
        let mut priority: Option<Priority> = None;
        let mut issues = Vec::new();
        let mut quick_wins = Vec::new();
        let mut recommendations = Vec::new();
        let mut current_list: Option<Label> = None;

        for line in text.lines() {
            if let Some((label, rest)) = split_label(line) {
                current_list = None;
                match label {
                    Label::Url => {}
                    Label::Score => {
                        score = self
                            .score_re
                            .find(rest)
                            .and_then(|m| m.as_str().parse::<u16>().ok())
                            .map(|value| value.min(100) as u8);
                    }
                    Label::Priority => priority = Some(Priority::parse(rest)),
                    Label::Issues | Label::QuickWins | Label::Recommendations => {
                        current_list = Some(label);
                        if !rest.is_empty() {
                            self.push_item(label, rest, &mut issues, &mut quick_wins, &mut recommendations);
                        }
                    }
                }
            } else if let Some(list) = current_list {
                let item = self.bullet_re.replace(line, "");
                let item = item.trim();
                if !item.is_empty() {
                    self.push_item(list, item, &mut issues, &mut quick_wins, &mut recommendations);
                }
            }
        }

        issues.truncate(MAX_ISSUES);
        quick_wins.truncate(MAX_QUICK_WINS);
        recommendations.truncate(MAX_RECOMMENDATIONS);

        let score = score.unwrap_or_else(|| fallback_score(record));
        let priority = priority.unwrap_or_default();

        PageAnalysis {
            url: record.url.clone(),
            score,
            issues,
            quick_wins,
            recommendations,
            priority,
            estimated_impact: estimated_impact(score, priority),
        }
    }

    fn push_item(
        &self,
        label: Label,
        item: &str,
        issues: &mut Vec<String>,
        quick_wins: &mut Vec<String>,
        recommendations: &mut Vec<String>,
    ) {
        let target = match label {
            Label::Issues => issues,
            Label::QuickWins => quick_wins,
            Label::Recommendations => recommendations,
            _ => return,
        };
        target.push(item.to_string());
    }
}

/// A candidate per-page section of the raw response
struct Section {
    text: String,
    url: Option<String>,
}

/// Split raw text on `---` delimiter lines, keeping only sections that
/// contain at least one known label. Preamble or trailing chatter from the
/// model is discarded here.
fn split_sections(raw: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = String::new();

    for line in raw.lines() {
        if is_delimiter(line) {
            push_section(&mut sections, std::mem::take(&mut current));
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    push_section(&mut sections, current);
    sections
}

fn push_section(sections: &mut Vec<Section>, text: String) {
    let has_label = text.lines().any(|line| split_label(line).is_some());
    if !has_label {
        return;
    }
    let url = text.lines().find_map(|line| match split_label(line) {
        Some((Label::Url, rest)) if !rest.is_empty() => Some(rest.to_string()),
        _ => None,
    });
    sections.push(Section { text, url });
}

/// A delimiter line is nothing but three or more dashes
fn is_delimiter(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-')
}

/// Match a known label at the start of a line, tolerating markdown emphasis
/// and heading characters the model sometimes adds.
fn split_label(line: &str) -> Option<(Label, &str)> {
    let trimmed = line.trim_start_matches(['*', '#', '>', ' ']).trim_end();
    let upper = trimmed.to_ascii_uppercase();
    for (prefix, label) in LABELS {
        if upper.starts_with(prefix) {
            let rest = trimmed[prefix.len()..].trim_matches(['*', ' ']);
            return Some((label, rest));
        }
    }
    None
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_ascii_lowercase()
}
