//! LLM client module
//!
//! The analysis-model seam for the pipeline: a [`BatchAnalyzer`] trait the
//! dispatcher depends on, prompt rendering for batches and report narratives,
//! and the OpenAI-backed implementation.

mod error;
mod openai;

pub use error::LlmError;
pub use openai::{OpenAiClient, OpenAiOptions};

use std::future::Future;

use crate::pipeline::Batch;
use crate::report::SiteReport;

/// Delimiter line separating per-page sections in model responses
pub const SECTION_DELIMITER: &str = "---";

/// External analysis capability the dispatcher drives.
///
/// Implemented by [`OpenAiClient`] in production and by in-memory mocks in
/// tests; the dispatcher never knows which it is talking to.
pub trait BatchAnalyzer {
    /// Analyze one batch of pages, returning the model's raw text response
    fn analyze_batch(&self, batch: &Batch) -> impl Future<Output = Result<String, LlmError>> + Send;

    /// Produce a short narrative summary for an aggregated report
    fn synthesize_narrative(
        &self,
        report: &SiteReport,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;
}

/// Render the analysis prompt for a batch.
///
/// The response-format instructions here and the marker vocabulary in
/// `analysis::parser` are two halves of one contract; change them together.
pub fn render_batch_prompt(batch: &Batch) -> String {
    let mut prompt = String::from(
        "You are an experienced SEO auditor. Analyze every page below and respond for each page, in order, using exactly this template:\n\
         \n\
         URL: <page url>\n\
         SEO SCORE: <integer 0-100>\n\
         CRITICAL ISSUES:\n\
         - <issue>\n\
         QUICK WINS:\n\
         - <quick win>\n\
         RECOMMENDATIONS:\n\
         - <recommendation>\n\
         PRIORITY: <High|Medium|Low>\n\
         \n\
         Separate pages with a line containing only \"---\". Do not add any other commentary.\n\
         \n\
         Pages to analyze:\n\n",
    );

    for (i, record) in batch.records.iter().enumerate() {
        if i > 0 {
            prompt.push('\n');
            prompt.push_str(SECTION_DELIMITER);
            prompt.push('\n');
        }
        prompt.push_str(&record.render_for_analysis());
        prompt.push('\n');
    }
    prompt
}

/// Render the narrative-synthesis prompt from aggregate numbers
pub fn render_narrative_prompt(report: &SiteReport) -> String {
    let top_issues: Vec<String> = report
        .common_issues
        .iter()
        .take(5)
        .map(|issue| format!("{} ({} pages)", issue.issue, issue.count))
        .collect();

    format!(
        "Write a short narrative summary (one paragraph, plain text) of this SEO audit for a site owner.\n\
         Pages audited: {}\n\
         Average SEO score: {:.1}\n\
         High priority pages: {}\n\
         Most common issues: {}\n",
        report.page_count,
        report.average_score,
        report.priority_counts.high,
        if top_issues.is_empty() {
            "none".to_string()
        } else {
            top_issues.join(", ")
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::test_record;

    #[test]
    fn test_batch_prompt_contains_every_page_and_the_template() {
        let batch = Batch::new(
            0,
            vec![
                test_record("https://a.test/one"),
                test_record("https://a.test/two"),
            ],
        );
        let prompt = render_batch_prompt(&batch);

        assert!(prompt.contains("SEO SCORE:"));
        assert!(prompt.contains("CRITICAL ISSUES:"));
        assert!(prompt.contains("URL: https://a.test/one"));
        assert!(prompt.contains("URL: https://a.test/two"));
        // Records are separated by the section delimiter
        assert!(prompt.contains("\n---\n"));
    }
}
