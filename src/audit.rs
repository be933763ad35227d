//! Audit orchestration
//!
//! Ties the stages together: chunk the crawled records, dispatch batches to
//! the analysis model, aggregate the per-page results into a site report,
//! synthesize a narrative, and persist the report. Failures past the chunking
//! stage degrade rather than abort: an exhausted batch falls back to
//! deterministic scoring, a failed narrative call keeps the template text,
//! and a failed report write still returns the in-memory report.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use crate::analysis::AnalysisOutcome;
use crate::config::AuditConfig;
use crate::crawl::PageRecord;
use crate::error::{Error, Result};
use crate::llm::BatchAnalyzer;
use crate::pipeline::{BatchDispatcher, ProgressUpdate, chunk, select_strategy};
use crate::report::{SiteReport, aggregate, persist_report, site_slug};

/// Result of a completed audit run
#[derive(Debug)]
pub struct AuditSummary {
    /// The aggregate site report
    pub report: SiteReport,

    /// Where the report was written, if persistence succeeded
    pub report_path: Option<PathBuf>,

    /// How many batches fell back to deterministic scoring
    pub degraded_batches: usize,
}

/// Run the analysis pipeline over already-crawled records.
///
/// `site_url` names the audited site and only affects the report filename.
/// Progress updates are sent per batch when a sender is supplied.
#[instrument(skip_all, fields(site = site_url, records = records.len()))]
pub async fn run_audit<A>(
    config: &AuditConfig,
    site_url: &str,
    records: Vec<PageRecord>,
    analyzer: &A,
    progress: Option<mpsc::Sender<ProgressUpdate>>,
) -> Result<AuditSummary>
where
    A: BatchAnalyzer + Sync,
{
    config.validate()?;
    if records.is_empty() {
        return Err(Error::Other("no pages to audit".to_string()));
    }

    let strategy = select_strategy(records.len(), &config.chunk_limits);
    let mut estimator = strategy.estimator();
    let batches = chunk(records, &strategy, &mut estimator);
    info!(
        "chunked into {} batches using {:?}",
        batches.len(),
        strategy
    );

    let dispatcher = BatchDispatcher::new(config.dispatch.clone());
    let mut outcomes: Vec<AnalysisOutcome> = Vec::with_capacity(batches.len());

    let dispatch = dispatcher.process_into(&batches, analyzer, &mut outcomes, progress.clone());
    match config.run_timeout {
        Some(deadline) => {
            if tokio::time::timeout(deadline, dispatch).await.is_err() {
                warn!(
                    "analysis deadline of {:?} expired with {} of {} batches resolved; degrading the rest",
                    deadline,
                    outcomes.len(),
                    batches.len()
                );
            }
        }
        None => dispatch.await,
    }

    // Batches the deadline cut off still get deterministic fallback results
    for batch in &batches[outcomes.len()..] {
        let outcome = AnalysisOutcome::degraded(
            batch.index,
            &batch.records,
            "Analysis deadline exceeded (fallback scoring)",
        );
        if let Some(sender) = &progress {
            let _ = sender
                .send(ProgressUpdate {
                    batch_index: outcome.batch_index,
                    total_batches: batches.len(),
                    pages: outcome.pages.len(),
                    degraded: true,
                })
                .await;
        }
        outcomes.push(outcome);
    }

    let degraded_batches = outcomes.iter().filter(|o| o.is_degraded()).count();
    let pages: Vec<_> = outcomes.into_iter().flat_map(|o| o.pages).collect();

    let mut report = aggregate(&pages, &config.aggregate);

    match analyzer.synthesize_narrative(&report).await {
        Ok(text) if !text.trim().is_empty() => report.narrative = text,
        Ok(_) => warn!("narrative synthesis returned empty text; keeping template summary"),
        Err(err) => warn!("narrative synthesis failed: {err}; keeping template summary"),
    }

    let slug = site_slug(site_url);
    let report_path = match persist_report(&config.output_dir, &slug, &report).await {
        Ok(path) => Some(path),
        Err(err) => {
            error!("failed to persist report: {err}");
            None
        }
    };

    info!(
        "audit complete: {} pages, average score {:.1}, {} degraded batches",
        report.page_count, report.average_score, degraded_batches
    );

    Ok(AuditSummary {
        report,
        report_path,
        degraded_batches,
    })
}
