//! Batch dispatch
//!
//! Drives the analysis model over all batches with windowed concurrency:
//! `concurrency_limit` calls run at once, the whole window is awaited before
//! the next one starts, and a fixed delay separates windows to respect the
//! API's coarse per-minute limits. Each call retries with backoff; a batch
//! that exhausts its retries degrades to deterministic fallback scoring and
//! the run continues. Outcomes always come back in input-batch order.

use futures::future;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::analysis::{AnalysisOutcome, ResponseParser};
use crate::llm::{BatchAnalyzer, LlmError};
use crate::pipeline::Batch;
use crate::pipeline::config::DispatchOptions;
use crate::retry::retry_with_policy;

/// Per-batch progress notification, sent as each outcome resolves
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Index of the finished batch
    pub batch_index: usize,

    /// Total number of batches in the run
    pub total_batches: usize,

    /// Number of pages in the finished batch
    pub pages: usize,

    /// Whether the batch degraded to fallback scoring
    pub degraded: bool,
}

/// Windowed, retrying scheduler for batch analysis calls
#[derive(Debug)]
pub struct BatchDispatcher {
    options: DispatchOptions,
    parser: ResponseParser,
}

impl BatchDispatcher {
    /// Create a dispatcher
    pub fn new(options: DispatchOptions) -> Self {
        Self {
            options,
            parser: ResponseParser::new(),
        }
    }

    /// Process every batch and return outcomes in input order.
    #[instrument(skip_all, fields(batches = batches.len()))]
    pub async fn process_all<A>(
        &self,
        batches: &[Batch],
        analyzer: &A,
        progress: Option<mpsc::Sender<ProgressUpdate>>,
    ) -> Vec<AnalysisOutcome>
    where
        A: BatchAnalyzer + Sync,
    {
        let mut outcomes = Vec::with_capacity(batches.len());
        self.process_into(batches, analyzer, &mut outcomes, progress)
            .await;
        outcomes
    }

    /// Process batches, pushing each window's outcomes into `outcomes` as it
    /// resolves.
    ///
    /// Outcomes are appended strictly in input order, so a caller that races
    /// this future against a timeout keeps every outcome resolved before the
    /// deadline and can degrade the rest.
    pub async fn process_into<A>(
        &self,
        batches: &[Batch],
        analyzer: &A,
        outcomes: &mut Vec<AnalysisOutcome>,
        progress: Option<mpsc::Sender<ProgressUpdate>>,
    ) where
        A: BatchAnalyzer + Sync,
    {
        let total_batches = batches.len();
        let window_size = self.options.concurrency_limit.max(1);

        for (window_index, window) in batches.chunks(window_size).enumerate() {
            // Backpressure between windows, not before the first one
            if window_index > 0 && !self.options.window_delay.is_zero() {
                tokio::time::sleep(self.options.window_delay).await;
            }

            let calls = window.iter().map(|batch| self.analyze_with_retry(batch, analyzer));
            let results = future::join_all(calls).await;

            // Collect positionally so outcome order matches batch order even
            // when calls within the window completed out of order
            for (batch, result) in window.iter().zip(results) {
                let outcome = match result {
                    Ok(raw) => {
                        let pages = self.parser.parse(&raw, &batch.records);
                        AnalysisOutcome::analyzed(batch.index, pages)
                    }
                    Err(err) => {
                        warn!(
                            "batch {} failed after {} attempts: {}; degrading to fallback scoring",
                            batch.index, self.options.retry.max_attempts, err
                        );
                        AnalysisOutcome::degraded(
                            batch.index,
                            &batch.records,
                            "Automated analysis unavailable (fallback scoring)",
                        )
                    }
                };

                if let Some(sender) = &progress {
                    let _ = sender
                        .send(ProgressUpdate {
                            batch_index: outcome.batch_index,
                            total_batches,
                            pages: outcome.pages.len(),
                            degraded: outcome.is_degraded(),
                        })
                        .await;
                }
                outcomes.push(outcome);
            }
        }

        let degraded = outcomes.iter().filter(|o| o.is_degraded()).count();
        info!(
            "dispatched {} batches ({} analyzed, {} degraded)",
            outcomes.len(),
            outcomes.len() - degraded,
            degraded
        );
    }

    async fn analyze_with_retry<A>(&self, batch: &Batch, analyzer: &A) -> Result<String, LlmError>
    where
        A: BatchAnalyzer + Sync,
    {
        retry_with_policy(&self.options.retry, || analyzer.analyze_batch(batch)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::OutcomeKind;
    use crate::crawl::{PageRecord, test_record};
    use crate::llm::SECTION_DELIMITER;
    use crate::report::SiteReport;
    use crate::retry::RetryPolicy;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn batches(n: usize) -> Vec<Batch> {
        (0..n)
            .map(|i| {
                Batch::new(
                    i,
                    vec![test_record(&format!("https://a.test/batch-{i}-page-0"))],
                )
            })
            .collect()
    }

    fn well_formed_response(records: &[PageRecord], score: u8) -> String {
        records
            .iter()
            .map(|r| format!("URL: {}\nSEO SCORE: {}\nPRIORITY: Medium", r.url, score))
            .collect::<Vec<_>>()
            .join(&format!("\n{SECTION_DELIMITER}\n"))
    }

    fn fast_options(concurrency: usize) -> DispatchOptions {
        DispatchOptions::builder()
            .concurrency_limit(concurrency)
            .window_delay(Duration::from_millis(10))
            .retry(RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(5),
                multiplier: 2.0,
                max_delay: Duration::from_millis(20),
            })
            .build()
    }

    /// Mock analyzer: per-batch delay, optional per-batch failure, and an
    /// in-flight high-water mark for concurrency assertions.
    struct MockAnalyzer {
        delays_ms: Vec<u64>,
        fail_batches: Vec<usize>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: Mutex<Vec<usize>>,
    }

    impl MockAnalyzer {
        fn new(delays_ms: Vec<u64>, fail_batches: Vec<usize>) -> Self {
            Self {
                delays_ms,
                fail_batches,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl BatchAnalyzer for MockAnalyzer {
        async fn analyze_batch(&self, batch: &Batch) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(batch.index);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            let delay = self.delays_ms.get(batch.index).copied().unwrap_or(1);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_batches.contains(&batch.index) {
                return Err(LlmError::MalformedResponse("mock failure".to_string()));
            }
            Ok(well_formed_response(&batch.records, 80))
        }

        async fn synthesize_narrative(&self, _report: &SiteReport) -> Result<String, LlmError> {
            Ok("mock narrative".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcomes_keep_input_order_despite_completion_order() {
        // Batch 0 resolves much slower than batch 1 in the same window
        let analyzer = MockAnalyzer::new(vec![500, 5], vec![]);
        let dispatcher = BatchDispatcher::new(fast_options(2));

        let input = batches(2);
        let outcomes = dispatcher.process_all(&input, &analyzer, None).await;

        let indices: Vec<usize> = outcomes.iter().map(|o| o.batch_index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(outcomes[0].pages[0].url, "https://a.test/batch-0-page-0");
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_concurrency_is_bounded() {
        let analyzer = MockAnalyzer::new(vec![20; 7], vec![]);
        let dispatcher = BatchDispatcher::new(fast_options(3));

        let outcomes = dispatcher.process_all(&batches(7), &analyzer, None).await;

        assert_eq!(outcomes.len(), 7);
        assert!(analyzer.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_batch_degrades_and_run_continues() {
        let analyzer = MockAnalyzer::new(vec![1; 3], vec![1]);
        let dispatcher = BatchDispatcher::new(fast_options(1));

        let outcomes = dispatcher.process_all(&batches(3), &analyzer, None).await;

        assert_eq!(outcomes.len(), 3);
        assert!(!outcomes[0].is_degraded());
        assert!(outcomes[1].is_degraded());
        assert!(!outcomes[2].is_degraded());

        // The degraded batch still produced a page analysis, scored by the
        // deterministic fallback, with the degradation visible in issue text
        let degraded_page = &outcomes[1].pages[0];
        assert_eq!(degraded_page.score, 100);
        assert!(degraded_page.issues[0].contains("fallback scoring"));

        // Failed batch was retried the full number of attempts
        let calls = analyzer.calls.lock().unwrap();
        assert_eq!(calls.iter().filter(|&&i| i == 1).count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_recovers_within_retries() {
        // Fails on the first call, succeeds on the second
        struct FlakyAnalyzer {
            calls: AtomicUsize,
        }
        impl BatchAnalyzer for FlakyAnalyzer {
            async fn analyze_batch(&self, batch: &Batch) -> Result<String, LlmError> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(LlmError::RateLimited {
                        retry_after_secs: 1,
                    })
                } else {
                    Ok(well_formed_response(&batch.records, 65))
                }
            }
            async fn synthesize_narrative(&self, _report: &SiteReport) -> Result<String, LlmError> {
                Ok(String::new())
            }
        }

        let analyzer = FlakyAnalyzer {
            calls: AtomicUsize::new(0),
        };
        let dispatcher = BatchDispatcher::new(fast_options(1));

        let outcomes = dispatcher.process_all(&batches(1), &analyzer, None).await;
        assert_eq!(outcomes[0].kind, OutcomeKind::Analyzed);
        assert_eq!(outcomes[0].pages[0].score, 65);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_updates_cover_every_batch() {
        let analyzer = MockAnalyzer::new(vec![1; 4], vec![2]);
        let dispatcher = BatchDispatcher::new(fast_options(2));
        let (sender, mut receiver) = mpsc::channel(16);

        let outcomes = dispatcher
            .process_all(&batches(4), &analyzer, Some(sender))
            .await;
        assert_eq!(outcomes.len(), 4);

        let mut updates = Vec::new();
        while let Ok(update) = receiver.try_recv() {
            updates.push(update);
        }
        assert_eq!(updates.len(), 4);
        assert!(updates.iter().all(|u| u.total_batches == 4));
        assert_eq!(updates.iter().filter(|u| u.degraded).count(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_list_yields_no_outcomes() {
        let analyzer = MockAnalyzer::new(vec![], vec![]);
        let dispatcher = BatchDispatcher::new(fast_options(2));

        let outcomes = dispatcher.process_all(&[], &analyzer, None).await;
        assert!(outcomes.is_empty());
    }
}
