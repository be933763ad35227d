//! Record chunking
//!
//! Partitions the ordered sequence of page records into batches under either a
//! row-count cap or an estimated-token budget. Batches never overlap and
//! preserve input order: concatenating all batches, in order, reproduces the
//! input exactly.

use tracing::{debug, instrument};

use crate::crawl::PageRecord;
use crate::pipeline::Batch;
use crate::pipeline::config::ChunkLimits;
use crate::pipeline::tokens::{EstimatorMode, TokenEstimator};

/// How records are partitioned into batches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Exactly `batch_size` records per batch; the last batch may be smaller.
    /// No token estimation, so it is the cheapest strategy for large inputs.
    FixedSize {
        /// Records per batch
        batch_size: usize,
    },

    /// Greedily accumulate records while the summed token estimate stays
    /// within `token_limit`.
    TokenBounded {
        /// Estimated-token budget per batch
        token_limit: usize,
        /// Estimation mode to use
        mode: EstimatorMode,
    },
}

/// Pick a strategy from the input volume.
///
/// Small inputs afford precise token estimation, mid-sized inputs use the
/// fast approximation, and large inputs skip estimation entirely.
pub fn select_strategy(record_count: usize, limits: &ChunkLimits) -> ChunkStrategy {
    if record_count > limits.fixed_threshold {
        ChunkStrategy::FixedSize {
            batch_size: limits.batch_size,
        }
    } else if record_count >= limits.precise_threshold {
        ChunkStrategy::TokenBounded {
            token_limit: limits.token_limit,
            mode: EstimatorMode::Fast,
        }
    } else {
        ChunkStrategy::TokenBounded {
            token_limit: limits.token_limit,
            mode: EstimatorMode::Precise,
        }
    }
}

impl ChunkStrategy {
    /// Estimator matching this strategy's mode. Fixed-size chunking never
    /// consults it.
    pub fn estimator(&self) -> TokenEstimator {
        match self {
            ChunkStrategy::FixedSize { .. } => TokenEstimator::new(EstimatorMode::Fast),
            ChunkStrategy::TokenBounded { mode, .. } => TokenEstimator::new(*mode),
        }
    }
}

/// Partition `records` into batches according to `strategy`.
///
/// Every batch has at least one record and empty input produces zero batches.
/// A single record whose own estimate exceeds the token limit becomes its own
/// one-record batch rather than being dropped or looping.
#[instrument(skip(records, estimator), fields(records = records.len()))]
pub fn chunk(
    records: Vec<PageRecord>,
    strategy: &ChunkStrategy,
    estimator: &mut TokenEstimator,
) -> Vec<Batch> {
    if records.is_empty() {
        return Vec::new();
    }

    let batches = match strategy {
        ChunkStrategy::FixedSize { batch_size } => chunk_fixed(records, (*batch_size).max(1)),
        ChunkStrategy::TokenBounded { token_limit, .. } => {
            chunk_token_bounded(records, (*token_limit).max(1), estimator)
        }
    };

    debug!("created {} batches", batches.len());
    batches
}

fn chunk_fixed(records: Vec<PageRecord>, batch_size: usize) -> Vec<Batch> {
    let mut batches = Vec::with_capacity(records.len().div_ceil(batch_size));
    let mut current = Vec::with_capacity(batch_size);

    for record in records {
        current.push(record);
        if current.len() == batch_size {
            batches.push(Batch::new(batches.len(), std::mem::take(&mut current)));
        }
    }
    if !current.is_empty() {
        batches.push(Batch::new(batches.len(), current));
    }
    batches
}

fn chunk_token_bounded(
    records: Vec<PageRecord>,
    token_limit: usize,
    estimator: &mut TokenEstimator,
) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut current = Vec::new();
    let mut current_tokens = 0usize;

    for record in records {
        let cost = estimator.estimate(&record.render_for_analysis());

        // Close the running batch when this record would blow the budget.
        // An oversized record landing in an empty batch still goes in, so it
        // becomes a singleton batch instead of being dropped.
        if !current.is_empty() && current_tokens + cost > token_limit {
            batches.push(Batch::new(batches.len(), std::mem::take(&mut current)));
            current_tokens = 0;
        }

        current.push(record);
        current_tokens += cost;
    }

    if !current.is_empty() {
        batches.push(Batch::new(batches.len(), current));
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::test_record;

    fn records(n: usize) -> Vec<PageRecord> {
        (0..n)
            .map(|i| test_record(&format!("https://a.test/page-{i}")))
            .collect()
    }

    fn assert_partitions(input: &[PageRecord], batches: &[Batch]) {
        let flattened: Vec<&str> = batches
            .iter()
            .flat_map(|b| b.records.iter().map(|r| r.url.as_str()))
            .collect();
        let expected: Vec<&str> = input.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(flattened, expected, "batches must partition input in order");

        for (i, batch) in batches.iter().enumerate() {
            assert!(!batch.records.is_empty(), "batch {i} is empty");
            assert_eq!(batch.index, i);
        }
    }

    #[test]
    fn test_empty_input_produces_zero_batches() {
        let strategy = ChunkStrategy::FixedSize { batch_size: 5 };
        let mut estimator = strategy.estimator();
        assert!(chunk(Vec::new(), &strategy, &mut estimator).is_empty());
    }

    #[test]
    fn test_fixed_size_partitions_with_short_tail() {
        let input = records(13);
        let strategy = ChunkStrategy::FixedSize { batch_size: 5 };
        let mut estimator = strategy.estimator();

        let batches = chunk(input.clone(), &strategy, &mut estimator);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 5);
        assert_eq!(batches[1].len(), 5);
        assert_eq!(batches[2].len(), 3);
        assert_partitions(&input, &batches);
    }

    #[test]
    fn test_fixed_size_exact_multiple_has_no_empty_tail() {
        let input = records(10);
        let strategy = ChunkStrategy::FixedSize { batch_size: 5 };
        let mut estimator = strategy.estimator();

        let batches = chunk(input.clone(), &strategy, &mut estimator);
        assert_eq!(batches.len(), 2);
        assert_partitions(&input, &batches);
    }

    #[test]
    fn test_token_bounded_respects_budget() {
        let input = records(20);
        let mut estimator = TokenEstimator::new(EstimatorMode::Fast);
        let per_record = estimator.estimate(&input[0].render_for_analysis());

        let token_limit = per_record * 4;
        let strategy = ChunkStrategy::TokenBounded {
            token_limit,
            mode: EstimatorMode::Fast,
        };
        let batches = chunk(input.clone(), &strategy, &mut estimator);

        assert_partitions(&input, &batches);
        for batch in &batches {
            let total: usize = batch
                .records
                .iter()
                .map(|r| estimator.estimate(&r.render_for_analysis()))
                .sum();
            assert!(
                total <= token_limit || batch.len() == 1,
                "batch exceeds budget without being a singleton"
            );
        }
    }

    #[test]
    fn test_oversized_record_becomes_singleton_batch() {
        let mut input = records(3);
        // Make the middle record far larger than the budget
        input[1].meta_description = Some("x ".repeat(4000));

        let strategy = ChunkStrategy::TokenBounded {
            token_limit: 50,
            mode: EstimatorMode::Fast,
        };
        let mut estimator = strategy.estimator();
        let batches = chunk(input.clone(), &strategy, &mut estimator);

        assert_partitions(&input, &batches);
        let oversized = batches
            .iter()
            .find(|b| b.records.iter().any(|r| r.url == input[1].url))
            .unwrap();
        assert_eq!(oversized.len(), 1, "oversized record must be a singleton");
    }

    #[test]
    fn test_select_strategy_thresholds() {
        let limits = ChunkLimits::default();

        assert_eq!(
            select_strategy(50, &limits),
            ChunkStrategy::TokenBounded {
                token_limit: limits.token_limit,
                mode: EstimatorMode::Precise,
            }
        );
        assert_eq!(
            select_strategy(250, &limits),
            ChunkStrategy::TokenBounded {
                token_limit: limits.token_limit,
                mode: EstimatorMode::Fast,
            }
        );
        assert_eq!(
            select_strategy(800, &limits),
            ChunkStrategy::FixedSize {
                batch_size: limits.batch_size,
            }
        );
    }
}
