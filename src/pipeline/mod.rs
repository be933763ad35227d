//! Batch processing pipeline
//!
//! This module turns the full sequence of page records into per-batch
//! analysis outcomes: token estimation, chunking into bounded batches, and
//! the windowed, retrying dispatch loop over the external analysis model.

mod chunking;
mod config;
mod dispatch;
mod tokens;

pub use chunking::{ChunkStrategy, chunk, select_strategy};
pub use config::{ChunkLimits, DispatchOptions};
pub use dispatch::{BatchDispatcher, ProgressUpdate};
pub use tokens::{EstimatorMode, TokenEstimator};

use crate::crawl::PageRecord;

/// An ordered, non-empty group of page records submitted together to the
/// external analysis call.
///
/// Batches partition the input: no overlap, original order preserved, and
/// concatenating all batches' records reproduces the input sequence.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Position of this batch within the run
    pub index: usize,

    /// The records in this batch, in input order
    pub records: Vec<PageRecord>,
}

impl Batch {
    /// Create a batch
    pub fn new(index: usize, records: Vec<PageRecord>) -> Self {
        Self { index, records }
    }

    /// Number of records in the batch
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch is empty; never true for batches the chunker emits
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
