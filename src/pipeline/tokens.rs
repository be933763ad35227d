//! Token estimation for batch sizing
//!
//! Approximates how many model tokens a rendered record will consume, so the
//! chunker can keep batches under the model's input budget. Estimates are
//! memoized in a bounded, process-local cache keyed by a cheap fingerprint of
//! the text.

use std::collections::{HashMap, VecDeque, hash_map::DefaultHasher};
use std::hash::{Hash, Hasher};

/// Default characters-per-token ratio for English prose
const DEFAULT_CHARS_PER_TOKEN: f32 = 4.0;

/// Default cache capacity in entries
const DEFAULT_CACHE_CAP: usize = 2048;

/// Estimation mode, traded off by input volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorMode {
    /// Fixed characters-per-token ratio. O(1) beyond the length lookup.
    Fast,

    /// Word-piece counting. Slower but closer to real tokenizer output;
    /// used for small inputs where precision matters more than speed.
    Precise,
}

/// Estimates the token count of serialized records.
///
/// Single-task use only; the pipeline owns one estimator per run, so the
/// cache needs no locking.
#[derive(Debug)]
pub struct TokenEstimator {
    mode: EstimatorMode,
    chars_per_token: f32,
    cache_cap: usize,
    cache: HashMap<u64, usize>,
    insertion_order: VecDeque<u64>,
}

impl TokenEstimator {
    /// Create an estimator with the default cache capacity
    pub fn new(mode: EstimatorMode) -> Self {
        Self::with_capacity(mode, DEFAULT_CACHE_CAP)
    }

    /// Create an estimator with an explicit cache capacity
    pub fn with_capacity(mode: EstimatorMode, cache_cap: usize) -> Self {
        Self {
            mode,
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
            cache_cap: cache_cap.max(1),
            cache: HashMap::new(),
            insertion_order: VecDeque::new(),
        }
    }

    /// Estimate the token count of `text`.
    ///
    /// Monotonic-ish: longer text never estimates lower than a prefix of
    /// itself by more than the mode's rounding. Runs in O(length).
    pub fn estimate(&mut self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        let key = fingerprint(text);
        if let Some(&cached) = self.cache.get(&key) {
            return cached;
        }

        let estimate = match self.mode {
            EstimatorMode::Fast => (text.len() as f32 / self.chars_per_token).ceil() as usize,
            EstimatorMode::Precise => word_piece_count(text),
        }
        .max(1);

        self.insert(key, estimate);
        estimate
    }

    /// Current number of cached estimates
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn insert(&mut self, key: u64, estimate: usize) {
        // Evict oldest on overflow
        if self.cache.len() >= self.cache_cap {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.cache.remove(&oldest);
            }
        }
        self.cache.insert(key, estimate);
        self.insertion_order.push_back(key);
    }
}

/// Count approximate word pieces: one token per word, extra pieces for long
/// words, and one per non-alphanumeric character.
fn word_piece_count(text: &str) -> usize {
    let mut tokens = 0;
    for word in text.split_whitespace() {
        let alphanumeric = word.chars().filter(|c| c.is_alphanumeric()).count();
        let punctuation = word.chars().count() - alphanumeric;
        tokens += 1 + alphanumeric.saturating_sub(5) / 4 + punctuation;
    }
    tokens
}

/// Cheap fingerprint: length plus a prefix/suffix sample, hashed.
///
/// Collisions only cost a slightly wrong estimate for one record, never a
/// correctness problem, so sampling beats hashing the whole text.
fn fingerprint(text: &str) -> u64 {
    let bytes = text.as_bytes();
    let mut hasher = DefaultHasher::new();
    bytes.len().hash(&mut hasher);
    bytes[..bytes.len().min(32)].hash(&mut hasher);
    bytes[bytes.len().saturating_sub(32)..].hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_zero_tokens() {
        let mut estimator = TokenEstimator::new(EstimatorMode::Fast);
        assert_eq!(estimator.estimate(""), 0);
    }

    #[test]
    fn test_fast_mode_uses_chars_per_token_ratio() {
        let mut estimator = TokenEstimator::new(EstimatorMode::Fast);
        // 40 chars / 4 chars per token
        assert_eq!(estimator.estimate(&"a".repeat(40)), 10);
        // Rounds up
        assert_eq!(estimator.estimate(&"b".repeat(41)), 11);
    }

    #[test]
    fn test_longer_text_never_estimates_lower() {
        for mode in [EstimatorMode::Fast, EstimatorMode::Precise] {
            let mut estimator = TokenEstimator::new(mode);
            let short = estimator.estimate("title tag missing on page");
            let long = estimator
                .estimate("title tag missing on page and the meta description is empty as well");
            assert!(long >= short, "mode {mode:?}: {long} < {short}");
        }
    }

    #[test]
    fn test_precise_mode_counts_punctuation_and_long_words() {
        let mut estimator = TokenEstimator::new(EstimatorMode::Precise);
        let plain = estimator.estimate("short words only here");
        let punctuated = estimator.estimate("short, words; only! here?");
        assert!(punctuated > plain);

        let long_word = estimator.estimate("internationalization");
        assert!(long_word > 1);
    }

    #[test]
    fn test_cache_hits_repeated_text() {
        let mut estimator = TokenEstimator::new(EstimatorMode::Fast);
        let text = "URL: https://a.test/\nTitle: Home";
        let first = estimator.estimate(text);
        assert_eq!(estimator.cache_len(), 1);
        assert_eq!(estimator.estimate(text), first);
        assert_eq!(estimator.cache_len(), 1);
    }

    #[test]
    fn test_cache_evicts_oldest_on_overflow() {
        let mut estimator = TokenEstimator::with_capacity(EstimatorMode::Fast, 2);
        estimator.estimate("first entry text");
        estimator.estimate("second entry text");
        assert_eq!(estimator.cache_len(), 2);

        estimator.estimate("third entry text");
        assert_eq!(estimator.cache_len(), 2);

        // Re-estimating the evicted text repopulates the cache
        estimator.estimate("first entry text");
        assert_eq!(estimator.cache_len(), 2);
    }
}
