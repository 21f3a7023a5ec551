//! Batch embedding generation.
//!
//! Items are embedded in fixed-size batches. Calls inside a batch run
//! concurrently; batches run one after another with a short pause so the
//! upstream provider's rate limit is respected. A failed item is logged and
//! dropped, it never fails the whole run.

use std::time::Duration;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::EmbeddingConfig;
use crate::core::EmbeddingVector;
use crate::search::embeddings::EmbeddingProvider;

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub batch_size: usize,
    /// Pause between consecutive batches (not after the last one).
    pub delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            delay: DEFAULT_BATCH_DELAY,
        }
    }
}

impl BatchOptions {
    #[must_use]
    pub const fn from_config(config: &EmbeddingConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            delay: config.batch_delay,
        }
    }
}

/// A successfully embedded item.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedItem {
    pub id: String,
    pub vector: EmbeddingVector,
}

/// Embed `(id, text)` pairs, returning only the successes in input order.
pub fn embed_batch(
    provider: &dyn EmbeddingProvider,
    items: &[(String, String)],
    options: &BatchOptions,
) -> Vec<EmbeddedItem> {
    let batch_size = options.batch_size.max(1);
    let total_batches = items.len().div_ceil(batch_size);
    let mut embedded = Vec::with_capacity(items.len());
    let mut failed = 0usize;

    for (batch_idx, batch) in items.chunks(batch_size).enumerate() {
        if batch_idx > 0 && !options.delay.is_zero() {
            std::thread::sleep(options.delay);
        }
        debug!(batch = batch_idx + 1, total_batches, size = batch.len(), "embedding batch");

        let results: Vec<_> = batch
            .par_iter()
            .map(|(id, text)| (id, provider.embed(text)))
            .collect();

        for (id, result) in results {
            match result {
                Ok(vector) => embedded.push(EmbeddedItem {
                    id: id.clone(),
                    vector,
                }),
                Err(err) => {
                    failed += 1;
                    warn!(id = %id, error = %err, "dropping item from embedding batch");
                }
            }
        }
    }

    info!(
        embedded = embedded.len(),
        failed,
        batches = total_batches,
        "batch embedding finished"
    );
    embedded
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Instant;

    use tracing::Level;

    use super::*;
    use crate::assert_log_contains;
    use crate::error::{MatchError, Result};
    use crate::search::embeddings::HashEmbedder;
    use crate::test_utils::logging::capture_logs;

    /// Fails for any text containing "fail" and records call order.
    struct FlakyProvider {
        inner: HashEmbedder,
        calls: Mutex<Vec<String>>,
    }

    impl FlakyProvider {
        fn new() -> Self {
            Self {
                inner: HashEmbedder::new(8),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl EmbeddingProvider for FlakyProvider {
        fn embed(&self, text: &str) -> Result<EmbeddingVector> {
            self.calls.lock().unwrap().push(text.to_string());
            if text.contains("fail") {
                return Err(MatchError::EmbeddingProvider("upstream 503".to_string()));
            }
            self.inner.embed(text)
        }

        fn dims(&self) -> usize {
            8
        }

        fn model(&self) -> &str {
            "flaky"
        }
    }

    fn items(n: usize) -> Vec<(String, String)> {
        (0..n)
            .map(|i| (format!("id-{i}"), format!("record number {i}")))
            .collect()
    }

    #[test]
    fn embeds_every_item_in_order() {
        let provider = HashEmbedder::new(16);
        let options = BatchOptions {
            batch_size: 10,
            delay: Duration::ZERO,
        };
        let out = embed_batch(&provider, &items(23), &options);
        assert_eq!(out.len(), 23);
        let ids: Vec<_> = out.iter().map(|item| item.id.clone()).collect();
        let expected: Vec<_> = (0..23).map(|i| format!("id-{i}")).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn failures_are_dropped_not_escalated() {
        let provider = FlakyProvider::new();
        let mut input = items(5);
        input[2].1 = "please fail".to_string();
        let options = BatchOptions {
            batch_size: 2,
            delay: Duration::ZERO,
        };
        let (out, logs) =
            capture_logs(Level::WARN, || embed_batch(&provider, &input, &options));
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|item| item.id != "id-2"));
        assert_eq!(provider.calls.lock().unwrap().len(), 5);

        assert_log_contains!(logs, Level::WARN, "dropping item from embedding batch");
        let dropped = logs.filter_by_level(Level::WARN);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].field("id"), Some("id-2"));
    }

    #[test]
    fn delay_applies_between_batches_only() {
        let provider = HashEmbedder::new(4);
        let options = BatchOptions {
            batch_size: 2,
            delay: Duration::from_millis(20),
        };
        let start = Instant::now();
        // Three batches, two pauses.
        let out = embed_batch(&provider, &items(5), &options);
        assert_eq!(out.len(), 5);
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn empty_input_is_empty_output() {
        let provider = HashEmbedder::new(4);
        assert!(embed_batch(&provider, &[], &BatchOptions::default()).is_empty());
    }
}
