//! Draining a stream into a shuffled in-memory collection

use std::ops::Index;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ml_merge_core::error::{Error, Result};
use ml_merge_core::{CollectingSink, Sink, Source};

/// Configuration for buffering a stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Number of datapoints pulled from the stream at once
    pub batch_size: usize,

    /// Seed for the shuffle; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            batch_size: 1024,
            seed: None,
        }
    }
}

impl BufferConfig {
    /// Fix the shuffle seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check that batches can make progress
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidArgument(
                "Batch size must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Random source for the shuffle
    pub fn rng(&self) -> ChaCha8Rng {
        seeded_rng(self.seed)
    }
}

/// Deterministic generator for `Some(seed)`, entropy-seeded otherwise
pub fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    seed.map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64)
}

/// A finite, random-access snapshot of a drained stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedCollection<T> {
    items: Vec<T>,
}

impl<T> BufferedCollection<T> {
    /// Take `items` in their given order, without shuffling
    pub fn from_ordered(items: Vec<T>) -> Self {
        Self { items }
    }

    /// Number of buffered datapoints
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing was buffered
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Datapoint at `index`
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Iterate in buffered order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Buffered datapoints as a slice
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Give up the collection
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> Index<usize> for BufferedCollection<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a BufferedCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Drain `source` to exhaustion and shuffle the result uniformly.
///
/// Blocks until the source is exhausted. Memory grows with the number of
/// datapoints, so datapoints should not carry heavy payloads at this stage.
pub fn buffer_stream<S, R>(
    mut source: S,
    config: &BufferConfig,
    rng: &mut R,
) -> Result<BufferedCollection<S::Item>>
where
    S: Source,
    S::Item: Send,
    R: Rng + ?Sized,
{
    config.validate()?;
    let mut sink = CollectingSink::with_capacity(source.size_hint().unwrap_or(0));

    while let Some(batch) = source.next_batch(config.batch_size)? {
        sink.consume(batch)?;
    }
    sink.flush()?;

    debug!(
        datapoints = sink.len(),
        approx_bytes = sink.memory_usage(),
        "stream drained into buffer"
    );

    let mut items = sink.take_items();
    items.shuffle(rng);

    info!(datapoints = items.len(), "buffered and shuffled datapoints");
    Ok(BufferedCollection { items })
}
