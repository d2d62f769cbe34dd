//! Lazy, single-pass streams of datapoints and the batch-pulling source trait

use std::fmt;

use static_assertions::assert_impl_all;

use crate::error::{Error, Result};

/// An indivisible unit of training data.
///
/// The pipeline never looks inside a datapoint; it only moves and clones it.
pub trait Datapoint: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Datapoint for T {}

/// A source of data pulled in batches
pub trait Source: Send {
    /// The type of items produced by this source
    type Item;

    /// Retrieve the next batch of at most `max_batch_size` items.
    /// Returns None when exhausted
    fn next_batch(&mut self, max_batch_size: usize) -> Result<Option<Vec<Self::Item>>>;

    /// Provides a hint about the remaining number of items (if known)
    fn size_hint(&self) -> Option<usize> {
        None
    }
}

/// A lazy, single-pass sequence of datapoints.
///
/// A stream is exhausted once it returned `None`; obtain a fresh one from its
/// builder to iterate again.
pub struct Stream<T> {
    inner: Box<dyn Iterator<Item = T> + Send>,
}

impl<T: Send + 'static> Stream<T> {
    /// Wrap any sendable iterator
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self {
            inner: Box::new(items.into_iter()),
        }
    }

    /// A stream that yields nothing
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// Stream over an owned list
    pub fn from_vec(items: Vec<T>) -> Self {
        Self::new(items)
    }

    /// Chain streams end-to-end. A stream is only advanced once every stream
    /// before it is exhausted.
    pub fn concat(streams: Vec<Stream<T>>) -> Self {
        Self::new(streams.into_iter().flatten())
    }

    /// Truncate to at most `max` items; `None` leaves the stream unbounded
    #[must_use]
    pub fn limit(self, max: Option<usize>) -> Self {
        match max {
            Some(max) => Self::new(self.take(max)),
            None => self,
        }
    }
}

impl<T> Iterator for Stream<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("size_hint", &self.inner.size_hint())
            .finish_non_exhaustive()
    }
}

impl<T> Source for Stream<T> {
    type Item = T;

    fn next_batch(&mut self, max_batch_size: usize) -> Result<Option<Vec<T>>> {
        if max_batch_size == 0 {
            return Err(Error::InvalidArgument(
                "Batch size must be greater than 0".into(),
            ));
        }

        let batch: Vec<T> = self.inner.by_ref().take(max_batch_size).collect();
        if batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }

    fn size_hint(&self) -> Option<usize> {
        let (lower, upper) = self.inner.size_hint();
        upper.filter(|&upper| upper == lower)
    }
}

assert_impl_all!(Stream<u32>: Send, Iterator, Source);
