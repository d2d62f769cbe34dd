//! Sink trait and the in-memory collecting sink used for buffering

use crate::error::Result;

/// A sink that consumes data items
pub trait Sink: Send {
    /// The type of items this sink consumes
    type Item;

    /// Consume a batch of items
    fn consume(&mut self, items: Vec<Self::Item>) -> Result<()>;

    /// Flush any buffered items and finalize
    fn flush(&mut self) -> Result<()>;

    /// Memory usage estimate in bytes
    fn memory_usage(&self) -> usize;
}

/// A sink that collects items in memory
#[derive(Debug)]
pub struct CollectingSink<T> {
    /// The collected items
    items: Vec<T>,
}

impl<T> CollectingSink<T> {
    /// Create a new empty collecting sink
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Create a new collecting sink with room for `capacity` items
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Get the collected items
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Number of collected items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing was collected yet
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Take ownership of the collected items
    pub fn take_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for CollectingSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Sink for CollectingSink<T> {
    type Item = T;

    fn consume(&mut self, items: Vec<Self::Item>) -> Result<()> {
        self.items.extend(items);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn memory_usage(&self) -> usize {
        // Shallow estimate: heap payloads owned by items are not counted
        self.items.capacity() * std::mem::size_of::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_in_order() {
        let mut sink = CollectingSink::new();
        sink.consume(vec![1, 2]).unwrap();
        sink.consume(vec![3]).unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.items(), &[1, 2, 3]);
        assert!(sink.memory_usage() >= 3 * std::mem::size_of::<i32>());
    }

    #[test]
    fn test_take_items() {
        let mut sink = CollectingSink::with_capacity(4);
        assert!(sink.is_empty());
        sink.consume(vec!["a", "b"]).unwrap();
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.take_items(), vec!["a", "b"]);
    }
}
