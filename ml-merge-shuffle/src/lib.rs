//! Buffering, shuffling and splitting of merged data streams
//!
//! A stream is drained once into a [`BufferedCollection`] in uniformly random
//! order, which can then be partitioned into train/val/test splits served by
//! a [`SplitBuilder`].

#![warn(missing_docs)]

pub mod buffer;
pub mod split;

pub use buffer::{buffer_stream, seeded_rng, BufferConfig, BufferedCollection};
pub use split::{split_collection, SplitAssignment, SplitBuilder, SplitConfig, SplitName, SplitSizes};
