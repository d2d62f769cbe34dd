//! Core traits, data structures, and abstractions for merged ML datasets
//!
//! This crate provides the contracts the merge pipeline is built on: datasets
//! and their descriptors, category registries and how they are reconciled,
//! lazy single-pass streams and the builders producing them.

#![warn(missing_docs)]

pub mod builder;
pub mod categories;
pub mod dataset;
pub mod error;
pub mod sink;
pub mod source;

// Re-export key types for convenience
pub use builder::{BuildOptions, InMemoryStreamBuilder, OptionValue, StreamBuilder};
pub use categories::{merge_categories, CategoryRegistry, ValueSet};
pub use dataset::{Dataset, DatasetCard, DatasetInfo};
pub use error::{Error, Result};
pub use sink::{CollectingSink, Sink};
pub use source::{Datapoint, Source, Stream};
