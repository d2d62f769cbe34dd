//! Merging several ML datasets into one
//!
//! [`MergeDataset`] reconciles the category taxonomies of its datasets and
//! chains their streams through a [`ConcatStreamBuilder`]. When randomized
//! splits are needed, the merged stream is buffered, shuffled and partitioned
//! into train/val/test splits served by name.

#![warn(missing_docs)]

pub mod concat;
pub mod merge;

pub use concat::ConcatStreamBuilder;
pub use merge::{MergeDataset, MergeMode, MERGE_DATASET_NAME};

// Re-export the pieces callers need alongside a merged dataset
pub use ml_merge_core::{
    BuildOptions, CategoryRegistry, Dataset, DatasetCard, DatasetInfo, Error, Result, Stream,
    StreamBuilder,
};
pub use ml_merge_shuffle::{BufferConfig, SplitConfig, SplitName, SplitSizes};

static_assertions::assert_impl_all!(MergeDataset<u64>: Send, Sync, Dataset<u64>);
static_assertions::assert_impl_all!(ConcatStreamBuilder<u64>: Send, Sync, StreamBuilder<u64>);
