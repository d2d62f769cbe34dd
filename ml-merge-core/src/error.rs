//! Error types for merged dataset pipelines

use std::io;
use thiserror::Error;

/// Result type for merged dataset operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for merged dataset operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error raised by a stream builder or an availability check
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not permitted in the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A dataset was handed over without its minimal descriptor
    #[error("Missing dataset descriptor: {0}")]
    MissingDescriptor(String),

    /// Fewer explicit streams than merged datasets
    #[error("Explicit streams must cover every dataset: got {streams} streams for {datasets} datasets")]
    InsufficientStreams {
        /// Number of streams passed
        streams: usize,
        /// Number of datasets merged
        datasets: usize,
    },

    /// Explicitly assigned streams were already drained by an earlier build
    #[error("Explicit streams have already been consumed")]
    StreamsConsumed,

    /// Split requested before the datasets were buffered
    #[error("Datasets need to be buffered before splitting")]
    NotBuffered,

    /// Requested split does not exist
    #[error("Unknown split: {0}")]
    UnknownSplit(String),

    /// A required build option was not supplied
    #[error("Missing build option: {0}")]
    MissingOption(String),

    /// Sub-category attached to a category that is not registered
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}
