//! Stream builder chaining the builders of several datasets

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use ml_merge_core::error::{Error, Result};
use ml_merge_core::{BuildOptions, CategoryRegistry, Datapoint, Stream, StreamBuilder};

/// Explicitly assigned streams, consumed by the first build
enum ExplicitStreams<T> {
    Unset,
    Pending(Vec<Stream<T>>),
    Consumed,
}

/// Presents several stream builders as one.
///
/// Each build yields every datapoint of the first source before any of the
/// second, and so on. Once explicit streams are assigned they take precedence
/// over the builders and the build options are ignored.
pub struct ConcatStreamBuilder<T> {
    builders: Vec<Arc<dyn StreamBuilder<T>>>,
    categories: Option<CategoryRegistry>,
    explicit: Mutex<ExplicitStreams<T>>,
}

impl<T: Datapoint> ConcatStreamBuilder<T> {
    /// Chain `builders`, exposing `categories` as the merged taxonomy
    pub fn new(builders: Vec<Arc<dyn StreamBuilder<T>>>, categories: Option<CategoryRegistry>) -> Self {
        Self {
            builders,
            categories,
            explicit: Mutex::new(ExplicitStreams::Unset),
        }
    }

    /// Replace the builders' output by pre-built streams.
    ///
    /// At least one stream per underlying builder is required.
    pub fn with_explicit_streams(self, streams: Vec<Stream<T>>) -> Result<Self> {
        if streams.len() < self.builders.len() {
            return Err(Error::InsufficientStreams {
                streams: streams.len(),
                datasets: self.builders.len(),
            });
        }

        Ok(Self {
            explicit: Mutex::new(ExplicitStreams::Pending(streams)),
            ..self
        })
    }

    /// Number of chained builders
    pub fn builder_count(&self) -> usize {
        self.builders.len()
    }

    /// Whether explicit streams were assigned, consumed or not
    pub fn is_explicit(&self) -> bool {
        let explicit = self.explicit.lock().unwrap_or_else(PoisonError::into_inner);
        !matches!(*explicit, ExplicitStreams::Unset)
    }
}

impl<T: Datapoint> StreamBuilder<T> for ConcatStreamBuilder<T> {
    fn build(&self, options: &BuildOptions) -> Result<Stream<T>> {
        let mut explicit = self
            .explicit
            .lock()
            .map_err(|_| Error::InvalidOperation("explicit stream slot is poisoned".into()))?;

        match std::mem::replace(&mut *explicit, ExplicitStreams::Consumed) {
            ExplicitStreams::Pending(streams) => {
                info!(
                    streams = streams.len(),
                    "using explicitly passed streams, build options are ignored"
                );
                Ok(Stream::concat(streams))
            }
            ExplicitStreams::Consumed => Err(Error::StreamsConsumed),
            ExplicitStreams::Unset => {
                *explicit = ExplicitStreams::Unset;
                drop(explicit);

                info!(
                    builders = self.builders.len(),
                    "using the same build options for all streams"
                );
                debug!(?options, "build options");

                let streams = self
                    .builders
                    .iter()
                    .map(|builder| builder.build(options))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Stream::concat(streams))
            }
        }
    }

    fn categories(&self) -> Option<&CategoryRegistry> {
        self.categories.as_ref()
    }
}
