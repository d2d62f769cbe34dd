//! A dataset merging several datasets into one

use std::sync::Arc;

use rand::Rng;
use tracing::info;

use ml_merge_core::error::{Error, Result};
use ml_merge_core::{
    merge_categories, BuildOptions, CategoryRegistry, Datapoint, Dataset, DatasetInfo, Stream,
    StreamBuilder,
};
use ml_merge_shuffle::{
    buffer_stream, split_collection, BufferConfig, BufferedCollection, SplitBuilder, SplitConfig,
    SplitSizes,
};

use crate::concat::ConcatStreamBuilder;

/// Name reported by every merged dataset
pub const MERGE_DATASET_NAME: &str = "merge";

/// Which builder a [`MergeDataset`] currently serves its streams from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Builds chain the streams of all datasets with shared options
    Streaming,
    /// Builds chain explicitly passed streams
    ExplicitDataflow,
    /// A shuffled buffer exists and awaits splitting
    Buffered,
    /// Builds serve the train/val/test splits of the buffer, which stays
    /// available for splitting again
    Split,
}

enum MergeState<T> {
    Streaming,
    ExplicitDataflow,
    Buffered(BufferedCollection<T>),
    Split {
        buffer: BufferedCollection<T>,
        builder: Arc<SplitBuilder<T>>,
    },
}

/// Several datasets presented as a single one, ready to feed a training or
/// evaluation loop.
///
/// Categories are the union of all datasets' categories. A sub-category is
/// kept under a category only if every dataset defining the category also
/// has the sub-category.
///
/// Streams yield all datapoints of one dataset before moving on to the next.
/// To mix datasets, [`MergeDataset::buffer_datasets`] drains the merged stream
/// into a shuffled buffer which [`MergeDataset::split_datasets`] then divides
/// into train, val and optionally test splits. From then on the dataset's
/// builder serves those splits by name. The buffer is kept, so splitting again
/// re-partitions the same datapoints.
///
/// ```
/// use std::sync::Arc;
///
/// use ml_merge::MergeDataset;
/// use ml_merge_core::{
///     BuildOptions, Dataset, DatasetCard, DatasetInfo, InMemoryStreamBuilder, StreamBuilder,
/// };
/// use ml_merge_shuffle::{BufferConfig, SplitConfig};
///
/// let card = |name: &str, items: Vec<u32>| {
///     let builder: Arc<dyn StreamBuilder<u32>> = Arc::new(InMemoryStreamBuilder::new(items));
///     DatasetCard::new(DatasetInfo::new(name), builder)
/// };
/// let datasets: Vec<Arc<dyn Dataset<u32>>> = vec![
///     Arc::new(card("first", (0..10).collect())?),
///     Arc::new(card("second", (10..20).collect())?),
/// ];
///
/// let mut merged = MergeDataset::new(datasets)?;
/// merged.buffer_datasets(&BuildOptions::new(), &BufferConfig::default().with_seed(1))?;
/// merged.split_datasets(&SplitConfig::new(0.2, false).with_seed(1))?;
///
/// let train = merged.dataflow().build(&BuildOptions::new().split("train"))?;
/// assert!(train.count() <= 20);
/// # Ok::<(), ml_merge_core::Error>(())
/// ```
pub struct MergeDataset<T> {
    info: DatasetInfo,
    datasets: Vec<Arc<dyn Dataset<T>>>,
    categories: CategoryRegistry,
    concat: Arc<ConcatStreamBuilder<T>>,
    state: MergeState<T>,
}

impl<T: Datapoint> MergeDataset<T> {
    /// Merge `datasets`.
    ///
    /// Fails if no dataset is given or a dataset has no name.
    pub fn new(datasets: Vec<Arc<dyn Dataset<T>>>) -> Result<Self> {
        if datasets.is_empty() {
            return Err(Error::InvalidArgument(
                "At least one dataset is required for merging".into(),
            ));
        }
        for dataset in &datasets {
            dataset.info().validate()?;
        }

        let categories = merge_categories(datasets.iter().filter_map(|dataset| dataset.categories()));
        let concat = Arc::new(ConcatStreamBuilder::new(
            datasets.iter().map(|dataset| dataset.dataflow()).collect(),
            Some(categories.clone()),
        ));

        info!(
            datasets = datasets.len(),
            categories = categories.len(),
            "merged datasets"
        );

        Ok(Self {
            info: DatasetInfo::new(MERGE_DATASET_NAME),
            datasets,
            categories,
            concat,
            state: MergeState::Streaming,
        })
    }

    /// The merged datasets, in merge order
    pub fn datasets(&self) -> &[Arc<dyn Dataset<T>>] {
        &self.datasets
    }

    /// Current mode
    pub fn mode(&self) -> MergeMode {
        match self.state {
            MergeState::Streaming => MergeMode::Streaming,
            MergeState::ExplicitDataflow => MergeMode::ExplicitDataflow,
            MergeState::Buffered(_) => MergeMode::Buffered,
            MergeState::Split { .. } => MergeMode::Split,
        }
    }

    /// The shuffled buffer, if buffered
    pub fn buffered(&self) -> Option<&BufferedCollection<T>> {
        match &self.state {
            MergeState::Buffered(buffer) | MergeState::Split { buffer, .. } => Some(buffer),
            _ => None,
        }
    }

    /// Split sizes, once split
    pub fn split_sizes(&self) -> Option<SplitSizes> {
        match &self.state {
            MergeState::Split { builder, .. } => Some(builder.sizes()),
            _ => None,
        }
    }

    /// Pass one pre-built stream per dataset, or more.
    ///
    /// Lets each dataset be configured on its own, e.g. with a different
    /// split or size. Later builds chain these streams in the given order and
    /// ignore their options. The streams are single-pass and are consumed by
    /// the next build.
    pub fn explicit_dataflows(&mut self, streams: Vec<Stream<T>>) -> Result<()> {
        if matches!(self.state, MergeState::Split { .. }) {
            return Err(Error::InvalidOperation(
                "explicit streams cannot be passed once the datasets are split".into(),
            ));
        }

        let builders = self.datasets.iter().map(|dataset| dataset.dataflow()).collect();
        let concat = ConcatStreamBuilder::new(builders, Some(self.categories.clone()))
            .with_explicit_streams(streams)?;
        self.concat = Arc::new(concat);

        if matches!(self.state, MergeState::Streaming) {
            self.state = MergeState::ExplicitDataflow;
        }
        Ok(())
    }

    /// Drain the merged stream built with `options` into a shuffled buffer.
    ///
    /// Explicitly passed streams are buffered instead if present. Buffering
    /// again replaces the previous buffer with a fresh, independently shuffled
    /// one.
    pub fn buffer_datasets(&mut self, options: &BuildOptions, config: &BufferConfig) -> Result<()> {
        let mut rng = config.rng();
        self.buffer_datasets_with_rng(options, config, &mut rng)
    }

    /// [`MergeDataset::buffer_datasets`] with a caller supplied generator
    pub fn buffer_datasets_with_rng<R>(
        &mut self,
        options: &BuildOptions,
        config: &BufferConfig,
        rng: &mut R,
    ) -> Result<()>
    where
        R: Rng + ?Sized,
    {
        if matches!(self.state, MergeState::Split { .. }) {
            return Err(Error::InvalidOperation(
                "datasets are already split, merge them anew to buffer again".into(),
            ));
        }
        config.validate()?;

        let stream = self.concat.build(options)?;
        let collection = buffer_stream(stream, config, rng)?;
        self.state = MergeState::Buffered(collection);
        Ok(())
    }

    /// Split the buffer into train, val and, if `config.add_test`, test.
    ///
    /// May be called again to re-partition the same buffer with another
    /// config. Each datapoint is held out of train with probability `config.ratio`;
    /// with `add_test` the held-out datapoints alternate between val and test.
    /// Afterwards [`Dataset::dataflow`] serves the splits by name.
    pub fn split_datasets(&mut self, config: &SplitConfig) -> Result<()> {
        let mut rng = config.rng();
        self.split_datasets_with_rng(config, &mut rng)
    }

    /// [`MergeDataset::split_datasets`] with a caller supplied generator
    pub fn split_datasets_with_rng<R>(&mut self, config: &SplitConfig, rng: &mut R) -> Result<()>
    where
        R: Rng + ?Sized,
    {
        let buffer = self.buffered().ok_or(Error::NotBuffered)?;
        config.validate()?;

        let assignment = split_collection(buffer, config, rng)?;
        let builder = Arc::new(SplitBuilder::new(assignment, Some(self.categories.clone())));

        self.state = match std::mem::replace(&mut self.state, MergeState::Streaming) {
            MergeState::Buffered(buffer) | MergeState::Split { buffer, .. } => {
                MergeState::Split { buffer, builder }
            }
            other => other,
        };
        Ok(())
    }
}

impl<T: Datapoint> Dataset<T> for MergeDataset<T> {
    fn info(&self) -> &DatasetInfo {
        &self.info
    }

    fn dataflow(&self) -> Arc<dyn StreamBuilder<T>> {
        match &self.state {
            MergeState::Split { builder, .. } => Arc::clone(builder) as Arc<dyn StreamBuilder<T>>,
            _ => Arc::clone(&self.concat) as Arc<dyn StreamBuilder<T>>,
        }
    }

    fn categories(&self) -> Option<&CategoryRegistry> {
        Some(&self.categories)
    }
}
