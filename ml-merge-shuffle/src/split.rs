//! Partitioning a buffered collection into train, val and test splits

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::distributions::{Bernoulli, Distribution};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use ml_merge_core::builder::stream_shared;
use ml_merge_core::error::{Error, Result};
use ml_merge_core::{BuildOptions, CategoryRegistry, Datapoint, Stream, StreamBuilder};

use crate::buffer::{seeded_rng, BufferedCollection};

/// Name of a split
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitName {
    /// Training split
    Train,
    /// Validation split
    Val,
    /// Test split
    Test,
}

impl SplitName {
    /// Lowercase name used in build options
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Val => "val",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for SplitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitName {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "train" => Ok(Self::Train),
            "val" => Ok(Self::Val),
            "test" => Ok(Self::Test),
            other => Err(Error::UnknownSplit(other.to_string())),
        }
    }
}

/// Configuration for splitting a buffered collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Probability of holding a datapoint out of the train split
    pub ratio: f64,

    /// Divide the held-out datapoints between val and test
    pub add_test: bool,

    /// Seed for the held-out draws; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            ratio: 0.1,
            add_test: true,
            seed: None,
        }
    }
}

impl SplitConfig {
    /// Create a config with an entropy-seeded generator
    pub fn new(ratio: f64, add_test: bool) -> Self {
        Self {
            ratio,
            add_test,
            seed: None,
        }
    }

    /// Fix the seed of the held-out draws
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the ratio is a probability
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.ratio) {
            return Err(Error::InvalidArgument(format!(
                "Split ratio must be in [0, 1], got {}",
                self.ratio
            )));
        }
        Ok(())
    }

    /// Random source for the held-out draws
    pub fn rng(&self) -> ChaCha8Rng {
        seeded_rng(self.seed)
    }
}

/// Number of datapoints per split
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSizes {
    /// Datapoints in the train split
    pub train: usize,
    /// Datapoints in the val split
    pub val: usize,
    /// Datapoints in the test split, zero when there is none
    pub test: usize,
}

impl SplitSizes {
    /// Datapoints over all splits
    pub fn total(&self) -> usize {
        self.train + self.val + self.test
    }
}

/// Disjoint cover of a buffered collection by named splits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitAssignment<T> {
    /// Train split
    pub train: Vec<T>,
    /// Val split
    pub val: Vec<T>,
    /// Test split, present only if requested
    pub test: Option<Vec<T>>,
}

impl<T> SplitAssignment<T> {
    /// Number of datapoints per split
    pub fn sizes(&self) -> SplitSizes {
        SplitSizes {
            train: self.train.len(),
            val: self.val.len(),
            test: self.test.as_ref().map_or(0, Vec::len),
        }
    }
}

/// Partition `collection` into splits, leaving the collection untouched.
///
/// Every datapoint is independently held out with probability `ratio`, so the
/// held-out share is only `ratio` in expectation. With `add_test` the held-out
/// datapoints alternate between val (even positions) and test (odd positions).
pub fn split_collection<T, R>(
    collection: &BufferedCollection<T>,
    config: &SplitConfig,
    rng: &mut R,
) -> Result<SplitAssignment<T>>
where
    T: Clone,
    R: Rng + ?Sized,
{
    config.validate()?;
    let held_out = Bernoulli::new(config.ratio)
        .map_err(|err| Error::InvalidArgument(err.to_string()))?;

    let mut train = Vec::new();
    let mut pool = Vec::new();
    for item in collection {
        if held_out.sample(rng) {
            pool.push(item.clone());
        } else {
            train.push(item.clone());
        }
    }

    let (val, test) = if config.add_test {
        let mut val = Vec::with_capacity(pool.len().div_ceil(2));
        let mut test = Vec::with_capacity(pool.len() / 2);
        for (position, item) in pool.into_iter().enumerate() {
            if position % 2 == 0 {
                val.push(item);
            } else {
                test.push(item);
            }
        }
        (val, Some(test))
    } else {
        (pool, None)
    };

    let assignment = SplitAssignment { train, val, test };
    let sizes = assignment.sizes();
    info!(
        train = sizes.train,
        val = sizes.val,
        test = sizes.test,
        "number of datapoints per split"
    );
    Ok(assignment)
}

/// Stream builder serving the splits of a buffered collection by name
pub struct SplitBuilder<T> {
    splits: BTreeMap<SplitName, Arc<Vec<T>>>,
    categories: Option<CategoryRegistry>,
}

impl<T: Datapoint> SplitBuilder<T> {
    /// Wrap a split assignment
    pub fn new(assignment: SplitAssignment<T>, categories: Option<CategoryRegistry>) -> Self {
        let SplitAssignment { train, val, test } = assignment;

        let mut splits = BTreeMap::new();
        splits.insert(SplitName::Train, Arc::new(train));
        splits.insert(SplitName::Val, Arc::new(val));
        if let Some(test) = test {
            splits.insert(SplitName::Test, Arc::new(test));
        }

        Self { splits, categories }
    }

    /// Names of the available splits
    pub fn split_names(&self) -> impl Iterator<Item = SplitName> + '_ {
        self.splits.keys().copied()
    }

    /// Number of datapoints in `split`, if it exists
    pub fn split_len(&self, split: SplitName) -> Option<usize> {
        self.splits.get(&split).map(|items| items.len())
    }

    /// Number of datapoints per split
    pub fn sizes(&self) -> SplitSizes {
        SplitSizes {
            train: self.split_len(SplitName::Train).unwrap_or(0),
            val: self.split_len(SplitName::Val).unwrap_or(0),
            test: self.split_len(SplitName::Test).unwrap_or(0),
        }
    }

    /// Stream at most `max_datapoints` datapoints of `split`
    pub fn stream(&self, split: SplitName, max_datapoints: Option<usize>) -> Result<Stream<T>> {
        let items = self
            .splits
            .get(&split)
            .ok_or_else(|| Error::UnknownSplit(split.to_string()))?;
        Ok(stream_shared(items, max_datapoints))
    }
}

impl<T: Datapoint> StreamBuilder<T> for SplitBuilder<T> {
    fn build(&self, options: &BuildOptions) -> Result<Stream<T>> {
        let split: SplitName = options
            .split
            .as_deref()
            .ok_or_else(|| Error::MissingOption("split".into()))?
            .parse()?;
        self.stream(split, options.max_datapoints)
    }

    fn categories(&self) -> Option<&CategoryRegistry> {
        self.categories.as_ref()
    }
}
