//! Dataset descriptors

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::builder::StreamBuilder;
use crate::categories::CategoryRegistry;
use crate::error::{Error, Result};

/// Descriptive metadata of a dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Dataset name, the only mandatory field
    pub name: String,

    /// Where the dataset can be downloaded
    #[serde(default)]
    pub url: Option<String>,

    /// Free text description
    #[serde(default)]
    pub description: Option<String>,

    /// License the data is published under
    #[serde(default)]
    pub license: Option<String>,

    /// Split name to the dataset's own split identifier
    #[serde(default)]
    pub splits: BTreeMap<String, String>,
}

impl DatasetInfo {
    /// Create a descriptor with only a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the download location
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Map a split name to the identifier used by the dataset
    #[must_use]
    pub fn with_split(mut self, split: impl Into<String>, identifier: impl Into<String>) -> Self {
        self.splits.insert(split.into(), identifier.into());
        self
    }

    /// Check that the minimal descriptor is present
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::MissingDescriptor(
                "Dataset requires at least a name".into(),
            ));
        }
        Ok(())
    }
}

/// A dataset: metadata plus a builder for its stream of datapoints
pub trait Dataset<T>: Send + Sync {
    /// Descriptive metadata
    fn info(&self) -> &DatasetInfo;

    /// The builder currently producing this dataset's streams
    fn dataflow(&self) -> Arc<dyn StreamBuilder<T>>;

    /// Category taxonomy, if the dataset defines one
    fn categories(&self) -> Option<&CategoryRegistry>;

    /// Whether the data was found where the builder expects it
    fn dataset_available(&self) -> bool {
        let builder = self.dataflow();
        builder.workdir().is_some_and(Path::is_dir)
    }

    /// Whether the dataset ships with the library rather than being custom
    fn is_built_in(&self) -> bool {
        false
    }
}

/// A plain dataset assembled from its parts
pub struct DatasetCard<T> {
    info: DatasetInfo,
    builder: Arc<dyn StreamBuilder<T>>,
    built_in: bool,
}

impl<T> DatasetCard<T> {
    /// Create a custom dataset. Fails if `info` has no name.
    pub fn new(info: DatasetInfo, builder: Arc<dyn StreamBuilder<T>>) -> Result<Self> {
        info.validate()?;
        Ok(Self {
            info,
            builder,
            built_in: false,
        })
    }

    /// Create a built-in dataset, warning if its data is not on disk yet
    pub fn built_in(info: DatasetInfo, builder: Arc<dyn StreamBuilder<T>>) -> Result<Self> {
        let card = Self {
            built_in: true,
            ..Self::new(info, builder)?
        };

        if !card.dataset_available() {
            warn!(
                dataset = %card.info.name,
                url = card.info.url.as_deref().unwrap_or("<unknown>"),
                workdir = ?card.builder.workdir(),
                "dataset not found locally, download it and place it under the working directory"
            );
        }
        Ok(card)
    }
}

impl<T> Dataset<T> for DatasetCard<T> {
    fn info(&self) -> &DatasetInfo {
        &self.info
    }

    fn dataflow(&self) -> Arc<dyn StreamBuilder<T>> {
        Arc::clone(&self.builder)
    }

    fn categories(&self) -> Option<&CategoryRegistry> {
        self.builder.categories()
    }

    fn is_built_in(&self) -> bool {
        self.built_in
    }
}
