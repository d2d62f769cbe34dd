//! Stream builders and the options they are built with

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::categories::CategoryRegistry;
use crate::error::Result;
use crate::source::{Datapoint, Stream};

/// Free-form value of an extra build option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Integer option
    Int(i64),
    /// Boolean flag
    Bool(bool),
    /// String option
    Str(String),
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
        }
    }
}

/// Options passed to [`StreamBuilder::build`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Name of the split to stream
    pub split: Option<String>,

    /// Upper bound on the number of datapoints yielded
    pub max_datapoints: Option<usize>,

    /// Builder specific options, forwarded untouched
    #[serde(default)]
    pub extra: BTreeMap<String, OptionValue>,
}

impl BuildOptions {
    /// Options with nothing set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the split to stream
    #[must_use]
    pub fn split(mut self, split: impl Into<String>) -> Self {
        self.split = Some(split.into());
        self
    }

    /// Bound the number of datapoints
    #[must_use]
    pub fn max_datapoints(mut self, max: usize) -> Self {
        self.max_datapoints = Some(max);
        self
    }

    /// Set a builder specific option
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Look up a builder specific option
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.extra.get(key)
    }
}

/// A factory producing lazy streams of datapoints
pub trait StreamBuilder<T>: Send + Sync {
    /// Build a fresh stream. Building never materializes data.
    fn build(&self, options: &BuildOptions) -> Result<Stream<T>>;

    /// Category taxonomy of the produced datapoints, if any
    fn categories(&self) -> Option<&CategoryRegistry>;

    /// Directory the underlying data is read from, if on disk
    fn workdir(&self) -> Option<&Path> {
        None
    }
}

/// A builder streaming a list held in memory.
///
/// Every build clones the items lazily; `max_datapoints` bounds the stream
/// and the split option is ignored.
pub struct InMemoryStreamBuilder<T> {
    items: Arc<Vec<T>>,
    categories: Option<CategoryRegistry>,
    workdir: Option<PathBuf>,
}

impl<T: Datapoint> InMemoryStreamBuilder<T> {
    /// Create a builder over `items`
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: Arc::new(items),
            categories: None,
            workdir: None,
        }
    }

    /// Attach a category registry
    #[must_use]
    pub fn with_categories(mut self, categories: CategoryRegistry) -> Self {
        self.categories = Some(categories);
        self
    }

    /// Attach the directory the list was loaded from
    #[must_use]
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Lazily clone the items of a shared list into a stream
pub fn stream_shared<T: Datapoint>(items: &Arc<Vec<T>>, max_datapoints: Option<usize>) -> Stream<T> {
    let items = Arc::clone(items);
    let len = items.len();
    Stream::new((0..len).map(move |index| items[index].clone())).limit(max_datapoints)
}

impl<T: Datapoint> StreamBuilder<T> for InMemoryStreamBuilder<T> {
    fn build(&self, options: &BuildOptions) -> Result<Stream<T>> {
        Ok(stream_shared(&self.items, options.max_datapoints))
    }

    fn categories(&self) -> Option<&CategoryRegistry> {
        self.categories.as_ref()
    }

    fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = BuildOptions::new()
            .split("train")
            .max_datapoints(20)
            .with("load_image", false)
            .with("language", "en");

        assert_eq!(options.split.as_deref(), Some("train"));
        assert_eq!(options.max_datapoints, Some(20));
        assert_eq!(options.get("load_image"), Some(&OptionValue::Bool(false)));
        assert_eq!(options.get("language").map(ToString::to_string).as_deref(), Some("en"));
        assert_eq!(options.get("missing"), None);
    }

    #[test]
    fn test_options_from_json() {
        let options: BuildOptions =
            serde_json::from_str(r#"{"split": "val", "max_datapoints": 5, "extra": {"shard": 3}}"#)
                .unwrap();
        assert_eq!(options.split.as_deref(), Some("val"));
        assert_eq!(options.get("shard"), Some(&OptionValue::Int(3)));
    }

    #[test]
    fn test_in_memory_builder_is_rebuildable() {
        let builder = InMemoryStreamBuilder::new(vec![1, 2, 3, 4]);

        let all: Vec<_> = builder.build(&BuildOptions::new()).unwrap().collect();
        let bounded: Vec<_> = builder
            .build(&BuildOptions::new().max_datapoints(2))
            .unwrap()
            .collect();

        assert_eq!(all, [1, 2, 3, 4]);
        assert_eq!(bounded, [1, 2]);
        assert_eq!(builder.len(), 4);
        assert!(builder.categories().is_none());
        assert!(builder.workdir().is_none());
    }
}
