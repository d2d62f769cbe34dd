//! Category registries and their reconciliation across datasets

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Permitted values of a category or sub-category
pub type ValueSet = BTreeSet<String>;

/// Taxonomy of a dataset: categories with their permitted values, and the
/// sub-categories refining each category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRegistry {
    /// Category name to permitted values
    categories: BTreeMap<String, ValueSet>,

    /// Category name to sub-category name to permitted values
    sub_categories: BTreeMap<String, BTreeMap<String, ValueSet>>,
}

impl CategoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a category, extending its permitted values if it already exists
    pub fn add_category<I, S>(&mut self, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories
            .entry(name.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    /// Builder-style variant of [`CategoryRegistry::add_category`]
    #[must_use]
    pub fn with_category<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_category(name, values);
        self
    }

    /// Attach a sub-category to a registered category.
    ///
    /// Fails with [`Error::UnknownCategory`] if `category` is not registered.
    pub fn add_sub_category<I, S>(
        &mut self,
        category: &str,
        sub_category: impl Into<String>,
        values: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !self.categories.contains_key(category) {
            return Err(Error::UnknownCategory(category.to_string()));
        }

        self.sub_categories
            .entry(category.to_string())
            .or_default()
            .entry(sub_category.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        Ok(())
    }

    /// Builder-style variant of [`CategoryRegistry::add_sub_category`]
    pub fn with_sub_category<I, S>(
        mut self,
        category: &str,
        sub_category: impl Into<String>,
        values: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_sub_category(category, sub_category, values)?;
        Ok(self)
    }

    /// Names of all registered categories, sorted
    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Whether the category is registered
    pub fn contains(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    /// Permitted values of a category
    pub fn values(&self, category: &str) -> Option<&ValueSet> {
        self.categories.get(category)
    }

    /// Sub-categories attached to a category
    pub fn sub_categories(&self, category: &str) -> Option<&BTreeMap<String, ValueSet>> {
        self.sub_categories.get(category)
    }

    /// Permitted values of a sub-category
    pub fn sub_category_values(&self, category: &str, sub_category: &str) -> Option<&ValueSet> {
        self.sub_categories.get(category)?.get(sub_category)
    }

    /// Number of registered categories
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether no category is registered
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Reconcile the taxonomies of several datasets.
///
/// Categories and their values are unioned. A sub-category survives under a
/// category only if every registry defining that category also carries the
/// sub-category; its values are then unioned across those registries.
pub fn merge_categories<'a, I>(registries: I) -> CategoryRegistry
where
    I: IntoIterator<Item = &'a CategoryRegistry>,
{
    let registries: Vec<&CategoryRegistry> = registries.into_iter().collect();
    let mut merged = CategoryRegistry::new();

    for registry in &registries {
        for (name, values) in &registry.categories {
            merged
                .categories
                .entry(name.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
    }

    for name in merged.categories.keys() {
        let defining: Vec<&CategoryRegistry> = registries
            .iter()
            .copied()
            .filter(|registry| registry.categories.contains_key(name))
            .collect();

        let Some((first, rest)) = defining.split_first() else {
            continue;
        };
        let Some(candidates) = first.sub_categories.get(name) else {
            continue;
        };

        for sub_category in candidates.keys() {
            let shared = rest.iter().all(|registry| {
                registry
                    .sub_categories
                    .get(name)
                    .is_some_and(|subs| subs.contains_key(sub_category))
            });
            if !shared {
                continue;
            }

            let values: ValueSet = defining
                .iter()
                .filter_map(|registry| registry.sub_category_values(name, sub_category))
                .flatten()
                .cloned()
                .collect();

            merged
                .sub_categories
                .entry(name.clone())
                .or_default()
                .insert(sub_category.clone(), values);
        }
    }

    merged
}
