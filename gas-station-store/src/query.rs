//! Query options and results.

use crate::document::{compare_for_sort, get_path, Document};
use serde_json::Value;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// Options for `find_one`.
#[derive(Debug, Clone, Default)]
pub struct FindOneOptions {
    /// Projection applied to the result.
    pub projection: Option<Value>,
}

impl FindOneOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the projection.
    pub fn projection(mut self, projection: Value) -> Self {
        self.projection = Some(projection);
        self
    }
}

/// Options for `find`.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Projection applied to every result.
    pub projection: Option<Value>,
    /// Sort keys, most significant first.
    pub sort: Vec<(String, SortOrder)>,
    /// Maximum number of results.
    pub limit: Option<usize>,
    /// Results to skip after sorting.
    pub skip: Option<usize>,
}

impl FindOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the projection.
    pub fn projection(mut self, projection: Value) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Add a sort key.
    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((field.into(), order));
        self
    }

    /// Limit the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip results.
    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }
}

/// Options for `find_one_and_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Return the document after the update instead of before.
    pub return_updated: bool,
    /// Insert a document built from the filter and update when nothing matches.
    pub upsert: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            return_updated: true,
            upsert: false,
        }
    }
}

impl UpdateOptions {
    /// Return the updated document.
    pub fn returning_updated() -> Self {
        Self::default()
    }

    /// Return the document as it was before the update.
    pub fn returning_original() -> Self {
        Self {
            return_updated: false,
            upsert: false,
        }
    }

    /// Enable or disable upsert.
    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }
}

/// Outcome of `update_many`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Documents matched by the filter.
    pub matched: u64,
    /// Documents whose content changed.
    pub modified: u64,
}

/// Stable sort by the given keys.
pub(crate) fn sort_documents(docs: &mut [Document], keys: &[(String, SortOrder)]) {
    if keys.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        for (field, order) in keys {
            let ordering = compare_for_sort(get_path(a, field), get_path(b, field));
            let ordering = match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            if ordering.is_ne() {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });
}
