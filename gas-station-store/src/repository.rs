//! The repository trait.

use crate::document::{Document, ID_KEY};
use crate::error::StoreError;
use crate::query::{FindOneOptions, FindOptions, UpdateOptions, UpdateResult};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Generic document repository over a single collection.
///
/// Filters, updates, projections and pipelines are JSON values; see the
/// [`filter`](crate::filter) module for the supported filter forms. Updates
/// are applied as `$set` of the supplied fields. The internal version field
/// is never part of a returned document.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Name of the collection this repository manages.
    fn collection(&self) -> &str;

    /// Insert a document, assigning an `_id` when it has none.
    async fn create(&self, doc: Value) -> Result<Document, StoreError>;

    /// Insert several documents. Either all are inserted or none.
    async fn insert_many(&self, docs: Vec<Value>) -> Result<Vec<Document>, StoreError>;

    /// First document matching `filter`.
    async fn find_one(
        &self,
        filter: &Value,
        options: FindOneOptions,
    ) -> Result<Option<Document>, StoreError>;

    /// All documents matching `filter`.
    async fn find(&self, filter: &Value, options: FindOptions) -> Result<Vec<Document>, StoreError>;

    /// Distinct values of `field` among documents matching `filter`.
    ///
    /// Array values contribute their elements.
    async fn find_distinct(&self, filter: &Value, field: &str) -> Result<Vec<Value>, StoreError>;

    /// Update the first matching document.
    ///
    /// Returns the updated document by default, or the original one with
    /// [`UpdateOptions::returning_original`]. With `upsert`, a document built
    /// from the filter's equality fields and the update is inserted when
    /// nothing matches.
    async fn find_one_and_update(
        &self,
        filter: &Value,
        update: &Value,
        options: UpdateOptions,
    ) -> Result<Option<Document>, StoreError>;

    /// Update every matching document.
    async fn update_many(&self, filter: &Value, update: &Value) -> Result<UpdateResult, StoreError>;

    /// Delete the first matching document. Returns whether one was deleted.
    async fn delete_one(&self, filter: &Value) -> Result<bool, StoreError>;

    /// Delete and return the first matching document.
    async fn find_one_and_delete(&self, filter: &Value) -> Result<Option<Document>, StoreError>;

    /// Delete every matching document. Returns whether any was deleted.
    async fn delete_many(&self, filter: &Value) -> Result<bool, StoreError>;

    /// Number of documents matching `filter`.
    async fn count_documents(&self, filter: &Value) -> Result<u64, StoreError>;

    /// Run an aggregation pipeline over the collection.
    async fn aggregate(&self, pipeline: &[Value]) -> Result<Vec<Document>, StoreError>;

    /// Update a document by `_id`, returning it as it was before the update.
    async fn find_by_id_and_update(
        &self,
        id: &str,
        update: &Value,
    ) -> Result<Option<Document>, StoreError> {
        self.find_one_and_update(
            &json!({ ID_KEY: id }),
            update,
            UpdateOptions::returning_original(),
        )
        .await
    }

    /// Update the first matching document and return it after the update.
    async fn update_one(
        &self,
        filter: &Value,
        update: &Value,
    ) -> Result<Option<Document>, StoreError> {
        self.find_one_and_update(filter, update, UpdateOptions::returning_updated())
            .await
    }

    /// Fetch a document by `_id`, failing with [`StoreError::NotFound`].
    async fn get_by_id(&self, id: &str) -> Result<Document, StoreError> {
        self.find_one(&json!({ ID_KEY: id }), FindOneOptions::default())
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", self.collection(), id)))
    }
}
