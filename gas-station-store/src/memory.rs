//! In-memory repository.

use crate::aggregate::run_pipeline;
use crate::document::{
    apply_update, get_values, project, set_fields, set_path, strip_internal, Document, ID_KEY,
    VERSION_KEY,
};
use crate::error::StoreError;
use crate::filter::matches;
use crate::query::{sort_documents, FindOneOptions, FindOptions, UpdateOptions, UpdateResult};
use crate::repository::Repository;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// In-memory repository implementation.
///
/// Documents keep their insertion order. Clones share the same collection.
/// Suitable for development and testing; data is lost when the process
/// terminates.
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    collection: String,
    documents: Arc<RwLock<Vec<Document>>>,
}

impl InMemoryRepository {
    /// Create an empty repository for `collection`.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            documents: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Check if the collection is empty.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Remove all documents.
    pub async fn clear(&self) {
        self.documents.write().await.clear();
    }
}

fn id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Validate a new document and fill in `_id` and the version field.
fn prepare(doc: Value) -> Result<Document, StoreError> {
    let mut doc = match doc {
        Value::Object(map) => map,
        _ => return Err(StoreError::invalid("document must be an object")),
    };
    if doc.get(ID_KEY).map_or(true, Value::is_null) {
        doc.insert(ID_KEY.to_string(), Value::String(Uuid::new_v4().to_string()));
    }
    doc.insert(VERSION_KEY.to_string(), Value::from(0));
    Ok(doc)
}

fn contains_id(docs: &[Document], id: &Value) -> bool {
    docs.iter().any(|d| d.get(ID_KEY) == Some(id))
}

fn position(docs: &[Document], filter: &Value) -> Result<Option<usize>, StoreError> {
    for (i, doc) in docs.iter().enumerate() {
        if matches(doc, filter)? {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

fn positions(docs: &[Document], filter: &Value) -> Result<Vec<usize>, StoreError> {
    let mut found = Vec::new();
    for (i, doc) in docs.iter().enumerate() {
        if matches(doc, filter)? {
            found.push(i);
        }
    }
    Ok(found)
}

fn output(doc: Document, projection: Option<&Value>) -> Result<Document, StoreError> {
    let doc = strip_internal(doc);
    match projection {
        Some(projection) => project(doc, projection),
        None => Ok(doc),
    }
}

/// Seed document for an upsert: the filter's plain equality fields.
fn upsert_seed(filter: &Value) -> Result<Document, StoreError> {
    let mut seed = Document::new();
    if let Value::Object(conditions) = filter {
        for (field, condition) in conditions {
            if field.starts_with('$') {
                continue;
            }
            let is_operator = matches!(
                condition,
                Value::Object(map) if map.keys().any(|k| k.starts_with('$'))
            );
            if !is_operator {
                set_path(&mut seed, field, condition.clone())?;
            }
        }
    }
    Ok(seed)
}

#[async_trait]
impl Repository for InMemoryRepository {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn create(&self, doc: Value) -> Result<Document, StoreError> {
        let doc = prepare(doc)?;
        let mut docs = self.documents.write().await;
        let id = doc.get(ID_KEY).cloned().unwrap_or(Value::Null);
        if contains_id(&docs, &id) {
            return Err(StoreError::Duplicate(id_string(&id)));
        }
        docs.push(doc.clone());
        debug!(collection = %self.collection, id = %id_string(&id), "Document created");
        Ok(strip_internal(doc))
    }

    async fn insert_many(&self, docs: Vec<Value>) -> Result<Vec<Document>, StoreError> {
        let prepared = docs
            .into_iter()
            .map(prepare)
            .collect::<Result<Vec<_>, _>>()?;

        let mut stored = self.documents.write().await;
        for (i, doc) in prepared.iter().enumerate() {
            let id = doc.get(ID_KEY).cloned().unwrap_or(Value::Null);
            if contains_id(&stored, &id) || contains_id(&prepared[..i], &id) {
                return Err(StoreError::Duplicate(id_string(&id)));
            }
        }
        stored.extend(prepared.iter().cloned());
        debug!(collection = %self.collection, count = prepared.len(), "Documents inserted");
        Ok(prepared.into_iter().map(strip_internal).collect())
    }

    async fn find_one(
        &self,
        filter: &Value,
        options: FindOneOptions,
    ) -> Result<Option<Document>, StoreError> {
        let docs = self.documents.read().await;
        match position(&docs, filter)? {
            Some(i) => output(docs[i].clone(), options.projection.as_ref()).map(Some),
            None => Ok(None),
        }
    }

    async fn find(&self, filter: &Value, options: FindOptions) -> Result<Vec<Document>, StoreError> {
        let mut found: Vec<Document> = {
            let docs = self.documents.read().await;
            positions(&docs, filter)?
                .into_iter()
                .map(|i| docs[i].clone())
                .collect()
        };

        sort_documents(&mut found, &options.sort);
        let skip = options.skip.unwrap_or(0);
        let limit = options.limit.unwrap_or(usize::MAX);

        found
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| output(doc, options.projection.as_ref()))
            .collect()
    }

    async fn find_distinct(&self, filter: &Value, field: &str) -> Result<Vec<Value>, StoreError> {
        let docs = self.documents.read().await;
        let mut distinct: Vec<Value> = Vec::new();
        for i in positions(&docs, filter)? {
            for found in get_values(&docs[i], field) {
                let values: Vec<&Value> = match found {
                    Value::Array(items) => items.iter().collect(),
                    value => vec![value],
                };
                for value in values {
                    if !distinct.contains(value) {
                        distinct.push(value.clone());
                    }
                }
            }
        }
        Ok(distinct)
    }

    async fn find_one_and_update(
        &self,
        filter: &Value,
        update: &Value,
        options: UpdateOptions,
    ) -> Result<Option<Document>, StoreError> {
        // Reject malformed updates even when nothing matches.
        set_fields(update)?;

        let mut docs = self.documents.write().await;
        if let Some(i) = position(&docs, filter)? {
            let original = docs[i].clone();
            let mut updated = original.clone();
            apply_update(&mut updated, update)?;
            docs[i] = updated.clone();
            debug!(
                collection = %self.collection,
                id = %original.get(ID_KEY).map(id_string).unwrap_or_default(),
                "Document updated"
            );
            let returned = if options.return_updated { updated } else { original };
            return Ok(Some(strip_internal(returned)));
        }

        if !options.upsert {
            return Ok(None);
        }

        let mut seed = upsert_seed(filter)?;
        apply_update(&mut seed, update)?;
        let doc = prepare(Value::Object(seed))?;
        let id = doc.get(ID_KEY).cloned().unwrap_or(Value::Null);
        if contains_id(&docs, &id) {
            return Err(StoreError::Duplicate(id_string(&id)));
        }
        docs.push(doc.clone());
        debug!(collection = %self.collection, id = %id_string(&id), "Document upserted");

        if options.return_updated {
            Ok(Some(strip_internal(doc)))
        } else {
            Ok(None)
        }
    }

    async fn update_many(&self, filter: &Value, update: &Value) -> Result<UpdateResult, StoreError> {
        set_fields(update)?;

        let mut docs = self.documents.write().await;
        let targets = positions(&docs, filter)?;

        // Compute every new version before touching the collection.
        let mut replacements = Vec::with_capacity(targets.len());
        for &i in &targets {
            let mut updated = docs[i].clone();
            apply_update(&mut updated, update)?;
            replacements.push((i, updated));
        }

        let mut result = UpdateResult {
            matched: targets.len() as u64,
            modified: 0,
        };
        for (i, updated) in replacements {
            if docs[i] != updated {
                docs[i] = updated;
                result.modified += 1;
            }
        }
        debug!(
            collection = %self.collection,
            matched = result.matched,
            modified = result.modified,
            "Documents updated"
        );
        Ok(result)
    }

    async fn delete_one(&self, filter: &Value) -> Result<bool, StoreError> {
        Ok(self.find_one_and_delete(filter).await?.is_some())
    }

    async fn find_one_and_delete(&self, filter: &Value) -> Result<Option<Document>, StoreError> {
        let mut docs = self.documents.write().await;
        match position(&docs, filter)? {
            Some(i) => {
                let removed = docs.remove(i);
                debug!(
                    collection = %self.collection,
                    id = %removed.get(ID_KEY).map(id_string).unwrap_or_default(),
                    "Document deleted"
                );
                Ok(Some(strip_internal(removed)))
            }
            None => Ok(None),
        }
    }

    async fn delete_many(&self, filter: &Value) -> Result<bool, StoreError> {
        let mut docs = self.documents.write().await;
        let targets = positions(&docs, filter)?;
        for &i in targets.iter().rev() {
            docs.remove(i);
        }
        debug!(collection = %self.collection, count = targets.len(), "Documents deleted");
        Ok(!targets.is_empty())
    }

    async fn count_documents(&self, filter: &Value) -> Result<u64, StoreError> {
        let docs = self.documents.read().await;
        Ok(positions(&docs, filter)?.len() as u64)
    }

    async fn aggregate(&self, pipeline: &[Value]) -> Result<Vec<Document>, StoreError> {
        let snapshot: Vec<Document> = {
            let docs = self.documents.read().await;
            docs.iter().cloned().map(strip_internal).collect()
        };
        run_pipeline(snapshot, pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortOrder;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn seeded() -> InMemoryRepository {
        let repo = InMemoryRepository::new("stations");
        repo.insert_many(vec![
            json!({"_id": "s1", "name": "Central", "city": "Recife", "price": 5.49, "fuels": ["gasoline", "ethanol"]}),
            json!({"_id": "s2", "name": "Norte", "city": "Natal", "price": 5.19, "fuels": ["diesel"]}),
            json!({"_id": "s3", "name": "Praia", "city": "Recife", "price": 5.89, "fuels": ["gasoline"]}),
        ])
        .await
        .unwrap();
        repo
    }

    #[tokio::test]
    async fn test_create_assigns_id() {
        let repo = InMemoryRepository::new("stations");
        let doc = repo.create(json!({"name": "Central"})).await.unwrap();

        let id = doc["_id"].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert!(!doc.contains_key(VERSION_KEY));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_duplicate() {
        let repo = InMemoryRepository::new("stations");
        repo.create(json!({"_id": "s1"})).await.unwrap();
        let result = repo.create(json!({"_id": "s1"})).await;
        assert!(matches!(result, Err(StoreError::Duplicate(id)) if id == "s1"));
    }

    #[tokio::test]
    async fn test_create_rejects_non_object() {
        let repo = InMemoryRepository::new("stations");
        let result = repo.create(json!([1, 2])).await;
        assert!(matches!(result, Err(StoreError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_insert_many_is_all_or_nothing() {
        let repo = seeded().await;
        let result = repo
            .insert_many(vec![json!({"_id": "new"}), json!({"_id": "s2"})])
            .await;
        assert!(matches!(result, Err(StoreError::Duplicate(_))));
        assert_eq!(repo.len().await, 3);

        let result = repo
            .insert_many(vec![json!({"_id": "x"}), json!({"_id": "x"})])
            .await;
        assert!(result.is_err());
        assert_eq!(repo.len().await, 3);
    }

    #[tokio::test]
    async fn test_find_one_with_projection() {
        let repo = seeded().await;
        let doc = repo
            .find_one(
                &json!({"city": "Recife"}),
                FindOneOptions::new().projection(json!({"name": 1})),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(Value::Object(doc), json!({"_id": "s1", "name": "Central"}));
    }

    #[tokio::test]
    async fn test_find_sort_skip_limit() {
        let repo = seeded().await;
        let docs = repo
            .find(
                &json!({}),
                FindOptions::new()
                    .sort("price", SortOrder::Descending)
                    .skip(1)
                    .limit(1),
            )
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["_id"], json!("s1"));
    }

    #[tokio::test]
    async fn test_find_distinct_flattens_arrays() {
        let repo = seeded().await;
        let fuels = repo.find_distinct(&json!({}), "fuels").await.unwrap();
        assert_eq!(fuels, vec![json!("gasoline"), json!("ethanol"), json!("diesel")]);

        let cities = repo
            .find_distinct(&json!({"price": {"$gt": 5.3}}), "city")
            .await
            .unwrap();
        assert_eq!(cities, vec![json!("Recife")]);
    }

    #[tokio::test]
    async fn test_array_of_subdocuments() {
        let repo = InMemoryRepository::new("orders");
        repo.insert_many(vec![
            json!({"_id": "o1", "items": [{"sku": "x", "tags": ["a", "b"]}, {"sku": "y"}]}),
            json!({"_id": "o2", "items": [{"sku": "y", "tags": ["b", "c"]}]}),
        ])
        .await
        .unwrap();

        assert_eq!(repo.count_documents(&json!({"items.sku": "x"})).await.unwrap(), 1);
        assert_eq!(repo.count_documents(&json!({"items.sku": "y"})).await.unwrap(), 2);

        let skus = repo.find_distinct(&json!({}), "items.sku").await.unwrap();
        assert_eq!(skus, vec![json!("x"), json!("y")]);
        let tags = repo.find_distinct(&json!({}), "items.tags").await.unwrap();
        assert_eq!(tags, vec![json!("a"), json!("b"), json!("c")]);
    }

    #[tokio::test]
    async fn test_find_by_id_and_update_returns_original() {
        let repo = seeded().await;
        let before = repo
            .find_by_id_and_update("s2", &json!({"price": 5.29}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before["price"], json!(5.19));

        let after = repo.get_by_id("s2").await.unwrap();
        assert_eq!(after["price"], json!(5.29));
    }

    #[tokio::test]
    async fn test_find_one_and_update_returns_updated_by_default() {
        let repo = seeded().await;
        let doc = repo
            .find_one_and_update(
                &json!({"name": "Praia"}),
                &json!({"$set": {"address.street": "Av. Boa Viagem"}}),
                UpdateOptions::default(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["address"], json!({"street": "Av. Boa Viagem"}));
        assert!(!doc.contains_key(VERSION_KEY));
    }

    #[tokio::test]
    async fn test_upsert_inserts_from_filter() {
        let repo = seeded().await;
        let doc = repo
            .find_one_and_update(
                &json!({"name": "Sul", "price": {"$gt": 1}}),
                &json!({"$set": {"city": "Olinda"}}),
                UpdateOptions::default().upsert(true),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["name"], json!("Sul"));
        assert_eq!(doc["city"], json!("Olinda"));
        assert!(!doc.contains_key("price"));
        assert_eq!(repo.len().await, 4);
    }

    #[tokio::test]
    async fn test_update_without_match() {
        let repo = seeded().await;
        let doc = repo
            .update_one(&json!({"name": "Nowhere"}), &json!({"price": 1}))
            .await
            .unwrap();
        assert!(doc.is_none());
        assert_eq!(repo.len().await, 3);
    }

    #[tokio::test]
    async fn test_update_many_counts() {
        let repo = seeded().await;
        let result = repo
            .update_many(&json!({"fuels": "gasoline"}), &json!({"price": 5.89}))
            .await
            .unwrap();
        assert_eq!(result, UpdateResult { matched: 2, modified: 1 });
    }

    #[tokio::test]
    async fn test_update_many_is_atomic() {
        let repo = seeded().await;
        repo.create(json!({"_id": "s4", "city": "Recife", "address": "plain"}))
            .await
            .unwrap();

        let result = repo
            .update_many(&json!({"city": "Recife"}), &json!({"address.number": 10}))
            .await;
        assert!(matches!(result, Err(StoreError::InvalidQuery(_))));

        let s1 = repo.get_by_id("s1").await.unwrap();
        assert!(!s1.contains_key("address"));
    }

    #[tokio::test]
    async fn test_delete_operations() {
        let repo = seeded().await;

        let removed = repo
            .find_one_and_delete(&json!({"_id": "s2"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(removed["name"], json!("Norte"));

        assert!(!repo.delete_one(&json!({"_id": "s2"})).await.unwrap());
        assert!(repo.delete_many(&json!({"city": "Recife"})).await.unwrap());
        assert!(!repo.delete_many(&json!({"city": "Recife"})).await.unwrap());
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_count_documents() {
        let repo = seeded().await;
        assert_eq!(repo.count_documents(&json!({})).await.unwrap(), 3);
        assert_eq!(
            repo.count_documents(&json!({"city": {"$ne": "Recife"}}))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_aggregate_hides_version() {
        let repo = seeded().await;
        let docs = repo
            .aggregate(&[json!({"$match": {"_id": "s1"}})])
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert!(!docs[0].contains_key(VERSION_KEY));
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let repo = InMemoryRepository::new("stations");
        let result = repo.get_by_id("missing").await;
        assert!(matches!(result, Err(StoreError::NotFound(msg)) if msg == "stations/missing"));
    }

    #[tokio::test]
    async fn test_clones_share_documents() {
        let repo = InMemoryRepository::new("stations");
        let other = repo.clone();
        repo.create(json!({"name": "A"})).await.unwrap();
        assert_eq!(other.len().await, 1);
        other.clear().await;
        assert!(repo.is_empty().await);
    }
}
