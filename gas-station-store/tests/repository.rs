//! Repository behavior through the trait object.

use gas_station_store::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

fn repository() -> Arc<dyn Repository> {
    Arc::new(InMemoryRepository::new("transactions"))
}

#[tokio::test]
async fn test_lifecycle_through_dyn_repository() {
    let repo = repository();
    assert_eq!(repo.collection(), "transactions");

    let created = repo
        .create(json!({"status": "PENDING", "amount": 120.5, "customer": {"id": "c1"}}))
        .await
        .unwrap();
    let id = created["_id"].as_str().unwrap().to_string();

    let before = repo
        .find_by_id_and_update(&id, &json!({"$set": {"status": "PAID"}}))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(before["status"], json!("PENDING"));

    let paid = repo
        .find_one(&json!({"customer.id": "c1"}), FindOneOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(paid["status"], json!("PAID"));
    assert!(!paid.contains_key("__v"));

    assert!(repo.delete_one(&json!({"_id": id})).await.unwrap());
    assert!(matches!(
        repo.get_by_id(&id).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_concurrent_creates() {
    let repo = repository();

    let mut handles = Vec::new();
    for n in 0..32 {
        let repo = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            repo.create(json!({"n": n})).await.unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(repo.count_documents(&json!({})).await.unwrap(), 32);
    let distinct = repo.find_distinct(&json!({}), "_id").await.unwrap();
    assert_eq!(distinct.len(), 32);
}

#[tokio::test]
async fn test_report_pipeline() {
    let repo = repository();
    repo.insert_many(vec![
        json!({"status": "PAID", "amount": 10}),
        json!({"status": "PAID", "amount": 30}),
        json!({"status": "FAILED", "amount": 20}),
        json!({"status": "PAID", "amount": 20}),
    ])
    .await
    .unwrap();

    let top = repo
        .aggregate(&[
            json!({"$match": {"status": "PAID"}}),
            json!({"$sort": {"amount": -1}}),
            json!({"$limit": 2}),
            json!({"$project": {"amount": 1, "_id": 0}}),
        ])
        .await
        .unwrap();
    let top: Vec<Value> = top.into_iter().map(Value::Object).collect();
    assert_eq!(top, vec![json!({"amount": 30}), json!({"amount": 20})]);

    let counted = repo
        .aggregate(&[
            json!({"$match": {"amount": {"$gte": 20}}}),
            json!({"$count": "total"}),
        ])
        .await
        .unwrap();
    assert_eq!(counted[0]["total"], json!(3));
}

#[tokio::test]
async fn test_invalid_filter_is_reported() {
    let repo = repository();
    repo.create(json!({"a": 1})).await.unwrap();

    let result = repo.count_documents(&json!({"a": {"$regex": "1"}})).await;
    assert!(matches!(result, Err(StoreError::InvalidQuery(_))));
}
