//! Aggregation pipelines.
//!
//! Stages run in order over the collection: `$match`, `$sort`, `$skip`,
//! `$limit`, `$project` and `$count`.

use crate::document::{project, Document};
use crate::error::StoreError;
use crate::filter::matches;
use crate::query::{sort_documents, SortOrder};
use serde_json::{Map, Value};

/// Run `pipeline` over `docs`.
pub fn run_pipeline(mut docs: Vec<Document>, pipeline: &[Value]) -> Result<Vec<Document>, StoreError> {
    for stage in pipeline {
        let (name, argument) = single_key(stage)?;
        docs = match name {
            "$match" => {
                let mut kept = Vec::with_capacity(docs.len());
                for doc in docs {
                    if matches(&doc, argument)? {
                        kept.push(doc);
                    }
                }
                kept
            }
            "$sort" => {
                let keys = sort_keys(argument)?;
                sort_documents(&mut docs, &keys);
                docs
            }
            "$skip" => {
                let n = count_argument(name, argument)?;
                docs.into_iter().skip(n).collect()
            }
            "$limit" => {
                let n = count_argument(name, argument)?;
                docs.truncate(n);
                docs
            }
            "$project" => docs
                .into_iter()
                .map(|doc| project(doc, argument))
                .collect::<Result<Vec<_>, _>>()?,
            "$count" => {
                let field = argument
                    .as_str()
                    .filter(|f| !f.is_empty() && !f.starts_with('$'))
                    .ok_or_else(|| StoreError::invalid("$count expects a field name"))?;
                if docs.is_empty() {
                    Vec::new()
                } else {
                    let mut counted = Map::new();
                    counted.insert(field.to_string(), Value::from(docs.len() as u64));
                    vec![counted]
                }
            }
            other => return Err(StoreError::invalid(format!("unsupported stage {}", other))),
        };
    }
    Ok(docs)
}

fn single_key(stage: &Value) -> Result<(&str, &Value), StoreError> {
    match stage.as_object() {
        Some(map) if map.len() == 1 => map
            .iter()
            .next()
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| StoreError::invalid("empty pipeline stage")),
        _ => Err(StoreError::invalid(
            "pipeline stage must be an object with exactly one key",
        )),
    }
}

fn sort_keys(argument: &Value) -> Result<Vec<(String, SortOrder)>, StoreError> {
    let spec = argument
        .as_object()
        .filter(|m| !m.is_empty())
        .ok_or_else(|| StoreError::invalid("$sort expects a non-empty object"))?;

    spec.iter()
        .map(|(field, direction)| match direction.as_i64() {
            Some(1) => Ok((field.clone(), SortOrder::Ascending)),
            Some(-1) => Ok((field.clone(), SortOrder::Descending)),
            _ => Err(StoreError::invalid(format!(
                "$sort direction for '{}' must be 1 or -1",
                field
            ))),
        })
        .collect()
}

fn count_argument(stage: &str, argument: &Value) -> Result<usize, StoreError> {
    argument
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| StoreError::invalid(format!("{} expects a non-negative integer", stage)))
}
