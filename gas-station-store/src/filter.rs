//! Filter evaluation.
//!
//! Supported forms:
//!
//! - `{"field": value}` and `{"a.b": value}` for equality (array fields match
//!   when any element is equal; a path through an array of objects matches
//!   when any element's field does)
//! - `{"field": {"$op": operand}}` with `$eq`, `$ne`, `$gt`, `$gte`, `$lt`,
//!   `$lte`, `$in`, `$nin`, `$exists`
//! - `{"$and": [...]}` and `{"$or": [...]}`

use crate::document::{compare_values, get_values, Document};
use crate::error::StoreError;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Check whether `doc` satisfies `filter`.
///
/// `null` and `{}` match everything.
pub fn matches(doc: &Document, filter: &Value) -> Result<bool, StoreError> {
    match filter {
        Value::Null => Ok(true),
        Value::Object(conditions) => matches_all(doc, conditions),
        _ => Err(StoreError::invalid("filter must be an object")),
    }
}

fn matches_all(doc: &Document, conditions: &Map<String, Value>) -> Result<bool, StoreError> {
    for (key, condition) in conditions {
        let ok = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches(doc, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for clause in clauses(key, condition)? {
                    if matches(doc, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            op if op.starts_with('$') => {
                return Err(StoreError::invalid(format!("unsupported operator {}", op)))
            }
            field => matches_field(&get_values(doc, field), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(op: &str, condition: &'a Value) -> Result<&'a Vec<Value>, StoreError> {
    condition
        .as_array()
        .ok_or_else(|| StoreError::invalid(format!("{} expects an array", op)))
}

/// The operator map of a condition such as `{"$gt": 1}`, or `None` for a
/// literal value.
fn operators(condition: &Value) -> Result<Option<&Map<String, Value>>, StoreError> {
    let map = match condition {
        Value::Object(map) => map,
        _ => return Ok(None),
    };

    match map.keys().filter(|k| k.starts_with('$')).count() {
        0 => Ok(None),
        n if n == map.len() => Ok(Some(map)),
        _ => Err(StoreError::invalid(format!(
            "cannot mix operators and fields in {}",
            condition
        ))),
    }
}

fn matches_field(values: &[&Value], condition: &Value) -> Result<bool, StoreError> {
    let operators = match operators(condition)? {
        Some(map) => map,
        None => return Ok(equals(values, condition)),
    };

    for (op, operand) in operators {
        let ok = match op.as_str() {
            "$eq" => equals(values, operand),
            "$ne" => !equals(values, operand),
            "$gt" => compares(values, operand, |o| o == Ordering::Greater),
            "$gte" => compares(values, operand, |o| o != Ordering::Less),
            "$lt" => compares(values, operand, |o| o == Ordering::Less),
            "$lte" => compares(values, operand, |o| o != Ordering::Greater),
            "$in" => in_list(values, op, operand)?,
            "$nin" => !in_list(values, op, operand)?,
            "$exists" => {
                let wanted = operand
                    .as_bool()
                    .ok_or_else(|| StoreError::invalid("$exists expects a boolean"))?;
                !values.is_empty() == wanted
            }
            other => {
                return Err(StoreError::invalid(format!("unsupported operator {}", other)))
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Equality; a missing field equals `null`, arrays match on any element.
fn equals(values: &[&Value], expected: &Value) -> bool {
    if values.is_empty() {
        return expected.is_null();
    }
    values.iter().any(|actual| match actual {
        _ if *actual == expected => true,
        Value::Array(items) => items.iter().any(|item| item == expected),
        _ => false,
    })
}

fn compares(values: &[&Value], operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    let accepts = |v: &Value| compare_values(Some(v), Some(operand)).map_or(false, &accept);
    values.iter().any(|value| match value {
        Value::Array(items) => items.iter().any(accepts),
        _ => accepts(*value),
    })
}

fn in_list(values: &[&Value], op: &str, operand: &Value) -> Result<bool, StoreError> {
    let candidates = clauses(op, operand)?;
    Ok(candidates.iter().any(|candidate| equals(values, candidate)))
}
