//! Document helpers: dotted paths, projections, ordering and `$set` updates.

use crate::error::StoreError;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

/// Primary key field.
pub const ID_KEY: &str = "_id";

/// Internal version field, never returned to callers.
pub const VERSION_KEY: &str = "__v";

/// Look up a dotted path such as `address.city`.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = doc.get(first)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Every value reachable through a dotted path.
///
/// Unlike [`get_path`], a non-numeric segment applied to an array descends
/// into each object element, so `items.sku` reaches the `sku` of every item.
pub fn get_values<'a>(doc: &'a Document, path: &str) -> Vec<&'a Value> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut found = Vec::new();
    if let Some((first, rest)) = parts.split_first() {
        if let Some(value) = doc.get(*first) {
            collect_values(value, rest, &mut found);
        }
    }
    found
}

fn collect_values<'a>(value: &'a Value, parts: &[&str], found: &mut Vec<&'a Value>) {
    let (part, rest) = match parts.split_first() {
        Some(split) => split,
        None => {
            found.push(value);
            return;
        }
    };

    match value {
        Value::Object(map) => {
            if let Some(next) = map.get(*part) {
                collect_values(next, rest, found);
            }
        }
        Value::Array(items) => match part.parse::<usize>() {
            Ok(index) => {
                if let Some(next) = items.get(index) {
                    collect_values(next, rest, found);
                }
            }
            Err(_) => {
                for next in items.iter().filter_map(|item| item.get(*part)) {
                    collect_values(next, rest, found);
                }
            }
        },
        _ => {}
    }
}

/// Set a dotted path, creating intermediate objects.
pub fn set_path(doc: &mut Document, path: &str, value: Value) -> Result<(), StoreError> {
    let mut parts: Vec<&str> = path.split('.').collect();
    let last = parts
        .pop()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| StoreError::invalid(format!("empty field path '{}'", path)))?;

    let mut current = doc;
    for part in parts {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match entry {
            Value::Object(map) => map,
            _ => {
                return Err(StoreError::invalid(format!(
                    "cannot create field '{}' inside non-object '{}'",
                    last, part
                )))
            }
        };
    }
    current.insert(last.to_string(), value);
    Ok(())
}

/// Apply an update to `doc`.
///
/// The update is either `{"$set": {...}}` or a plain object, which is
/// treated as the `$set` payload. Changing `_id` is rejected.
pub fn apply_update(doc: &mut Document, update: &Value) -> Result<(), StoreError> {
    for (path, value) in set_fields(update)? {
        if path == ID_KEY && doc.get(ID_KEY) != Some(value) {
            return Err(StoreError::invalid("the _id field is immutable"));
        }
        set_path(doc, path, value.clone())?;
    }
    Ok(())
}

/// The `path -> value` pairs an update sets.
pub(crate) fn set_fields(update: &Value) -> Result<&Map<String, Value>, StoreError> {
    let map = update
        .as_object()
        .ok_or_else(|| StoreError::invalid("update must be an object"))?;

    if let Some(set) = map.get("$set") {
        if map.len() > 1 {
            return Err(StoreError::invalid("only $set updates are supported"));
        }
        return set
            .as_object()
            .ok_or_else(|| StoreError::invalid("$set must be an object"));
    }

    if let Some(op) = map.keys().find(|k| k.starts_with('$')) {
        return Err(StoreError::invalid(format!("unsupported update operator {}", op)));
    }
    Ok(map)
}

/// Remove internal fields before handing a document out.
pub fn strip_internal(mut doc: Document) -> Document {
    doc.remove(VERSION_KEY);
    doc
}

/// Apply a projection such as `{"name": 1}` or `{"secret": 0}`.
///
/// Inclusion projections keep `_id` unless it is explicitly excluded.
/// Mixing inclusion and exclusion (other than for `_id`) is rejected.
pub fn project(doc: Document, projection: &Value) -> Result<Document, StoreError> {
    let spec = match projection {
        Value::Null => return Ok(doc),
        Value::Object(map) if map.is_empty() => return Ok(doc),
        Value::Object(map) => map,
        _ => return Err(StoreError::invalid("projection must be an object")),
    };

    let mut include = Vec::new();
    let mut exclude = Vec::new();
    for (field, flag) in spec {
        if truthy(flag) {
            include.push(field.as_str());
        } else {
            exclude.push(field.as_str());
        }
    }

    if !include.is_empty() {
        if exclude.iter().any(|f| *f != ID_KEY) {
            return Err(StoreError::invalid(
                "cannot mix inclusion and exclusion in a projection",
            ));
        }

        let mut projected = Document::new();
        if !exclude.contains(&ID_KEY) {
            if let Some(id) = doc.get(ID_KEY) {
                projected.insert(ID_KEY.to_string(), id.clone());
            }
        }
        for path in include.into_iter().filter(|f| *f != ID_KEY) {
            if let Some(value) = get_path(&doc, path) {
                set_path(&mut projected, path, value.clone())?;
            }
        }
        return Ok(projected);
    }

    let mut doc = doc;
    for path in exclude {
        remove_path(&mut doc, path);
    }
    Ok(doc)
}

/// Remove a dotted path; missing intermediates are ignored.
fn remove_path(doc: &mut Document, path: &str) {
    let (parent, last) = match path.rsplit_once('.') {
        Some((parent, last)) => (Some(parent), last),
        None => (None, path),
    };

    let mut current = doc;
    if let Some(parent) = parent {
        for part in parent.split('.') {
            current = match current.get_mut(part).and_then(Value::as_object_mut) {
                Some(map) => map,
                None => return,
            };
        }
    }
    current.remove(last);
}

fn truthy(flag: &Value) -> bool {
    match flag {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::Null => false,
        _ => true,
    }
}

/// Total order over optional JSON values used for sorting.
///
/// Missing and null sort first, then numbers, strings, objects, arrays and
/// booleans.
pub fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let rank = |v: Option<&Value>| match v {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    };

    match rank(a).cmp(&rank(b)) {
        Ordering::Equal => compare_values(a, b).unwrap_or(Ordering::Equal),
        other => other,
    }
}

/// Compare two values of the same kind.
pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Option<Ordering> {
    match (a?, b?) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
