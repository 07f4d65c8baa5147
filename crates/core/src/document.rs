//! Document model for the collection contract
//!
//! A document is a schema-less JSON object. Fields are addressed by dotted
//! paths (`address.city`, `topics.score`). When a path crosses an array the
//! remaining path is applied to every element, so `topics.score` over
//! `{"topics": [{"score": 4}, {"score": 6}]}` resolves to `[4, 6]`.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

/// A schema-less record; fields iterate in insertion order
pub type Document = Map<String, Value>;

/// Convert a JSON value into a document
///
/// # Errors
///
/// Returns `Error::InvalidFilter` if `value` is not an object.
pub fn into_document(value: Value) -> Result<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidFilter(format!(
            "expected a JSON object, got {}",
            type_name(&other)
        ))),
    }
}

/// A dotted path into a document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path; empty segments are rejected
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() || path.split('.').any(str::is_empty) {
            return Err(Error::InvalidFilter(format!("invalid field path '{}'", path)));
        }
        Ok(FieldPath {
            segments: path.split('.').map(str::to_string).collect(),
        })
    }

    /// Path segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Collect every value the path reaches
    ///
    /// Arrays met along the way are traversed; numeric segments also index
    /// into arrays directly (`items.0.name`).
    pub fn resolve<'a>(&self, doc: &'a Document) -> Vec<&'a Value> {
        let mut out = Vec::new();
        if let Some((first, rest)) = self.segments.split_first() {
            if let Some(v) = doc.get(first) {
                collect(v, rest, &mut out);
            }
        }
        out
    }

    /// Value at the path, with arrays along the way flattened into one array
    ///
    /// This is the aggregation view of a path reference: a single hit is
    /// returned as-is, several hits (from array traversal) become an array.
    pub fn lookup(&self, doc: &Document) -> Option<Value> {
        let (first, rest) = self.segments.split_first()?;
        let root = doc.get(first)?;
        lookup_value(root, rest)
    }

    /// Set the value at the path, creating intermediate objects
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUpdate` if a non-object sits on the path.
    pub fn set(&self, doc: &mut Document, value: Value) -> Result<()> {
        let (last, parents) = self
            .segments
            .split_last()
            .ok_or_else(|| Error::InvalidUpdate("empty field path".into()))?;

        let mut current = doc;
        for seg in parents {
            let entry = current
                .entry(seg.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            current = match entry {
                Value::Object(map) => map,
                other => {
                    return Err(Error::InvalidUpdate(format!(
                        "cannot create field '{}' inside {} at '{}'",
                        last,
                        type_name(other),
                        seg
                    )))
                }
            };
        }
        current.insert(last.clone(), value);
        Ok(())
    }

    /// Mutable reference to the value at the path, if every segment is an object key
    pub fn get_mut<'a>(&self, doc: &'a mut Document) -> Option<&'a mut Value> {
        let (first, rest) = self.segments.split_first()?;
        let mut current = doc.get_mut(first)?;
        for seg in rest {
            current = current.as_object_mut()?.get_mut(seg)?;
        }
        Some(current)
    }

    /// Remove the value at the path; returns whether something was removed
    pub fn remove(&self, doc: &mut Document) -> bool {
        let Some((last, parents)) = self.segments.split_last() else {
            return false;
        };
        let mut current = doc;
        for seg in parents {
            current = match current.get_mut(seg) {
                Some(Value::Object(map)) => map,
                _ => return false,
            };
        }
        current.remove(last).is_some()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

fn collect<'a>(value: &'a Value, rest: &[String], out: &mut Vec<&'a Value>) {
    let Some((seg, tail)) = rest.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Value::Object(map) => {
            if let Some(v) = map.get(seg) {
                collect(v, tail, out);
            }
        }
        Value::Array(items) => {
            if let Ok(idx) = seg.parse::<usize>() {
                if let Some(v) = items.get(idx) {
                    collect(v, tail, out);
                }
            } else {
                for item in items {
                    collect(item, rest, out);
                }
            }
        }
        _ => {}
    }
}

fn lookup_value(value: &Value, rest: &[String]) -> Option<Value> {
    let Some((seg, tail)) = rest.split_first() else {
        return Some(value.clone());
    };
    match value {
        Value::Object(map) => lookup_value(map.get(seg)?, tail),
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .filter_map(|item| lookup_value(item, rest))
                .collect(),
        )),
        _ => None,
    }
}

/// JSON type name used in error messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Total order over JSON values used for sorting and range comparisons
///
/// Values of different types order by type (null < numbers < strings <
/// objects < arrays < booleans); numbers compare numerically.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Equality that treats `1` and `1.0` as the same number
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_values(a, b) == Ordering::Equal,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| values_equal(l, r))
        }
        _ => a == b,
    }
}
