//! Update documents for `update_many`
//!
//! Supported operators: `$set`, `$unset`, `$inc`, `$push`. Every top-level
//! key must be an operator; replacement documents are rejected.

use serde_json::{Number, Value};
use stashkit_core::document::{type_name, values_equal, Document, FieldPath};
use stashkit_core::{Error, Result, ID_FIELD};

/// One field-level change
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Replace the field
    Set(FieldPath, Value),
    /// Remove the field
    Unset(FieldPath),
    /// Add a number to the field (missing counts as 0)
    Inc(FieldPath, Number),
    /// Append to an array field (missing becomes a new array)
    Push(FieldPath, Value),
}

/// Compiled update document
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    changes: Vec<Change>,
}

impl Update {
    /// Compile an update document
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUpdate` for replacement documents, unknown
    /// operators, non-object operands, `$inc` with a non-number, or any
    /// attempt to modify `_id`.
    pub fn compile(update: &Document) -> Result<Update> {
        if update.is_empty() {
            return Err(Error::InvalidUpdate("update document is empty".into()));
        }
        let mut changes = Vec::new();
        for (op, operand) in update {
            let fields = operand.as_object().ok_or_else(|| {
                Error::InvalidUpdate(format!("{} expects an object, got {}", op, type_name(operand)))
            })?;
            for (field, value) in fields {
                if field == ID_FIELD || field.starts_with("_id.") {
                    return Err(Error::InvalidUpdate("the _id field is immutable".into()));
                }
                let path = FieldPath::parse(field)
                    .map_err(|_| Error::InvalidUpdate(format!("invalid field path '{}'", field)))?;
                changes.push(match op.as_str() {
                    "$set" => Change::Set(path, value.clone()),
                    "$unset" => Change::Unset(path),
                    "$inc" => match value {
                        Value::Number(n) => Change::Inc(path, n.clone()),
                        other => {
                            return Err(Error::InvalidUpdate(format!(
                                "$inc expects a number for '{}', got {}",
                                field,
                                type_name(other)
                            )))
                        }
                    },
                    "$push" => Change::Push(path, value.clone()),
                    other if other.starts_with('$') => {
                        return Err(Error::InvalidUpdate(format!("unknown operator '{}'", other)))
                    }
                    _ => {
                        return Err(Error::InvalidUpdate(
                            "update_many requires operator expressions, not a replacement document"
                                .into(),
                        ))
                    }
                });
            }
        }
        Ok(Update { changes })
    }

    /// Changes in application order
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Apply to a document; returns whether anything changed
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUpdate` when a change hits a field of the wrong
    /// type (`$inc` on text, `$push` on a non-array). The document may be
    /// partially updated in that case; callers apply to a copy.
    pub fn apply(&self, doc: &mut Document) -> Result<bool> {
        let mut modified = false;
        for change in &self.changes {
            modified |= apply_change(change, doc)?;
        }
        Ok(modified)
    }
}

fn apply_change(change: &Change, doc: &mut Document) -> Result<bool> {
    match change {
        Change::Set(path, value) => {
            if let Some(existing) = path.get_mut(doc) {
                if values_equal(existing, value) {
                    return Ok(false);
                }
            }
            path.set(doc, value.clone())?;
            Ok(true)
        }
        Change::Unset(path) => Ok(path.remove(doc)),
        Change::Inc(path, delta) => {
            let next = match path.get_mut(doc) {
                None => Value::Number(delta.clone()),
                Some(Value::Number(current)) => Value::Number(add_numbers(current, delta)?),
                Some(other) => {
                    return Err(Error::InvalidUpdate(format!(
                        "cannot $inc non-numeric field '{}' ({})",
                        path,
                        type_name(other)
                    )))
                }
            };
            path.set(doc, next)?;
            Ok(true)
        }
        Change::Push(path, value) => {
            match path.get_mut(doc) {
                None => path.set(doc, Value::Array(vec![value.clone()]))?,
                Some(Value::Array(items)) => items.push(value.clone()),
                Some(other) => {
                    return Err(Error::InvalidUpdate(format!(
                        "cannot $push to non-array field '{}' ({})",
                        path,
                        type_name(other)
                    )))
                }
            }
            Ok(true)
        }
    }
}

fn add_numbers(a: &Number, b: &Number) -> Result<Number> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(sum) = x.checked_add(y) {
            return Ok(Number::from(sum));
        }
    }
    let sum = a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0);
    Number::from_f64(sum).ok_or_else(|| Error::InvalidUpdate("$inc produced a non-finite number".into()))
}
