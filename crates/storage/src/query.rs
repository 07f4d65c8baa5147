//! Query filters for the in-memory collection
//!
//! A filter document is compiled once into a [`Filter`] tree, so malformed
//! filters are rejected even when the collection is empty.
//!
//! ## Supported syntax
//!
//! | Form | Meaning |
//! |------|---------|
//! | `{"name": "Holberton"}` | field equals value, or array field contains it |
//! | `{"a.b": 1}` | dotted path, arrays traversed |
//! | `{"n": {"$gt": 3, "$lte": 9}}` | comparison operators, all must hold |
//! | `{"t": {"$in": [..]}}` / `$nin` | membership |
//! | `{"t": {"$exists": true}}` | presence |
//! | `{"$and": [..]}` / `{"$or": [..]}` | boolean combination |
//!
//! Comparisons only match values of the same JSON type, so `{"$gt": 3}`
//! never matches a string.

use serde_json::Value;
use stashkit_core::document::{compare_values, type_name, values_equal, Document, FieldPath};
use stashkit_core::{Error, Result};
use std::cmp::Ordering;

/// Compiled filter
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every sub-filter must match (also used for multi-key filter documents)
    And(Vec<Filter>),
    /// At least one sub-filter must match
    Or(Vec<Filter>),
    /// Condition on a single field
    Field {
        /// Field being tested
        path: FieldPath,
        /// Test applied to the field's values
        condition: Condition,
    },
}

/// Test applied to the values found at a field path
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Equal to, or array containing
    Eq(Value),
    /// Negation of `Eq`
    Ne(Value),
    /// Ordered comparison against a value of the same type
    Cmp(Ordering, bool, Value),
    /// Equal to any listed value
    In(Vec<Value>),
    /// Equal to none of the listed values
    Nin(Vec<Value>),
    /// Field present (`true`) or absent (`false`)
    Exists(bool),
}

impl Filter {
    /// Compile a filter document
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidFilter` for unknown operators, bad operands,
    /// or invalid field paths.
    pub fn compile(filter: &Document) -> Result<Filter> {
        let mut clauses = Vec::with_capacity(filter.len());
        for (key, value) in filter {
            clauses.push(compile_clause(key, value)?);
        }
        Ok(if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            Filter::And(clauses)
        })
    }

    /// Filter that matches everything
    pub fn all() -> Filter {
        Filter::And(Vec::new())
    }

    /// Evaluate against a document
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::And(parts) => parts.iter().all(|f| f.matches(doc)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(doc)),
            Filter::Field { path, condition } => condition.test(&path.resolve(doc)),
        }
    }
}

fn compile_clause(key: &str, value: &Value) -> Result<Filter> {
    match key {
        "$and" | "$or" => {
            let items = value.as_array().ok_or_else(|| {
                Error::InvalidFilter(format!("{} expects an array of filters", key))
            })?;
            if items.is_empty() {
                return Err(Error::InvalidFilter(format!("{} must not be empty", key)));
            }
            let parts = items
                .iter()
                .map(|item| match item {
                    Value::Object(sub) => Filter::compile(sub),
                    other => Err(Error::InvalidFilter(format!(
                        "{} entries must be objects, got {}",
                        key,
                        type_name(other)
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(if key == "$and" {
                Filter::And(parts)
            } else {
                Filter::Or(parts)
            })
        }
        op if op.starts_with('$') => Err(Error::InvalidFilter(format!(
            "unknown top-level operator '{}'",
            op
        ))),
        field => {
            let path = FieldPath::parse(field)?;
            match value {
                Value::Object(ops) if is_operator_object(ops) => {
                    let mut parts = ops
                        .iter()
                        .map(|(op, operand)| {
                            Ok(Filter::Field {
                                path: path.clone(),
                                condition: compile_operator(op, operand)?,
                            })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Ok(if parts.len() == 1 {
                        parts.remove(0)
                    } else {
                        Filter::And(parts)
                    })
                }
                literal => Ok(Filter::Field {
                    path,
                    condition: Condition::Eq(literal.clone()),
                }),
            }
        }
    }
}

fn is_operator_object(map: &Document) -> bool {
    !map.is_empty() && map.keys().all(|k| k.starts_with('$'))
}

fn compile_operator(op: &str, operand: &Value) -> Result<Condition> {
    let list = |operand: &Value| -> Result<Vec<Value>> {
        operand
            .as_array()
            .cloned()
            .ok_or_else(|| Error::InvalidFilter(format!("{} expects an array", op)))
    };
    Ok(match op {
        "$eq" => Condition::Eq(operand.clone()),
        "$ne" => Condition::Ne(operand.clone()),
        "$gt" => Condition::Cmp(Ordering::Greater, false, operand.clone()),
        "$gte" => Condition::Cmp(Ordering::Greater, true, operand.clone()),
        "$lt" => Condition::Cmp(Ordering::Less, false, operand.clone()),
        "$lte" => Condition::Cmp(Ordering::Less, true, operand.clone()),
        "$in" => Condition::In(list(operand)?),
        "$nin" => Condition::Nin(list(operand)?),
        "$exists" => match operand {
            Value::Bool(b) => Condition::Exists(*b),
            Value::Number(n) => Condition::Exists(n.as_f64() != Some(0.0)),
            other => {
                return Err(Error::InvalidFilter(format!(
                    "$exists expects a boolean, got {}",
                    type_name(other)
                )))
            }
        },
        other => return Err(Error::InvalidFilter(format!("unknown operator '{}'", other))),
    })
}

/// Values to compare: each resolved value plus the elements of resolved arrays
fn candidates<'a, 'b>(values: &'b [&'a Value]) -> impl Iterator<Item = &'a Value> + 'b
where
    'a: 'b,
{
    values.iter().flat_map(|v| {
        let v: &'a Value = *v;
        let elements: Box<dyn Iterator<Item = &'a Value> + 'a> = match v {
            Value::Array(items) => Box::new(std::iter::once(v).chain(items.iter())),
            _ => Box::new(std::iter::once(v)),
        };
        elements
    })
}

fn equals_any(values: &[&Value], target: &Value) -> bool {
    if target.is_null() && values.is_empty() {
        return true;
    }
    candidates(values).any(|c| values_equal(c, target))
}

fn same_type(a: &Value, b: &Value) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

impl Condition {
    /// Apply the condition to the values resolved at the field path
    pub fn test(&self, values: &[&Value]) -> bool {
        match self {
            Condition::Eq(target) => equals_any(values, target),
            Condition::Ne(target) => !equals_any(values, target),
            Condition::Cmp(direction, inclusive, target) => candidates(values)
                .filter(|c| same_type(c, target))
                .any(|c| {
                    let ord = compare_values(c, target);
                    ord == *direction || (*inclusive && ord == Ordering::Equal)
                }),
            Condition::In(targets) => targets.iter().any(|t| equals_any(values, t)),
            Condition::Nin(targets) => !targets.iter().any(|t| equals_any(values, t)),
            Condition::Exists(expected) => !values.is_empty() == *expected,
        }
    }
}
