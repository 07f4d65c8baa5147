//! Aggregation pipelines for the in-memory collection
//!
//! Stages run in order over a working set of documents.
//!
//! | Stage | Operand |
//! |-------|---------|
//! | `$match` | filter document (see [`crate::query`]) |
//! | `$addFields` / `$set` | `{field: expression}` |
//! | `$project` | `{field: 1 \| 0 \| expression}` |
//! | `$sort` | `{field: 1 \| -1, ...}` |
//! | `$skip` / `$limit` | non-negative integer |
//! | `$count` | output field name |
//!
//! Expressions: `"$path"` field references, `{"$literal": v}`, the
//! accumulators `$avg`, `$sum`, `$min`, `$max`, and `$size`. Anything else
//! is a literal; nested objects are evaluated field by field.

use serde_json::{Map, Number, Value};
use stashkit_core::document::{compare_values, type_name, Document, FieldPath};
use stashkit_core::{Error, Result, ID_FIELD};
use std::cmp::Ordering;

use crate::query::Filter;

/// Expression evaluated against one document
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant
    Literal(Value),
    /// `"$a.b"`
    Field(FieldPath),
    /// Object whose fields are expressions
    Object(Vec<(String, Expr)>),
    /// Accumulator over the operand's values
    Accumulate(Accumulator, Vec<Expr>, bool),
    /// Length of an array
    Size(Box<Expr>),
}

/// Accumulator operators usable inside expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulator {
    /// Arithmetic mean of numeric values
    Avg,
    /// Sum of numeric values
    Sum,
    /// Smallest non-null value
    Min,
    /// Largest non-null value
    Max,
}

/// Sort direction for one `$sort` key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// Field selection mode of a `$project` stage
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Keep only the listed fields (plus computed ones and `_id` unless excluded)
    Include {
        /// Fields copied from the input
        fields: Vec<FieldPath>,
        /// Fields computed from expressions
        computed: Vec<(FieldPath, Expr)>,
        /// Whether `_id` is kept
        keep_id: bool,
    },
    /// Drop the listed fields
    Exclude(Vec<FieldPath>),
}

/// One compiled pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Keep matching documents
    Match(Filter),
    /// Add or replace computed fields
    AddFields(Vec<(FieldPath, Expr)>),
    /// Reshape documents
    Project(Projection),
    /// Stable sort by one or more keys
    Sort(Vec<(FieldPath, Direction)>),
    /// Drop the first n documents
    Skip(usize),
    /// Keep at most n documents
    Limit(usize),
    /// Replace the working set by `{field: count}`
    Count(String),
}

/// Compiled aggregation pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Compile a pipeline given as a list of stage documents
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPipeline` for unknown stages or bad operands
    /// (filter errors inside `$match` keep their `InvalidFilter` kind).
    pub fn compile(stages: &[Value]) -> Result<Pipeline> {
        let stages = stages
            .iter()
            .enumerate()
            .map(|(i, stage)| compile_stage(i, stage))
            .collect::<Result<Vec<_>>>()?;
        Ok(Pipeline { stages })
    }

    /// Compiled stages
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run the pipeline over `docs`
    pub fn run(&self, mut docs: Vec<Document>) -> Result<Vec<Document>> {
        for stage in &self.stages {
            docs = run_stage(stage, docs)?;
        }
        Ok(docs)
    }
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidPipeline(msg.into())
}

fn pipeline_path(field: &str) -> Result<FieldPath> {
    FieldPath::parse(field).map_err(|_| invalid(format!("invalid field path '{}'", field)))
}

fn compile_stage(index: usize, stage: &Value) -> Result<Stage> {
    let map = stage
        .as_object()
        .filter(|m| m.len() == 1)
        .ok_or_else(|| invalid(format!("stage {} must be an object with exactly one key", index)))?;
    let (name, operand) = map.iter().next().ok_or_else(|| invalid("empty stage"))?;

    match name.as_str() {
        "$match" => match operand {
            Value::Object(filter) => Ok(Stage::Match(Filter::compile(filter)?)),
            other => Err(invalid(format!("$match expects an object, got {}", type_name(other)))),
        },
        "$addFields" | "$set" => {
            let fields = operand
                .as_object()
                .ok_or_else(|| invalid(format!("{} expects an object", name)))?;
            let computed = fields
                .iter()
                .map(|(field, expr)| Ok((pipeline_path(field)?, Expr::compile(expr)?)))
                .collect::<Result<Vec<_>>>()?;
            Ok(Stage::AddFields(computed))
        }
        "$project" => {
            let fields = operand
                .as_object()
                .ok_or_else(|| invalid("$project expects an object"))?;
            Ok(Stage::Project(compile_projection(fields)?))
        }
        "$sort" => {
            let keys = operand
                .as_object()
                .filter(|m| !m.is_empty())
                .ok_or_else(|| invalid("$sort expects a non-empty object"))?;
            let keys = keys
                .iter()
                .map(|(field, dir)| {
                    let direction = match dir.as_i64() {
                        Some(1) => Direction::Ascending,
                        Some(-1) => Direction::Descending,
                        _ => return Err(invalid(format!("$sort direction for '{}' must be 1 or -1", field))),
                    };
                    Ok((pipeline_path(field)?, direction))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Stage::Sort(keys))
        }
        "$skip" | "$limit" => {
            let n = operand
                .as_u64()
                .ok_or_else(|| invalid(format!("{} expects a non-negative integer", name)))?;
            let n = usize::try_from(n).unwrap_or(usize::MAX);
            Ok(if name == "$skip" {
                Stage::Skip(n)
            } else {
                Stage::Limit(n)
            })
        }
        "$count" => match operand {
            Value::String(field) if !field.is_empty() && !field.starts_with('$') => {
                Ok(Stage::Count(field.clone()))
            }
            _ => Err(invalid("$count expects a non-empty field name")),
        },
        other => Err(invalid(format!("unknown stage '{}'", other))),
    }
}

fn compile_projection(fields: &Map<String, Value>) -> Result<Projection> {
    let mut include = Vec::new();
    let mut exclude = Vec::new();
    let mut computed = Vec::new();
    let mut keep_id = true;

    for (field, spec) in fields {
        let flag = match spec {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => Some(n.as_f64() != Some(0.0)),
            _ => None,
        };
        match flag {
            Some(on) if field == ID_FIELD => keep_id = on,
            Some(true) => include.push(pipeline_path(field)?),
            Some(false) => exclude.push(pipeline_path(field)?),
            None => computed.push((pipeline_path(field)?, Expr::compile(spec)?)),
        }
    }

    if !exclude.is_empty() && (!include.is_empty() || !computed.is_empty()) {
        return Err(invalid("$project cannot mix inclusion and exclusion"));
    }
    if !exclude.is_empty() || (include.is_empty() && computed.is_empty()) {
        if !keep_id {
            exclude.push(pipeline_path(ID_FIELD)?);
        }
        return Ok(Projection::Exclude(exclude));
    }
    Ok(Projection::Include {
        fields: include,
        computed,
        keep_id,
    })
}

impl Expr {
    /// Compile an expression
    pub fn compile(value: &Value) -> Result<Expr> {
        match value {
            Value::String(s) if s.starts_with('$') => Ok(Expr::Field(pipeline_path(&s[1..])?)),
            Value::Object(map) if map.len() == 1 && map.keys().all(|k| k.starts_with('$')) => {
                let (op, operand) = map.iter().next().ok_or_else(|| invalid("empty expression"))?;
                let acc = match op.as_str() {
                    "$literal" => return Ok(Expr::Literal(operand.clone())),
                    "$size" => return Ok(Expr::Size(Box::new(Expr::compile(operand)?))),
                    "$avg" => Accumulator::Avg,
                    "$sum" => Accumulator::Sum,
                    "$min" => Accumulator::Min,
                    "$max" => Accumulator::Max,
                    other => return Err(invalid(format!("unknown expression operator '{}'", other))),
                };
                match operand {
                    Value::Array(items) => Ok(Expr::Accumulate(
                        acc,
                        items.iter().map(Expr::compile).collect::<Result<Vec<_>>>()?,
                        false,
                    )),
                    single => Ok(Expr::Accumulate(acc, vec![Expr::compile(single)?], true)),
                }
            }
            Value::Object(map) => {
                if let Some(op) = map.keys().find(|k| k.starts_with('$')) {
                    return Err(invalid(format!("operator '{}' must be the only key", op)));
                }
                Ok(Expr::Object(
                    map.iter()
                        .map(|(k, v)| Ok((k.clone(), Expr::compile(v)?)))
                        .collect::<Result<Vec<_>>>()?,
                ))
            }
            other => Ok(Expr::Literal(other.clone())),
        }
    }

    /// Evaluate against a document; missing fields evaluate to null
    pub fn eval(&self, doc: &Document) -> Result<Value> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Field(path) => Ok(path.lookup(doc).unwrap_or(Value::Null)),
            Expr::Object(fields) => {
                let mut out = Map::new();
                for (k, e) in fields {
                    out.insert(k.clone(), e.eval(doc)?);
                }
                Ok(Value::Object(out))
            }
            Expr::Size(inner) => match inner.eval(doc)? {
                Value::Array(items) => Ok(Value::from(items.len() as u64)),
                other => Err(invalid(format!("$size expects an array, got {}", type_name(&other)))),
            },
            Expr::Accumulate(acc, operands, single) => {
                let mut values = Vec::new();
                for e in operands {
                    match e.eval(doc)? {
                        // A lone operand that yields an array accumulates over its elements
                        Value::Array(items) if *single => values.extend(items),
                        v => values.push(v),
                    }
                }
                Ok(accumulate(*acc, values))
            }
        }
    }
}

fn accumulate(acc: Accumulator, values: Vec<Value>) -> Value {
    match acc {
        Accumulator::Avg => {
            let nums: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
            if nums.is_empty() {
                Value::Null
            } else {
                float_value(nums.iter().sum::<f64>() / nums.len() as f64)
            }
        }
        Accumulator::Sum => {
            let nums: Vec<&Number> = values
                .iter()
                .filter_map(|v| match v {
                    Value::Number(n) => Some(n),
                    _ => None,
                })
                .collect();
            let int_sum = nums
                .iter()
                .try_fold(0i64, |acc, n| n.as_i64().and_then(|i| acc.checked_add(i)));
            match int_sum {
                Some(total) => Value::from(total),
                None => float_value(nums.iter().filter_map(|n| n.as_f64()).sum()),
            }
        }
        Accumulator::Min | Accumulator::Max => {
            let want = if acc == Accumulator::Min {
                Ordering::Less
            } else {
                Ordering::Greater
            };
            values
                .into_iter()
                .filter(|v| !v.is_null())
                .reduce(|best, v| if compare_values(&v, &best) == want { v } else { best })
                .unwrap_or(Value::Null)
        }
    }
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn run_stage(stage: &Stage, docs: Vec<Document>) -> Result<Vec<Document>> {
    match stage {
        Stage::Match(filter) => Ok(docs.into_iter().filter(|d| filter.matches(d)).collect()),
        Stage::AddFields(fields) => docs
            .into_iter()
            .map(|mut doc| -> Result<Document> {
                // Expressions see the document as it was before this stage
                let values = fields
                    .iter()
                    .map(|(_, e)| e.eval(&doc))
                    .collect::<Result<Vec<_>>>()?;
                for ((path, _), v) in fields.iter().zip(values) {
                    path.set(&mut doc, v)
                        .map_err(|e| invalid(format!("$addFields: {}", e)))?;
                }
                Ok(doc)
            })
            .collect(),
        Stage::Project(projection) => docs.into_iter().map(|d| project(projection, d)).collect(),
        Stage::Sort(keys) => {
            let mut docs = docs;
            docs.sort_by(|a, b| {
                for (path, dir) in keys {
                    let av = path.lookup(a).unwrap_or(Value::Null);
                    let bv = path.lookup(b).unwrap_or(Value::Null);
                    let ord = compare_values(&av, &bv);
                    let ord = match dir {
                        Direction::Ascending => ord,
                        Direction::Descending => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
            Ok(docs)
        }
        Stage::Skip(n) => Ok(docs.into_iter().skip(*n).collect()),
        Stage::Limit(n) => Ok(docs.into_iter().take(*n).collect()),
        Stage::Count(field) => {
            let mut out = Document::new();
            out.insert(field.clone(), Value::from(docs.len() as u64));
            Ok(vec![out])
        }
    }
}

fn project(projection: &Projection, mut doc: Document) -> Result<Document> {
    match projection {
        Projection::Exclude(fields) => {
            for path in fields {
                path.remove(&mut doc);
            }
            Ok(doc)
        }
        Projection::Include {
            fields,
            computed,
            keep_id,
        } => {
            let mut out = Document::new();
            if *keep_id {
                if let Some(id) = doc.get(ID_FIELD) {
                    out.insert(ID_FIELD.to_string(), id.clone());
                }
            }
            for path in fields {
                if let Some(v) = path.lookup(&doc) {
                    path.set(&mut out, v)
                        .map_err(|e| invalid(format!("$project: {}", e)))?;
                }
            }
            for (path, expr) in computed {
                let v = expr.eval(&doc)?;
                path.set(&mut out, v)
                    .map_err(|e| invalid(format!("$project: {}", e)))?;
            }
            Ok(out)
        }
    }
}
