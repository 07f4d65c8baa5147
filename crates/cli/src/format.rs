//! Output → human/json/raw string formatting.
//!
//! Three modes:
//! - **Human** (default): Redis-style, e.g. `"value"`, `(integer) 42`, `(nil)`
//! - **JSON** (`--json`): `serde_json::to_string_pretty`
//! - **Raw** (`--raw`): Bare values, no quotes, no type prefixes

use serde_json::{json, Value as JsonValue};
use stashkit_core::{canonical_float, Decoded, Error};
use stashkit_engine::ReplayReport;

use crate::state::Output;

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
    Raw,
}

/// Format a successful output.
pub fn format_output(output: &Output, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => format_json(output),
        OutputMode::Raw => format_raw(output),
        OutputMode::Human => format_human(output),
    }
}

/// Format an error.
pub fn format_error(err: &Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(&json!({ "error": err.to_string() }))
            .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", err)),
        OutputMode::Raw => err.to_string(),
        OutputMode::Human => format!("(error) {}", err),
    }
}

fn format_human(output: &Output) -> String {
    match output {
        Output::Key(key) => format!("\"{}\"", key),
        Output::Value(None) => "(nil)".to_string(),
        Output::Value(Some(value)) => match value {
            Decoded::Int(i) => format!("(integer) {}", i),
            Decoded::Float(f) => format!("(float) {}", canonical_float(*f)),
            other => other.to_string(),
        },
        Output::Count { count, .. } => format!("(integer) {}", count),
        Output::Replay(report) => trim_newline(report),
        Output::Flushed => "OK".to_string(),
    }
}

fn format_raw(output: &Output) -> String {
    match output {
        Output::Key(key) => key.to_string(),
        Output::Value(None) => String::new(),
        Output::Value(Some(value)) => match value {
            Decoded::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            Decoded::Text(s) => s.clone(),
            Decoded::Int(i) => i.to_string(),
            Decoded::Float(f) => canonical_float(*f),
        },
        Output::Count { count, .. } => count.to_string(),
        Output::Replay(report) => trim_newline(report),
        Output::Flushed => "OK".to_string(),
    }
}

fn format_json(output: &Output) -> String {
    let value = match output {
        Output::Key(key) => json!({ "key": key.as_str() }),
        Output::Value(None) => JsonValue::Null,
        Output::Value(Some(value)) => match value {
            Decoded::Bytes(b) => json!({ "bytes": b }),
            Decoded::Text(s) => json!(s),
            Decoded::Int(i) => json!(i),
            Decoded::Float(f) => json!(f),
        },
        Output::Count { identity, count } => json!({ "identity": identity, "count": count }),
        Output::Replay(report) => json!({
            "identity": report.identity(),
            "calls": report
                .calls()
                .iter()
                .map(|c| json!({ "input": c.input, "output": c.output }))
                .collect::<Vec<_>>(),
        }),
        Output::Flushed => json!("OK"),
    };
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

fn trim_newline(report: &ReplayReport) -> String {
    report.to_string().trim_end_matches('\n').to_string()
}
