//! ArgMatches → Request/MetaCommand conversion.
//!
//! Translates clap's parsed arguments into a [`Request`] for the session,
//! and recognizes REPL meta-commands before clap sees the line.

use clap::ArgMatches;
use stashkit_core::{DecodeStrategy, StoredValue};
use stashkit_engine::STORE_IDENTITY;

/// One command against the session's cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Store(StoredValue),
    Get { key: String, strategy: DecodeStrategy },
    Count { identity: String },
    Replay { identity: String },
    Flush,
}

/// REPL meta-commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Help { command: Option<String> },
    Quit,
    Clear,
}

/// Check for REPL meta-commands before delegating to clap.
pub fn check_meta_command(line: &str) -> Option<MetaCommand> {
    let mut parts = line.trim().splitn(2, char::is_whitespace);
    match parts.next()? {
        "quit" | "exit" => Some(MetaCommand::Quit),
        "clear" => Some(MetaCommand::Clear),
        "help" => {
            let command = parts
                .next()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            Some(MetaCommand::Help { command })
        }
        _ => None,
    }
}

/// Convert clap ArgMatches into a Request.
pub fn matches_to_request(matches: &ArgMatches) -> Result<Request, String> {
    let (sub_name, sub) = matches
        .subcommand()
        .ok_or_else(|| "No command provided".to_string())?;

    match sub_name {
        "store" => parse_store(sub),
        "get" => {
            let key = required(sub, "key")?;
            let strategy = sub
                .get_one::<String>("as")
                .map(|s| s.parse::<DecodeStrategy>())
                .transpose()
                .map_err(|e| e.to_string())?
                .unwrap_or(DecodeStrategy::Text);
            Ok(Request::Get { key, strategy })
        }
        "count" => Ok(Request::Count {
            identity: identity(sub),
        }),
        "replay" => Ok(Request::Replay {
            identity: identity(sub),
        }),
        "flush" => Ok(Request::Flush),
        other => Err(format!("Unknown command: {}", other)),
    }
}

fn required(matches: &ArgMatches, name: &str) -> Result<String, String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .ok_or_else(|| format!("Missing argument: {}", name))
}

fn identity(matches: &ArgMatches) -> String {
    matches
        .get_one::<String>("identity")
        .cloned()
        .unwrap_or_else(|| STORE_IDENTITY.to_string())
}

fn parse_store(matches: &ArgMatches) -> Result<Request, String> {
    let raw = required(matches, "value")?;
    let value = if matches.get_flag("int") {
        raw.trim()
            .parse::<i64>()
            .map(StoredValue::Int)
            .map_err(|e| format!("Invalid integer '{}': {}", raw, e))?
    } else if matches.get_flag("float") {
        raw.trim()
            .parse::<f64>()
            .map(StoredValue::Float)
            .map_err(|e| format!("Invalid float '{}': {}", raw, e))?
    } else if matches.get_flag("bytes") {
        StoredValue::Bytes(parse_hex(&raw)?)
    } else {
        StoredValue::Text(raw)
    };
    Ok(Request::Store(value))
}

/// Decode hex text such as `00ff10` (an optional `0x` prefix is allowed).
pub fn parse_hex(text: &str) -> Result<Vec<u8>, String> {
    let digits = text.trim();
    let digits = digits.strip_prefix("0x").unwrap_or(digits);
    if digits.len() % 2 != 0 {
        return Err(format!("Hex value '{}' has an odd number of digits", text));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("Invalid hex value '{}'", text))
        })
        .collect()
}
