//! Value types for stashkit
//!
//! This module defines:
//! - StoredValue: the closed set of values the cache accepts
//! - DecodeStrategy: how raw bytes are turned back into a typed value
//! - Decoded: the result of applying a strategy
//!
//! ## Normalization
//!
//! The key-value store only ever holds bytes. Text is stored as UTF-8,
//! bytes are stored as-is, and numbers are stored as their canonical text:
//!
//! - `Int(42)` becomes `"42"`
//! - `Float(3.14)` becomes `"3.14"`, `Float(1.0)` becomes `"1.0"`
//!
//! The conversion is one-way. Reading a value back requires the caller to
//! pick a [`DecodeStrategy`]; nothing remembers what type went in.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value accepted by the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoredValue {
    /// UTF-8 text
    Text(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
}

impl StoredValue {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            StoredValue::Text(_) => "text",
            StoredValue::Bytes(_) => "bytes",
            StoredValue::Int(_) => "integer",
            StoredValue::Float(_) => "float",
        }
    }

    /// True for `Int` and `Float`
    pub fn is_numeric(&self) -> bool {
        matches!(self, StoredValue::Int(_) | StoredValue::Float(_))
    }

    /// Bytes written to the store for this value
    ///
    /// Numbers are normalized to their canonical text form first.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            StoredValue::Text(s) => s.as_bytes().to_vec(),
            StoredValue::Bytes(b) => b.clone(),
            StoredValue::Int(i) => i.to_string().into_bytes(),
            StoredValue::Float(f) => canonical_float(*f).into_bytes(),
        }
    }

    /// Consume the value, producing the bytes written to the store
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            StoredValue::Text(s) => s.into_bytes(),
            StoredValue::Bytes(b) => b,
            other => other.to_bytes(),
        }
    }

    /// Source-literal rendering used when recording call arguments
    ///
    /// `Text("hi")` renders as `"hi"`, `Bytes([0, 1])` as `b"\x00\x01"`,
    /// numbers as their canonical text.
    pub fn repr(&self) -> String {
        match self {
            StoredValue::Text(s) => format!("{:?}", s),
            StoredValue::Bytes(b) => format!("b\"{}\"", b.escape_ascii()),
            StoredValue::Int(i) => i.to_string(),
            StoredValue::Float(f) => canonical_float(*f),
        }
    }
}

/// Canonical text for a float: shortest round-trip form, integral values keep `.0`
pub fn canonical_float(f: f64) -> String {
    format!("{:?}", f)
}

impl From<&str> for StoredValue {
    fn from(s: &str) -> Self {
        StoredValue::Text(s.to_string())
    }
}

impl From<String> for StoredValue {
    fn from(s: String) -> Self {
        StoredValue::Text(s)
    }
}

impl From<&String> for StoredValue {
    fn from(s: &String) -> Self {
        StoredValue::Text(s.clone())
    }
}

impl From<Vec<u8>> for StoredValue {
    fn from(b: Vec<u8>) -> Self {
        StoredValue::Bytes(b)
    }
}

impl From<&[u8]> for StoredValue {
    fn from(b: &[u8]) -> Self {
        StoredValue::Bytes(b.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for StoredValue {
    fn from(b: &[u8; N]) -> Self {
        StoredValue::Bytes(b.to_vec())
    }
}

impl From<i64> for StoredValue {
    fn from(i: i64) -> Self {
        StoredValue::Int(i)
    }
}

impl From<i32> for StoredValue {
    fn from(i: i32) -> Self {
        StoredValue::Int(i as i64)
    }
}

impl From<u32> for StoredValue {
    fn from(i: u32) -> Self {
        StoredValue::Int(i as i64)
    }
}

impl From<f64> for StoredValue {
    fn from(f: f64) -> Self {
        StoredValue::Float(f)
    }
}

impl From<f32> for StoredValue {
    /// Widens through the shortest `f32` text, so `0.1f32` stores as `0.1`
    fn from(f: f32) -> Self {
        let widened = format!("{:?}", f).parse::<f64>().unwrap_or(f as f64);
        StoredValue::Float(widened)
    }
}

/// How to interpret stored bytes on read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeStrategy {
    /// Return the bytes untouched
    #[default]
    Raw,
    /// UTF-8 text
    Text,
    /// Base-10 integer literal
    Integer,
    /// Floating-point literal
    Float,
}

impl DecodeStrategy {
    /// Name used in error messages and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            DecodeStrategy::Raw => "raw",
            DecodeStrategy::Text => "text",
            DecodeStrategy::Integer => "integer",
            DecodeStrategy::Float => "float",
        }
    }

    /// Apply the strategy to bytes read from `key`
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` when the bytes are not valid UTF-8 (all
    /// strategies but `Raw`) or do not parse as the requested number.
    pub fn decode(&self, key: &str, bytes: Vec<u8>) -> Result<Decoded> {
        if let DecodeStrategy::Raw = self {
            return Ok(Decoded::Bytes(bytes));
        }

        let text = String::from_utf8(bytes).map_err(|e| Error::decode(key, self.name(), e))?;
        match self {
            DecodeStrategy::Text => Ok(Decoded::Text(text)),
            DecodeStrategy::Integer => text
                .trim()
                .parse::<i64>()
                .map(Decoded::Int)
                .map_err(|e| Error::decode(key, self.name(), format!("{} ({:?})", e, text))),
            DecodeStrategy::Float => text
                .trim()
                .parse::<f64>()
                .map(Decoded::Float)
                .map_err(|e| Error::decode(key, self.name(), format!("{} ({:?})", e, text))),
            DecodeStrategy::Raw => unreachable!("handled above"),
        }
    }
}

impl std::str::FromStr for DecodeStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raw" | "bytes" => Ok(DecodeStrategy::Raw),
            "text" | "str" => Ok(DecodeStrategy::Text),
            "integer" | "int" => Ok(DecodeStrategy::Integer),
            "float" => Ok(DecodeStrategy::Float),
            other => Err(Error::Config(format!("unknown decode strategy '{}'", other))),
        }
    }
}

/// A value read back from the store
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Undecoded bytes
    Bytes(Vec<u8>),
    /// UTF-8 text
    Text(String),
    /// Parsed integer
    Int(i64),
    /// Parsed float
    Float(f64),
}

impl Decoded {
    /// Get bytes if this is a `Bytes` value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Decoded::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get text if this is a `Text` value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Decoded::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer if this is an `Int` value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Decoded::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the float if this is a `Float` value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Decoded::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Consume into bytes
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Decoded::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Consume into text
    pub fn into_text(self) -> Option<String> {
        match self {
            Decoded::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decoded::Bytes(b) => write!(f, "b\"{}\"", b.escape_ascii()),
            Decoded::Text(s) => write!(f, "{:?}", s),
            Decoded::Int(i) => write!(f, "{}", i),
            Decoded::Float(x) => write!(f, "{}", canonical_float(*x)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_numbers_normalize_to_text() {
        assert_eq!(StoredValue::from(42).to_bytes(), b"42");
        assert_eq!(StoredValue::from(-7i64).to_bytes(), b"-7");
        assert_eq!(StoredValue::from(3.14).to_bytes(), b"3.14");
        assert_eq!(StoredValue::from(1.0).to_bytes(), b"1.0");
    }

    #[test]
    fn test_f32_stores_its_own_shortest_text() {
        assert_eq!(StoredValue::from(0.1_f32).to_bytes(), b"0.1");
        assert_eq!(StoredValue::from(3.14_f32).to_bytes(), b"3.14");
        assert_eq!(StoredValue::from(2.0_f32).to_bytes(), StoredValue::from(2.0_f64).to_bytes());
    }

    #[test]
    fn test_text_and_bytes_stored_verbatim() {
        assert_eq!(StoredValue::from("hello").into_bytes(), b"hello");
        assert_eq!(StoredValue::from(vec![0u8, 159, 146]).into_bytes(), vec![0, 159, 146]);
        assert_eq!(StoredValue::from(b"bar").to_bytes(), b"bar");
    }

    #[test]
    fn test_repr_renders_source_literals() {
        assert_eq!(StoredValue::from("foo").repr(), "\"foo\"");
        assert_eq!(StoredValue::from("it's \"q\"").repr(), "\"it's \\\"q\\\"\"");
        assert_eq!(StoredValue::from(b"\x00ab").repr(), "b\"\\x00ab\"");
        assert_eq!(StoredValue::from(42).repr(), "42");
        assert_eq!(StoredValue::from(2.5).repr(), "2.5");
    }

    #[test]
    fn test_decode_text() {
        let out = DecodeStrategy::Text.decode("k", b"hello".to_vec()).unwrap();
        assert_eq!(out, Decoded::Text("hello".into()));
    }

    #[test]
    fn test_decode_text_rejects_invalid_utf8() {
        let err = DecodeStrategy::Text.decode("k", vec![0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, Error::Decode { expected: "text", .. }));
    }

    #[test]
    fn test_decode_integer() {
        let out = DecodeStrategy::Integer.decode("k", b"42".to_vec()).unwrap();
        assert_eq!(out.as_int(), Some(42));
    }

    #[test]
    fn test_decode_integer_rejects_float_text() {
        let err = DecodeStrategy::Integer.decode("k", b"3.14".to_vec()).unwrap_err();
        match err {
            Error::Decode { key, expected, .. } => {
                assert_eq!(key, "k");
                assert_eq!(expected, "integer");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_decode_raw_is_identity() {
        let out = DecodeStrategy::Raw.decode("k", vec![1, 2, 3]).unwrap();
        assert_eq!(out.into_bytes(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("int".parse::<DecodeStrategy>().unwrap(), DecodeStrategy::Integer);
        assert_eq!("text".parse::<DecodeStrategy>().unwrap(), DecodeStrategy::Text);
        assert!("json".parse::<DecodeStrategy>().is_err());
    }

    proptest! {
        #[test]
        fn prop_integers_round_trip(i in any::<i64>()) {
            let bytes = StoredValue::from(i).into_bytes();
            let out = DecodeStrategy::Integer.decode("k", bytes).unwrap();
            prop_assert_eq!(out.as_int(), Some(i));
        }

        #[test]
        fn prop_finite_floats_round_trip(f in any::<f64>().prop_filter("finite", |f| f.is_finite())) {
            let bytes = StoredValue::from(f).into_bytes();
            let out = DecodeStrategy::Float.decode("k", bytes).unwrap();
            prop_assert_eq!(out.as_float(), Some(f));
        }

        #[test]
        fn prop_text_round_trips(s in ".*") {
            let bytes = StoredValue::from(s.as_str()).into_bytes();
            let out = DecodeStrategy::Text.decode("k", bytes).unwrap();
            prop_assert_eq!(out.into_text(), Some(s));
        }
    }
}
