//! Scalar encoding and decoding across format boundaries

use super::decimal::{ExactDecimal, MAX_DECIMAL_PRECISION};
use super::value::{Record, Value};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Longest raw excerpt carried in a decode error
const MAX_EXCERPT_CHARS: usize = 200;

/// Text formats a scalar can be encoded for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    /// JSON token (strings quoted, decimals as number literals)
    Json,
    /// CSV cell text (null is the empty cell)
    Csv,
}

/// How decimals are stored in binary columnar output
///
/// Text sinks always carry the exact digits. Binary sinks must pick one of
/// these explicitly; none of them rounds silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DecimalPolicy {
    /// Store the decimal's canonical text in a string column
    #[default]
    String,
    /// Store DECIMAL(precision, scale); values needing rounding are rejected
    Fixed { precision: u8, scale: i8 },
    /// Store a binary double (explicit, logged approximation)
    Approximate,
}

impl DecimalPolicy {
    /// Check the declared precision and scale
    pub fn validate(&self) -> Result<()> {
        if let DecimalPolicy::Fixed { precision, scale } = *self {
            if precision == 0 || precision > MAX_DECIMAL_PRECISION {
                return Err(Error::invalid_value(
                    "decimal_policy.precision",
                    format!("must be between 1 and {MAX_DECIMAL_PRECISION}, got {precision}"),
                ));
            }
            if scale < 0 || scale as u8 > precision {
                return Err(Error::invalid_value(
                    "decimal_policy.scale",
                    format!("must be between 0 and {precision}, got {scale}"),
                ));
            }
        }
        Ok(())
    }
}

/// Decode one raw scalar token (`null`, `true`, a number, a quoted string)
///
/// `position` is the line or element the token came from; it is only used
/// to label the error.
pub fn decode_scalar(raw_token: &str, position: usize) -> Result<Value> {
    let token = raw_token.trim();
    let value = match token {
        "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ if token.starts_with('"') => serde_json::from_str::<String>(token)
            .map(Value::Text)
            .map_err(|e| Error::decode(position, raw_token, e.to_string()))?,
        _ => match ExactDecimal::parse(token) {
            Some(d) if !d.is_fractional() => match token.parse::<i64>() {
                Ok(i) if i.to_string() == token => Value::Integer(i),
                _ => Value::Decimal(d),
            },
            Some(d) => Value::Decimal(d),
            None => {
                return Err(Error::decode(
                    position,
                    raw_token,
                    "token is not a JSON scalar",
                ))
            }
        },
    };
    Ok(value)
}

/// Encode a value as text for a target format
pub fn encode_scalar(value: &Value, target: TargetFormat) -> Result<String> {
    match target {
        TargetFormat::Json => Ok(serde_json::to_string(&value.to_json(false))?),
        TargetFormat::Csv => Ok(match value {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Text(s) => s.clone(),
            // nested values stay in one cell as compact JSON
            Value::Array(_) | Value::Record(_) => serde_json::to_string(&value.to_json(false))?,
        }),
    }
}

/// Decode one complete JSON document into a record
///
/// Used for NDJSON lines: syntax errors and non-object documents are both
/// per-record decode errors.
pub fn decode_record(bytes: &[u8], position: usize) -> Result<Record> {
    let value: JsonValue = serde_json::from_slice(bytes)
        .map_err(|e| Error::decode(position, raw_excerpt(bytes), e.to_string()))?;
    record_from_json(value, position, bytes)
}

/// Turn an already-parsed JSON value into a record
pub fn record_from_json(value: JsonValue, position: usize, raw: &[u8]) -> Result<Record> {
    match Value::from(value) {
        Value::Record(record) => Ok(record),
        other => Err(Error::decode(
            position,
            raw_excerpt(raw),
            format!("expected a JSON object, found {}", other.kind()),
        )),
    }
}

/// Lossy, length-limited view of raw input for error messages
pub fn raw_excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    match text.char_indices().nth(MAX_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
