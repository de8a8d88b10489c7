//! Record and value model
//!
//! [`Value`] is the tagged union every stage works with. Numbers are split at
//! decode time into [`Value::Integer`] and [`Value::Decimal`]; the decimal
//! branch keeps the literal text, so nothing passes through `f64` unless a
//! sink asks for it.

use super::decimal::ExactDecimal;
use serde_json::{Map, Number, Value as JsonValue};

/// A single decoded value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Decimal(ExactDecimal),
    Text(String),
    Array(Vec<Value>),
    Record(Record),
}

impl Value {
    /// Short type name used in log messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Record(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this is an array or a nested record
    pub fn is_nested(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Record(_))
    }

    /// Convert to a `serde_json` value for writing
    ///
    /// Decimals become number literals carrying the exact original digits,
    /// or JSON strings when `quote_decimals` is set.
    pub fn to_json(&self, quote_decimals: bool) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Integer(i) => JsonValue::Number((*i).into()),
            Value::Decimal(d) if quote_decimals => JsonValue::String(d.to_string()),
            Value::Decimal(d) => d
                .as_str()
                .parse::<Number>()
                .map_or_else(|_| JsonValue::String(d.to_string()), JsonValue::Number),
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Array(items) => {
                JsonValue::Array(items.iter().map(|v| v.to_json(quote_decimals)).collect())
            }
            Value::Record(record) => record.to_json(quote_decimals),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => number_to_value(&n),
            JsonValue::String(s) => Value::Text(s),
            JsonValue::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(map) => Value::Record(Record::from(map)),
        }
    }
}

/// Split a number literal into an integer or an exact decimal
///
/// `serde_json` is built with `arbitrary_precision`, so `to_string` returns
/// the literal exactly as it appeared in the input.
fn number_to_value(n: &Number) -> Value {
    let text = n.to_string();
    if let Ok(i) = text.parse::<i64>() {
        // "-0" parses but would print as "0"
        if i.to_string() == text {
            return Value::Integer(i);
        }
    }
    match ExactDecimal::parse(&text) {
        Some(d) => Value::Decimal(d),
        None => Value::Text(text),
    }
}

/// An ordered mapping from field name to value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing an existing field of the same name in place
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Field names in document order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert to a JSON object, keeping field order
    pub fn to_json(&self, quote_decimals: bool) -> JsonValue {
        let map: Map<String, JsonValue> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json(quote_decimals)))
            .collect();
        JsonValue::Object(map)
    }
}

impl From<Map<String, JsonValue>> for Record {
    fn from(map: Map<String, JsonValue>) -> Self {
        // object keys are already unique
        Self {
            fields: map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
        }
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
