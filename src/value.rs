//! The decoded value model.
//!
//! [`Value`] is the closed sum of everything a serialization stream can decode
//! to. It deliberately keeps the Java primitive widths; the JSON boundary
//! (`From<Value> for serde_json::Value`) flattens them into plain numbers.

use std::fmt::{self, Display};

use base64::Engine;
use chrono::{DateTime, FixedOffset, SecondsFormat};

/// A value decoded from a serialization stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Java `null`.
    Null,
    /// Java `boolean`.
    Bool(bool),
    /// Java `byte`.
    Byte(i8),
    /// Java `short`.
    Short(i16),
    /// Java `int`.
    Int(i32),
    /// Java `long`.
    Long(i64),
    /// Java `float`.
    Float(f32),
    /// Java `double`.
    Double(f64),
    /// A string. Java `char` values surface as one-character strings.
    Str(String),
    /// A raw block-data segment.
    Bytes(Vec<u8>),
    /// A point in time, produced by the `Date`/`Calendar` normalizers.
    Timestamp(DateTime<FixedOffset>),
    /// An ordered sequence.
    Array(Vec<Value>),
    /// A string-keyed mapping in decode order.
    Object(Object),
}

impl Value {
    /// RFC 3339 rendering with as many fractional digits as the instant needs.
    fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

/// The natural string form of a value, used when decoded values become map
/// keys. Lossy for compound values, which render as their JSON text.
impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Short(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Str(s) => f.write_str(s),
            Self::Bytes(b) => f.write_str(&base64::engine::general_purpose::STANDARD.encode(b)),
            Self::Timestamp(ts) => f.write_str(&Self::format_timestamp(ts)),
            Self::Array(_) | Self::Object(_) => {
                write!(f, "{}", serde_json::Value::from(self.clone()))
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(v) => Self::Bool(v),
            Value::Byte(v) => Self::Number(v.into()),
            Value::Short(v) => Self::Number(v.into()),
            Value::Int(v) => Self::Number(v.into()),
            Value::Long(v) => Self::Number(v.into()),
            Value::Float(v) => {
                // Reparse the shortest decimal form so `3.14f` stays `3.14`
                // instead of picking up f64 noise digits.
                let widened = v.to_string().parse().unwrap_or_else(|_| f64::from(v));
                serde_json::Number::from_f64(widened).map_or(Self::Null, Self::Number)
            }
            Value::Double(v) => serde_json::Number::from_f64(v).map_or(Self::Null, Self::Number),
            Value::Str(s) => Self::String(s),
            Value::Bytes(b) => {
                Self::String(base64::engine::general_purpose::STANDARD.encode(b))
            }
            Value::Timestamp(ts) => Self::String(Value::format_timestamp(&ts)),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(obj) => Self::Object(
                obj.into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

/// An ordered string-keyed mapping.
///
/// Entries keep their first-insertion order; inserting an existing key
/// replaces its value in place (derived class fields overwrite inherited
/// ones this way).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Object {
    entries: Vec<(String, Value)>,
}

impl Object {
    /// Creates an empty mapping.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Gets the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// Inserts `value` under `key`, replacing an existing entry in place.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(slot) = self
            .entries
            .iter_mut()
            .find_map(|(k, v)| (*k == key).then_some(v))
        {
            *slot = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Removes and returns the value stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Whether an entry for `key` exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// The number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in decode order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for Object {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut object = Self::new();
        for (key, value) in iter {
            object.insert(key, value);
        }
        object
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut obj = Object::new();
        obj.insert("a", Value::Int(1));
        obj.insert("b", Value::Int(2));
        obj.insert("a", Value::Int(3));
        assert_eq!(obj.len(), 2);
        assert_eq!(obj.get("a"), Some(&Value::Int(3)));
        let keys: Vec<_> = obj.iter().map(|(k, _)| k.to_owned()).collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn remove_returns_value() {
        let mut obj = Object::new();
        obj.insert("a", Value::Bool(true));
        assert_eq!(obj.remove("a"), Some(Value::Bool(true)));
        assert_eq!(obj.remove("a"), None);
        assert!(obj.is_empty());
    }

    #[test]
    fn json_numbers_flatten() {
        assert_eq!(serde_json::Value::from(Value::Byte(-4)), serde_json::json!(-4));
        assert_eq!(serde_json::Value::from(Value::Long(1 << 40)), serde_json::json!(1_i64 << 40));
        assert_eq!(serde_json::Value::from(Value::Double(0.5)), serde_json::json!(0.5));
    }

    #[test]
    fn json_float_keeps_shortest_form() {
        assert_eq!(
            serde_json::Value::from(Value::Float(3.14)),
            serde_json::json!(3.14)
        );
    }

    #[test]
    fn json_bytes_render_base64() {
        assert_eq!(
            serde_json::Value::from(Value::Bytes(vec![1, 2, 3])),
            serde_json::json!("AQID")
        );
    }

    #[test]
    fn json_timestamp_renders_rfc3339_millis() {
        let zone = FixedOffset::west_opt(3 * 3600).unwrap();
        let ts = zone.timestamp_millis_opt(1_648_645_162_302).unwrap();
        assert_eq!(
            serde_json::Value::from(Value::Timestamp(ts)),
            serde_json::json!("2022-03-30T10:19:22.302-03:00")
        );
    }

    #[test]
    fn display_is_the_natural_string_form() {
        assert_eq!(Value::Str("key1".into()).to_string(), "key1");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::Null.to_string(), "null");
    }
}
