//! The dynamically-typed configuration value model.
//!
//! A configuration map is heterogeneous by design: a source may legitimately
//! produce a number, a string or a nested map under a given key. [`Value`]
//! is the tagged sum holding every shape the loaders produce, and
//! [`ConfigMap`] is the text-keyed map every [`Loader`](crate::Loader)
//! returns.
//!
//! `Value` owns all of its data, so `Clone` is a deep copy: the ownership
//! invariant — a loaded map may be mutated freely without affecting any
//! cache or any later load — falls out of cloning at the cache boundaries.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// A text-keyed configuration map, as returned by every loader.
pub type ConfigMap = HashMap<String, Value>;

/// A dynamically-typed configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent / null value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer (JSON numbers beyond `i64::MAX`).
    Uint(u64),
    /// Floating point.
    Float(f64),
    /// Text.
    String(String),
    /// A span of time.
    Duration(Duration),
    /// An absolute point in time.
    Timestamp(DateTime<Utc>),
    /// Ordered sequence of untyped values.
    Array(Vec<Value>),
    /// Ordered sequence of text.
    StringArray(Vec<String>),
    /// Ordered sequence of signed integers.
    IntArray(Vec<i64>),
    /// Nested mapping with text keys.
    Map(ConfigMap),
    /// Nested mapping with untyped keys, as YAML can produce.
    ///
    /// Kept as an association list: untyped keys have no useful hash, and
    /// nothing in the crate looks entries up by key in this shape.
    KeyedMap(Vec<(Value, Value)>),
}

impl Value {
    /// True if this value is a nested mapping of either key shape.
    pub fn is_mapping(&self) -> bool {
        matches!(self, Value::Map(_) | Value::KeyedMap(_))
    }

    /// Borrow the text content, if this value is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::String(text.to_owned())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::String(text)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Bool(flag)
    }
}

impl From<i32> for Value {
    fn from(number: i32) -> Self {
        Value::Int(i64::from(number))
    }
}

impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Value::Int(number)
    }
}

impl From<u64> for Value {
    fn from(number: u64) -> Self {
        Value::Uint(number)
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self {
        Value::Float(number)
    }
}

impl From<Duration> for Value {
    fn from(duration: Duration) -> Self {
        Value::Duration(duration)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(timestamp: DateTime<Utc>) -> Self {
        Value::Timestamp(timestamp)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::StringArray(items)
    }
}

impl From<Vec<i64>> for Value {
    fn from(items: Vec<i64>) -> Self {
        Value::IntArray(items)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(flag) => Value::Bool(flag),
            serde_json::Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    Value::Int(int)
                } else if let Some(uint) = number.as_u64() {
                    Value::Uint(uint)
                } else {
                    Value::Float(number.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(text) => Value::String(text),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<serde_yaml::Value> for Value {
    fn from(value: serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(flag) => Value::Bool(flag),
            serde_yaml::Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    Value::Int(int)
                } else if let Some(uint) = number.as_u64() {
                    Value::Uint(uint)
                } else {
                    Value::Float(number.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_yaml::Value::String(text) => Value::String(text),
            serde_yaml::Value::Sequence(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_yaml::Value::Mapping(mapping) => from_yaml_mapping(mapping),
            serde_yaml::Value::Tagged(tagged) => Value::from(tagged.value),
        }
    }
}

/// A YAML mapping with only string keys becomes [`Value::Map`]; any
/// non-string key demotes the whole mapping to [`Value::KeyedMap`].
fn from_yaml_mapping(mapping: serde_yaml::Mapping) -> Value {
    let all_string_keys = mapping.iter().all(|(key, _)| key.is_string());
    if all_string_keys {
        Value::Map(
            mapping
                .into_iter()
                .map(|(key, value)| {
                    let key = match key {
                        serde_yaml::Value::String(text) => text,
                        _ => unreachable!("checked above"),
                    };
                    (key, Value::from(value))
                })
                .collect(),
        )
    } else {
        Value::KeyedMap(
            mapping
                .into_iter()
                .map(|(key, value)| (Value::from(key), Value::from(value)))
                .collect(),
        )
    }
}

impl From<toml::Value> for Value {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(text) => Value::String(text),
            toml::Value::Integer(int) => Value::Int(int),
            toml::Value::Float(float) => Value::Float(float),
            toml::Value::Boolean(flag) => Value::Bool(flag),
            // TOML datetimes keep their textual form; the coercion layer
            // parses them on demand.
            toml::Value::Datetime(datetime) => Value::String(datetime.to_string()),
            toml::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            toml::Value::Table(table) => Value::Map(
                table
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_numbers_keep_their_natural_mapping() {
        let json: serde_json::Value = serde_json::from_str(
            r#"{"int": 3306, "float": 3.5, "big": 18446744073709551615}"#,
        )
        .unwrap();
        let value = Value::from(json);
        let Value::Map(map) = value else {
            panic!("expected a map")
        };
        assert_eq!(map["int"], Value::Int(3306));
        assert_eq!(map["float"], Value::Float(3.5));
        assert_eq!(map["big"], Value::Uint(u64::MAX));
    }

    #[test]
    fn yaml_non_string_keys_become_keyed_map() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("1: one\n2: two\n").unwrap();
        let value = Value::from(yaml);
        let Value::KeyedMap(pairs) = value else {
            panic!("expected a keyed map")
        };
        assert!(pairs.contains(&(Value::Int(1), Value::String("one".into()))));
        assert!(pairs.contains(&(Value::Int(2), Value::String("two".into()))));
    }

    #[test]
    fn yaml_string_keys_become_map() {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str("host: localhost\nport: 3306\n").unwrap();
        let Value::Map(map) = Value::from(yaml) else {
            panic!("expected a map")
        };
        assert_eq!(map["host"], Value::String("localhost".into()));
        assert_eq!(map["port"], Value::Int(3306));
    }

    #[test]
    fn clone_is_a_deep_copy() {
        let mut original = ConfigMap::new();
        original.insert(
            "list".into(),
            Value::StringArray(vec!["bread".into(), "milk".into()]),
        );
        original.insert("nested".into(), {
            let mut inner = ConfigMap::new();
            inner.insert("key".into(), Value::String("value".into()));
            Value::Map(inner)
        });

        let mut copy = original.clone();
        if let Some(Value::StringArray(items)) = copy.get_mut("list") {
            items[0] = "x".into();
        }
        if let Some(Value::Map(inner)) = copy.get_mut("nested") {
            inner.insert("key".into(), Value::String("mutated".into()));
        }

        assert_eq!(
            original["list"],
            Value::StringArray(vec!["bread".into(), "milk".into()])
        );
        let Value::Map(inner) = &original["nested"] else {
            panic!("expected a map")
        };
        assert_eq!(inner["key"], Value::String("value".into()));
    }
}
