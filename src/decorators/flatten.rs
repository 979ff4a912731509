//! Nested-key flattening decorator.

use async_trait::async_trait;

use crate::error::Result;
use crate::loader::Loader;
use crate::value::{ConfigMap, Value};

/// Decorates a loader to add flat shortcuts for nested leaf keys.
///
/// Given `{"db": {"mysql": {"host": "H"}}}`, the loaded map additionally
/// contains `"db.mysql.host": "H"`. Both text-keyed and untyped-keyed
/// nested mappings are walked; non-text keys are stringified. The nested
/// originals are kept unless [`flat_keys_only`](Self::flat_keys_only) is
/// set.
///
/// # Examples
///
/// ```rust,no_run
/// use conflux::decorators::FlattenLoader;
/// use conflux::sources::YamlLoader;
///
/// let loader = FlattenLoader::new(YamlLoader::from_path("db.yaml"))
///     .with_separator("/");
/// ```
pub struct FlattenLoader<L> {
    inner: L,
    separator: String,
    flat_only: bool,
}

impl<L: Loader> FlattenLoader<L> {
    /// Wrap `inner` with the default `.` separator.
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            separator: ".".to_owned(),
            flat_only: false,
        }
    }

    /// Use a different separator for the flat keys.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Drop the nested originals, keeping only the flat keys.
    pub fn flat_keys_only(mut self) -> Self {
        self.flat_only = true;
        self
    }
}

#[async_trait]
impl<L: Loader> Loader for FlattenLoader<L> {
    async fn load(&self) -> Result<ConfigMap> {
        let mut map = self.inner.load().await?;

        let mut flat = ConfigMap::new();
        for (key, value) in &map {
            collect_leaves(key.clone(), value, &self.separator, &mut flat);
        }
        if self.flat_only {
            map.retain(|_, value| !value.is_mapping());
        }
        map.extend(flat);

        Ok(map)
    }
}

/// Record every leaf under `value` into `flat`, keyed by the joined path.
fn collect_leaves(path: String, value: &Value, separator: &str, flat: &mut ConfigMap) {
    match value {
        Value::Map(nested) => {
            for (key, value) in nested {
                collect_leaves(format!("{path}{separator}{key}"), value, separator, flat);
            }
        }
        Value::KeyedMap(pairs) => {
            for (key, value) in pairs {
                let key = key_to_string(key);
                collect_leaves(format!("{path}{separator}{key}"), value, separator, flat);
            }
        }
        leaf => {
            flat.insert(path, leaf.clone());
        }
    }
}

/// Stringify an untyped mapping key.
fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Int(int) => int.to_string(),
        Value::Uint(uint) => uint.to_string(),
        Value::Float(float) => float.to_string(),
        Value::Null => "null".to_owned(),
        other => format!("{other:?}"),
    }
}
