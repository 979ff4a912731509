//! Value transformation decorator.

use async_trait::async_trait;

use crate::error::Result;
use crate::loader::Loader;
use crate::value::{ConfigMap, Value};

/// Decorates a loader to transform the values of selected keys.
///
/// The transformation is applied to every listed key present in the loaded
/// map; missing keys are left untouched.
///
/// # Examples
///
/// ```rust,no_run
/// use conflux::decorators::{to_string_list, AlterValueLoader};
/// use conflux::sources::EnvLoader;
///
/// // "bread,milk,eggs" -> ["bread", "milk", "eggs"]
/// let loader = AlterValueLoader::new(
///     EnvLoader::new(),
///     to_string_list(","),
///     ["SHOPPING_LIST"],
/// );
/// ```
pub struct AlterValueLoader<L> {
    inner: L,
    transform: Box<dyn Fn(Value) -> Value + Send + Sync>,
    keys: Vec<String>,
}

impl<L: Loader> AlterValueLoader<L> {
    /// Wrap `inner`, applying `transform` to each of `keys`.
    pub fn new<I, S>(
        inner: L,
        transform: impl Fn(Value) -> Value + Send + Sync + 'static,
        keys: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner,
            transform: Box::new(transform),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl<L: Loader> Loader for AlterValueLoader<L> {
    async fn load(&self) -> Result<ConfigMap> {
        let mut map = self.inner.load().await?;
        for key in &self.keys {
            if let Some(value) = map.remove(key) {
                map.insert(key.clone(), (self.transform)(value));
            }
        }
        Ok(map)
    }
}

/// Transform splitting a text value into a text sequence by `separator`.
///
/// Non-text values pass through unchanged.
pub fn to_string_list(separator: impl Into<String>) -> impl Fn(Value) -> Value {
    let separator = separator.into();
    move |value| match value {
        Value::String(text) => {
            Value::StringArray(text.split(&separator).map(str::to_owned).collect())
        }
        other => other,
    }
}

/// Transform splitting a text value into an integer sequence by `separator`.
///
/// Non-text values, and text whose items do not all parse as integers,
/// pass through unchanged.
pub fn to_int_list(separator: impl Into<String>) -> impl Fn(Value) -> Value {
    let separator = separator.into();
    move |value| match value {
        Value::String(text) => {
            let items: Option<Vec<i64>> = text
                .split(&separator)
                .map(|item| item.trim().parse().ok())
                .collect();
            match items {
                Some(items) => Value::IntArray(items),
                None => Value::String(text),
            }
        }
        other => other,
    }
}
