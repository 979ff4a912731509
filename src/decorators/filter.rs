//! Whitelist / blacklist key-value filtering.

use async_trait::async_trait;

use crate::error::Result;
use crate::loader::Loader;
use crate::value::{ConfigMap, Value};

type Predicate = Box<dyn Fn(&str, &Value) -> bool + Send + Sync>;

/// A key-value filter, tagged whitelist or blacklist.
///
/// A whitelist predicate returns `true` for entries it admits; a blacklist
/// predicate returns `true` for entries it denies. Blacklists outweigh
/// whitelists: an entry denied by any blacklist is dropped even if a
/// whitelist admits it.
pub enum Filter {
    /// Admits matching entries.
    Whitelist(Predicate),
    /// Denies matching entries.
    Blacklist(Predicate),
}

impl Filter {
    /// Build a whitelist filter from a predicate.
    pub fn whitelist(predicate: impl Fn(&str, &Value) -> bool + Send + Sync + 'static) -> Self {
        Filter::Whitelist(Box::new(predicate))
    }

    /// Build a blacklist filter from a predicate.
    pub fn blacklist(predicate: impl Fn(&str, &Value) -> bool + Send + Sync + 'static) -> Self {
        Filter::Blacklist(Box::new(predicate))
    }
}

/// Decorates a loader to whitelist / blacklist its entries.
///
/// An entry survives iff no blacklist filter denies it, and either no
/// whitelist filter exists or at least one admits it.
///
/// # Examples
///
/// ```rust,no_run
/// use conflux::decorators::{key_with_prefix, Filter, FilterKvLoader};
/// use conflux::sources::EnvLoader;
///
/// let loader = FilterKvLoader::new(
///     EnvLoader::new(),
///     vec![Filter::whitelist(key_with_prefix("APP_"))],
/// );
/// ```
pub struct FilterKvLoader<L> {
    inner: L,
    whitelist: Vec<Predicate>,
    blacklist: Vec<Predicate>,
}

impl<L: Loader> FilterKvLoader<L> {
    /// Wrap `inner`, partitioning the filters by tag.
    pub fn new(inner: L, filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut whitelist = Vec::new();
        let mut blacklist = Vec::new();
        for filter in filters {
            match filter {
                Filter::Whitelist(predicate) => whitelist.push(predicate),
                Filter::Blacklist(predicate) => blacklist.push(predicate),
            }
        }
        Self {
            inner,
            whitelist,
            blacklist,
        }
    }
}

#[async_trait]
impl<L: Loader> Loader for FilterKvLoader<L> {
    async fn load(&self) -> Result<ConfigMap> {
        let mut map = self.inner.load().await?;
        map.retain(|key, value| {
            if self.blacklist.iter().any(|denies| denies(key, value)) {
                return false;
            }
            self.whitelist.is_empty() || self.whitelist.iter().any(|admits| admits(key, value))
        });
        Ok(map)
    }
}

/// Predicate matching keys with the given prefix.
pub fn key_with_prefix(prefix: impl Into<String>) -> impl Fn(&str, &Value) -> bool {
    let prefix = prefix.into();
    move |key, _| key.starts_with(&prefix)
}

/// Predicate matching keys with the given suffix.
pub fn key_with_suffix(suffix: impl Into<String>) -> impl Fn(&str, &Value) -> bool {
    let suffix = suffix.into();
    move |key, _| key.ends_with(&suffix)
}

/// Predicate matching keys in the given list.
pub fn exact_keys<I, S>(keys: I) -> impl Fn(&str, &Value) -> bool
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
    move |key, _| keys.iter().any(|candidate| candidate == key)
}

/// Predicate matching null or empty-text values.
pub fn empty_value(_: &str, value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}
