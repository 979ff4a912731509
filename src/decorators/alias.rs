//! Key aliasing decorator.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::loader::Loader;
use crate::value::ConfigMap;

/// Decorates a loader to add aliases for existing keys.
///
/// The alias list is flat: `[alias1, key1, alias2, key2, ...]`. For every
/// pair whose source key exists in the loaded map, the alias is inserted
/// with the same value (overwriting any existing entry under the alias
/// name). An odd-length list fails the load with
/// [`Error::AliasPairBroken`].
///
/// # Examples
///
/// ```rust,no_run
/// use conflux::decorators::AliasLoader;
/// use conflux::sources::EnvLoader;
///
/// let loader = AliasLoader::new(EnvLoader::new(), ["DB_HOST", "MYSQL_HOST"]);
/// ```
pub struct AliasLoader<L> {
    inner: L,
    alias_key_pairs: Vec<String>,
}

impl<L: Loader> AliasLoader<L> {
    /// Wrap `inner` with the given flat alias/key list.
    pub fn new<I, S>(inner: L, alias_key_pairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner,
            alias_key_pairs: alias_key_pairs.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl<L: Loader> Loader for AliasLoader<L> {
    async fn load(&self) -> Result<ConfigMap> {
        if self.alias_key_pairs.len() % 2 == 1 {
            return Err(Error::AliasPairBroken);
        }

        let mut map = self.inner.load().await?;
        for pair in self.alias_key_pairs.chunks(2) {
            let (alias, key) = (&pair[0], &pair[1]);
            if let Some(value) = map.get(key).cloned() {
                map.insert(alias.clone(), value);
            }
        }
        Ok(map)
    }
}
