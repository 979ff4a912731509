//! In-memory configuration source.

use async_trait::async_trait;

use crate::error::Result;
use crate::loader::Loader;
use crate::value::ConfigMap;

/// An explicit in-memory configuration map.
///
/// The map is captured at construction time; every load returns a fresh
/// deep clone, so callers can mutate results freely.
///
/// Typical uses: hardcoded application defaults as the first loader of a
/// [`MultiLoader`](crate::MultiLoader) with key overwrite allowed, or
/// highest-precedence overrides as its last loader.
pub struct PlainLoader {
    map: ConfigMap,
}

impl PlainLoader {
    /// Create a loader returning clones of the given map.
    pub fn new(map: ConfigMap) -> Self {
        Self { map }
    }
}

#[async_trait]
impl Loader for PlainLoader {
    async fn load(&self) -> Result<ConfigMap> {
        Ok(self.map.clone())
    }
}
