//! Multi-source merge.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::error::{Error, Result};
use crate::loader::Loader;
use crate::value::ConfigMap;

/// A composite loader that merges configuration from multiple loaders.
///
/// All children load concurrently (the whole point is overlapping I/O
/// against files, Consul and Etcd); results are then merged strictly in
/// declaration order, so overwrite precedence is deterministic regardless
/// of completion order.
///
/// With key overwrite allowed, a later loader's entry replaces an earlier
/// loader's entry under the same key. Without it, every key seen twice —
/// compared case-insensitively — produces a [`Error::KeyConflict`], and all
/// conflicts plus all child errors are accumulated into one
/// [`Error::Multi`] so operators see every offending source in one report.
///
/// # Examples
///
/// ```rust,no_run
/// use conflux::sources::{EnvLoader, FileLoader};
/// use conflux::MultiLoader;
///
/// // env overrides file
/// let loader = MultiLoader::new(true)
///     .with_loader(FileLoader::new("config/app.yaml"))
///     .with_loader(EnvLoader::new());
/// ```
pub struct MultiLoader {
    loaders: Vec<Arc<dyn Loader>>,
    allow_key_overwrite: bool,
}

impl MultiLoader {
    /// Create an empty multi-loader.
    ///
    /// `allow_key_overwrite` decides whether a later loader may overwrite a
    /// key an earlier loader produced, or whether duplicates are conflicts.
    pub fn new(allow_key_overwrite: bool) -> Self {
        Self {
            loaders: Vec::new(),
            allow_key_overwrite,
        }
    }

    /// Append a child loader. Declaration order is merge order.
    pub fn with_loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loaders.push(Arc::new(loader));
        self
    }
}

#[async_trait]
impl Loader for MultiLoader {
    async fn load(&self) -> Result<ConfigMap> {
        // parallel fan-out; every child owns one position-indexed slot
        let handles: Vec<_> = self
            .loaders
            .iter()
            .map(|loader| {
                let loader = Arc::clone(loader);
                tokio::spawn(async move { loader.load().await })
            })
            .collect();
        let results: Vec<Result<ConfigMap>> = join_all(handles)
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|err| Err(Error::Other(format!("loader task failed: {err}"))))
            })
            .collect();

        let mut errors = Vec::new();
        let mut seen = HashSet::new();
        let mut results = results.into_iter();

        // with overwrite allowed, the first successful result can be adopted
        // as the merge base instead of copying it entry by entry — the
        // ownership guarantee makes the map ours to keep
        let mut merged = ConfigMap::new();
        if self.allow_key_overwrite {
            match results.next() {
                Some(Ok(map)) => merged = map,
                Some(Err(err)) => errors.push(err),
                None => {}
            }
        }

        for result in results {
            let map = match result {
                Ok(map) => map,
                Err(err) => {
                    errors.push(err);
                    continue;
                }
            };
            for (key, value) in map {
                if !self.allow_key_overwrite {
                    let shadow = key.to_lowercase();
                    if !seen.insert(shadow) {
                        errors.push(Error::KeyConflict(key));
                        continue;
                    }
                }
                merged.insert(key, value);
            }
        }

        if errors.is_empty() {
            Ok(merged)
        } else {
            Err(Error::multi(errors))
        }
    }
}
