//! File modification-time caching decorator.

use std::path::PathBuf;
use std::sync::RwLock;
use std::time::SystemTime;

use async_trait::async_trait;
use tracing::trace;

use crate::error::Result;
use crate::loader::Loader;
use crate::value::ConfigMap;

/// Decorates a file loader to re-read the file only when it was modified.
///
/// On each load the file is stat'ed; if its modification time has not
/// advanced past the cached one, a clone of the cached snapshot is returned
/// without touching the wrapped loader. A stat failure is fatal. The cache
/// clones on store and on read, so callers own every returned map.
///
/// Worth it when configuration is loaded repeatedly, e.g. behind a
/// [`Config`](crate::Config) with reload enabled.
///
/// # Examples
///
/// ```rust,no_run
/// use conflux::decorators::FileCacheLoader;
/// use conflux::sources::JsonLoader;
///
/// let path = "config/app.json";
/// let loader = FileCacheLoader::new(JsonLoader::from_path(path), path);
/// ```
pub struct FileCacheLoader<L> {
    inner: L,
    path: PathBuf,
    cache: RwLock<Option<(ConfigMap, SystemTime)>>,
}

impl<L: Loader> FileCacheLoader<L> {
    /// Wrap `inner`, watching the same file it reads.
    pub fn new(inner: L, path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            path: path.into(),
            cache: RwLock::new(None),
        }
    }
}

#[async_trait]
impl<L: Loader> Loader for FileCacheLoader<L> {
    async fn load(&self) -> Result<ConfigMap> {
        let modified = std::fs::metadata(&self.path)?.modified()?;

        {
            let cache = self.cache.read().unwrap();
            if let Some((snapshot, cached_at)) = &*cache {
                if modified <= *cached_at {
                    trace!(path = %self.path.display(), "configuration file unchanged, serving cache");
                    return Ok(snapshot.clone());
                }
            }
        }

        let map = self.inner.load().await?;
        *self.cache.write().unwrap() = Some((map.clone(), modified));

        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoaderFn;
    use crate::value::Value;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn counting_loader(counter: Arc<AtomicUsize>) -> impl Loader {
        LoaderFn::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut map = ConfigMap::new();
            map.insert("foo".into(), Value::from("bar"));
            Ok(map)
        })
    }

    #[tokio::test]
    async fn unchanged_file_loads_the_inner_loader_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{}").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let loader = FileCacheLoader::new(counting_loader(Arc::clone(&calls)), &path);

        for _ in 0..5 {
            let map = loader.load().await.unwrap();
            assert_eq!(map["foo"], Value::from("bar"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn advancing_the_mtime_reloads_exactly_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{}").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let loader = FileCacheLoader::new(counting_loader(Arc::clone(&calls)), &path);

        loader.load().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // push the mtime clearly past the cached one
        let later = SystemTime::now() + std::time::Duration::from_secs(10);
        let file = fs::File::options().append(true).open(&path).unwrap();
        file.set_modified(later).unwrap();
        drop(file);

        loader.load().await.unwrap();
        loader.load().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cached_snapshots_are_owned_by_the_caller() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{}").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let loader = FileCacheLoader::new(counting_loader(calls), &path);

        let mut first = loader.load().await.unwrap();
        first.insert("foo".into(), Value::from("mutated"));

        let second = loader.load().await.unwrap();
        assert_eq!(second["foo"], Value::from("bar"));
    }

    #[tokio::test]
    async fn stat_failure_is_fatal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let loader =
            FileCacheLoader::new(counting_loader(Arc::clone(&calls)), "/no/such/file.json");

        assert!(loader.load().await.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
