//! The loader contract.

use async_trait::async_trait;

use crate::error::Result;
use crate::value::ConfigMap;

/// A source of configuration key-value maps.
///
/// `load` is the single operation of the contract. Every call returns a map
/// the caller fully owns: mutating it — at any nesting depth — must never
/// affect a future call, any cached state inside the loader, or any other
/// loader in a composition. Stateless loaders get this for free by building
/// a fresh map; stateful ones (caches, live maps) clone on the way in and
/// on the way out.
///
/// On `Err`, no map is returned and nothing partial may be consumed.
///
/// Loads may block on file or network I/O. Dropping the returned future
/// cancels any in-flight request.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Load a configuration key-value map.
    async fn load(&self) -> Result<ConfigMap>;
}

#[async_trait]
impl<L: Loader + ?Sized> Loader for std::sync::Arc<L> {
    async fn load(&self) -> Result<ConfigMap> {
        (**self).load().await
    }
}

#[async_trait]
impl<L: Loader + ?Sized> Loader for Box<L> {
    async fn load(&self) -> Result<ConfigMap> {
        (**self).load().await
    }
}

/// Adapter lifting an ordinary closure into a [`Loader`].
///
/// Handy for tests and for small in-process sources:
///
/// ```rust
/// use conflux::{ConfigMap, LoaderFn, Value};
///
/// let loader = LoaderFn::new(|| {
///     let mut map = ConfigMap::new();
///     map.insert("foo".into(), Value::from("bar"));
///     Ok(map)
/// });
/// ```
pub struct LoaderFn<F> {
    f: F,
}

impl<F> LoaderFn<F>
where
    F: Fn() -> Result<ConfigMap> + Send + Sync,
{
    /// Wrap a closure as a loader.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> Loader for LoaderFn<F>
where
    F: Fn() -> Result<ConfigMap> + Send + Sync,
{
    async fn load(&self) -> Result<ConfigMap> {
        (self.f)()
    }
}
