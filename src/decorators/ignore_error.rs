//! Error-suppression decorator.

use async_trait::async_trait;

use crate::error::{ErrorKind, Result};
use crate::loader::Loader;
use crate::value::ConfigMap;

/// Decorates a loader to swallow selected error kinds.
///
/// If the wrapped loader fails and the error — or any error wrapped inside
/// an accumulated multi-error — matches one of the ignored kinds, the load
/// succeeds with an empty map. Other errors propagate.
///
/// Typical use: an optional configuration file, or a Consul key that may
/// not exist yet.
///
/// # Examples
///
/// ```rust,no_run
/// use conflux::decorators::IgnoreErrorLoader;
/// use conflux::sources::FileLoader;
/// use conflux::ErrorKind;
///
/// let loader = IgnoreErrorLoader::new(
///     FileLoader::new("/etc/app/optional.yaml"),
///     [ErrorKind::NotFound],
/// );
/// ```
pub struct IgnoreErrorLoader<L> {
    inner: L,
    ignored: Vec<ErrorKind>,
}

impl<L: Loader> IgnoreErrorLoader<L> {
    /// Wrap `inner`, ignoring the listed error kinds.
    pub fn new(inner: L, ignored: impl IntoIterator<Item = ErrorKind>) -> Self {
        Self {
            inner,
            ignored: ignored.into_iter().collect(),
        }
    }
}

#[async_trait]
impl<L: Loader> Loader for IgnoreErrorLoader<L> {
    async fn load(&self) -> Result<ConfigMap> {
        match self.inner.load().await {
            Err(err) if self.ignored.iter().any(|kind| err.has_kind(*kind)) => {
                Ok(ConfigMap::new())
            }
            result => result,
        }
    }
}
