//! Process environment configuration source.

use async_trait::async_trait;

use crate::error::Result;
use crate::loader::Loader;
use crate::value::{ConfigMap, Value};

/// Loads configuration from the process environment.
///
/// Returns one text entry per environment variable. Variables whose name or
/// value is not valid UTF-8 are decoded lossily. This loader never fails.
///
/// # Examples
///
/// ```rust,no_run
/// use conflux::sources::EnvLoader;
/// # async fn example() -> conflux::Result<()> {
/// use conflux::Loader;
///
/// let map = EnvLoader::new().load().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvLoader;

impl EnvLoader {
    /// Create a new environment loader.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Loader for EnvLoader {
    async fn load(&self) -> Result<ConfigMap> {
        let mut map = ConfigMap::new();
        for (name, value) in std::env::vars_os() {
            map.insert(
                name.to_string_lossy().into_owned(),
                Value::String(value.to_string_lossy().into_owned()),
            );
        }
        Ok(map)
    }
}
