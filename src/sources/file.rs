//! Extension-dispatch file source.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{DotenvLoader, IniLoader, JsonLoader, PropertiesLoader, TomlLoader, YamlLoader};
use crate::error::{Error, Result};
use crate::loader::Loader;
use crate::value::ConfigMap;

/// Loads a configuration file, picking the format by file extension.
///
/// Useful when an application should not be tied to one configuration
/// format. Supported extensions: `.json`, `.yml`, `.yaml`, `.env`, `.ini`,
/// `.toml`, `.properties`. Anything else fails with
/// [`Error::UnknownExtension`].
///
/// # Examples
///
/// ```rust,no_run
/// use conflux::sources::FileLoader;
///
/// let loader = FileLoader::new("config/app.yaml");
/// ```
pub struct FileLoader {
    path: PathBuf,
}

impl FileLoader {
    /// Create a loader for the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Loader for FileLoader {
    async fn load(&self) -> Result<ConfigMap> {
        let extension = self
            .path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default();

        match extension {
            "json" => JsonLoader::from_path(&self.path).load().await,
            "yml" | "yaml" => YamlLoader::from_path(&self.path).load().await,
            "env" => DotenvLoader::from_path(&self.path).load().await,
            "ini" => IniLoader::from_path(&self.path).load().await,
            "toml" => TomlLoader::from_path(&self.path).load().await,
            "properties" => PropertiesLoader::from_path(&self.path).load().await,
            other => Err(Error::UnknownExtension(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use crate::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn dispatches_by_extension() {
        let dir = TempDir::new().unwrap();

        let json = dir.path().join("app.json");
        fs::write(&json, r#"{"source": "json"}"#).unwrap();
        let yaml = dir.path().join("app.yaml");
        fs::write(&yaml, "source: yaml\n").unwrap();
        let toml = dir.path().join("app.toml");
        fs::write(&toml, "source = \"toml\"\n").unwrap();

        for (path, expected) in [(json, "json"), (yaml, "yaml"), (toml, "toml")] {
            let map = FileLoader::new(&path).load().await.unwrap();
            assert_eq!(map["source"], Value::String(expected.into()));
        }
    }

    #[tokio::test]
    async fn unknown_extension_fails() {
        let err = FileLoader::new("config.txt").load().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownExtension);
        assert!(err.to_string().contains("unknown configuration file extension"));
    }

    #[tokio::test]
    async fn extensionless_path_fails() {
        let err = FileLoader::new("config").load().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownExtension);
    }
}
