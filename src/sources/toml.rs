//! TOML configuration source.

use std::path::PathBuf;

use async_trait::async_trait;

use super::input::{Input, ReadSeek};
use crate::error::Result;
use crate::loader::Loader;
use crate::value::{ConfigMap, Value};

/// Loads TOML configuration from a file or a rewindable byte stream.
///
/// TOML integers map to signed 64-bit integers; tables become nested maps.
pub struct TomlLoader {
    input: Input,
}

impl TomlLoader {
    /// Load from a file on disk.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            input: Input::path(path),
        }
    }

    /// Load from a rewindable reader, seeked to the start on every load.
    pub fn from_reader(reader: impl ReadSeek + 'static) -> Self {
        Self {
            input: Input::reader(reader),
        }
    }
}

#[async_trait]
impl Loader for TomlLoader {
    async fn load(&self) -> Result<ConfigMap> {
        let text = self.input.read_to_string()?;
        let root: toml::Table = toml::from_str(&text)?;
        Ok(root
            .into_iter()
            .map(|(key, value)| (key, Value::from(value)))
            .collect())
    }
}
