//! YAML configuration source.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use super::input::{Input, ReadSeek};
use crate::error::Result;
use crate::loader::Loader;
use crate::value::{ConfigMap, Value};

/// Loads YAML configuration from a file or a rewindable byte stream.
///
/// The document root must be a mapping with text keys. Nested mappings with
/// non-text keys are preserved as [`Value::KeyedMap`].
pub struct YamlLoader {
    input: Input,
}

impl YamlLoader {
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
impl Loader for YamlLoader {
    async fn load(&self) -> Result<ConfigMap> {
        let text = self.input.read_to_string()?;
        let root: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(&text)?;
        Ok(root
            .into_iter()
            .map(|(key, value)| (key, Value::from(value)))
            .collect())
    }
}
