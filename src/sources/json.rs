//! JSON configuration source.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use super::input::{Input, ReadSeek};
use crate::error::Result;
use crate::loader::Loader;
use crate::value::{ConfigMap, Value};

/// Loads JSON configuration from a file or a rewindable byte stream.
///
/// The document root must be a JSON object. Numbers keep serde's natural
/// mapping: integers stay integers, everything else becomes a float.
///
/// # Examples
///
/// ```rust,no_run
/// use conflux::sources::JsonLoader;
///
/// let loader = JsonLoader::from_path("config/app.json");
/// ```
pub struct JsonLoader {
    input: Input,
}

impl JsonLoader {
    /// Load from a file on disk.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            input: Input::path(path),
        }
    }

    /// Load from a rewindable reader.
    ///
    /// The reader is seeked back to the start on every load, so the same
    /// loader instance can feed a reload loop.
    pub fn from_reader(reader: impl ReadSeek + 'static) -> Self {
        Self {
            input: Input::reader(reader),
        }
    }
}

#[async_trait]
impl Loader for JsonLoader {
    async fn load(&self) -> Result<ConfigMap> {
        let text = self.input.read_to_string()?;
        let root: HashMap<String, serde_json::Value> = serde_json::from_str(&text)?;
        Ok(root
            .into_iter()
            .map(|(key, value)| (key, Value::from(value)))
            .collect())
    }
}
