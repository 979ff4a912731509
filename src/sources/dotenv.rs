//! Dotenv (`KEY=VALUE`) configuration source.

use std::io::Cursor;
use std::path::PathBuf;

use async_trait::async_trait;

use super::input::{Input, ReadSeek};
use crate::error::Result;
use crate::loader::Loader;
use crate::value::{ConfigMap, Value};

/// Loads dotenv configuration from a file or a rewindable byte stream.
///
/// Standard dotenv semantics apply: `#` comments, quoting, empty lines.
/// Malformed lines fail the whole load with a parse error; a missing file
/// fails with a not-found error.
pub struct DotenvLoader {
    input: Input,
}

impl DotenvLoader {
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
impl Loader for DotenvLoader {
    async fn load(&self) -> Result<ConfigMap> {
        let text = self.input.read_to_string()?;
        let mut map = ConfigMap::new();
        for entry in dotenvy::from_read_iter(Cursor::new(text)) {
            let (key, value) = entry?;
            map.insert(key, Value::String(value));
        }
        Ok(map)
    }
}
