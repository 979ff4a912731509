//! INI configuration source.

use std::path::PathBuf;

use async_trait::async_trait;
use ini::Ini;

use super::input::{Input, ReadSeek};
use crate::error::Result;
use crate::loader::Loader;
use crate::value::{ConfigMap, Value};

/// Loads INI configuration from a file or a rewindable byte stream.
///
/// Keys in the default section appear at the top level; keys under a named
/// section `[foo]` appear as a nested map under `"foo"`. The flat
/// `foo.bar` form can be obtained by wrapping this loader in a
/// [`FlattenLoader`](crate::decorators::FlattenLoader).
///
/// # Examples
///
/// Given:
///
/// ```ini
/// foo = bar
/// [time]
/// year = 2022
/// ```
///
/// the result is `{"foo": "bar", "time": {"year": "2022"}}`.
pub struct IniLoader {
    input: Input,
}

impl IniLoader {
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
impl Loader for IniLoader {
    async fn load(&self) -> Result<ConfigMap> {
        let text = self.input.read_to_string()?;
        let document = Ini::load_from_str(&text)?;

        let mut map = ConfigMap::new();
        for (section, properties) in document.iter() {
            match section {
                None => {
                    for (key, value) in properties.iter() {
                        map.insert(key.to_owned(), Value::String(value.to_owned()));
                    }
                }
                Some(section) => {
                    let entry = map
                        .entry(section.to_owned())
                        .or_insert_with(|| Value::Map(ConfigMap::new()));
                    if let Value::Map(nested) = entry {
                        for (key, value) in properties.iter() {
                            nested.insert(key.to_owned(), Value::String(value.to_owned()));
                        }
                    }
                }
            }
        }

        Ok(map)
    }
}
