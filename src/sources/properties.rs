//! Java-properties configuration source.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;

use async_trait::async_trait;

use super::input::{Input, ReadSeek};
use crate::error::Result;
use crate::loader::Loader;
use crate::value::{ConfigMap, Value};

/// Bound on chained `${ref}` expansions, so reference cycles terminate.
const MAX_EXPANSION_DEPTH: usize = 16;

/// Loads Java-properties configuration from a file, bytes or a rewindable
/// byte stream.
///
/// The result is a flat text map. `${name}` references are expanded against
/// sibling keys of the same document; unknown references are left verbatim.
pub struct PropertiesLoader {
    input: Input,
}

impl PropertiesLoader {
    /// Load from a file on disk.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            input: Input::path(path),
        }
    }

    /// Load from an in-memory properties document.
    pub fn from_bytes(content: impl Into<Vec<u8>>) -> Self {
        Self {
            input: Input::reader(Cursor::new(content.into())),
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
impl Loader for PropertiesLoader {
    async fn load(&self) -> Result<ConfigMap> {
        let text = self.input.read_to_string()?;
        let entries = java_properties::read(Cursor::new(text))?;

        Ok(entries
            .iter()
            .map(|(key, value)| {
                (
                    key.clone(),
                    Value::String(expand(value, &entries, MAX_EXPANSION_DEPTH)),
                )
            })
            .collect())
    }
}

/// Expand `${name}` references against the document's own keys.
fn expand(value: &str, entries: &HashMap<String, String>, depth: usize) -> String {
    if depth == 0 || !value.contains("${") {
        return value.to_owned();
    }

    let mut expanded = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        expanded.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match entries.get(name) {
                    Some(referenced) => {
                        expanded.push_str(&expand(referenced, entries, depth - 1));
                    }
                    // unknown reference stays verbatim
                    None => {
                        expanded.push_str("${");
                        expanded.push_str(name);
                        expanded.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                expanded.push_str("${");
                rest = after;
            }
        }
    }
    expanded.push_str(rest);
    expanded
}
