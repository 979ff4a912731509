//! Remote key-value store loaders.

use std::collections::HashMap;

use crate::error::Result;
use crate::value::{ConfigMap, Value};

#[cfg(feature = "consul")]
mod consul;
#[cfg(feature = "etcd")]
mod etcd;

#[cfg(feature = "consul")]
pub use consul::ConsulLoader;
#[cfg(feature = "etcd")]
pub use etcd::EtcdLoader;

/// How the opaque byte value of a remote key is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoteFormat {
    /// The bytes are a JSON document merged into the result.
    Json,
    /// The bytes are a YAML document merged into the result.
    Yaml,
    /// The result holds a single entry: the key mapped to the trimmed text.
    #[default]
    Plain,
}

/// Decode one remote key's value into a configuration map per the format.
pub(crate) fn decode_remote_value(
    key: &str,
    value: &[u8],
    format: RemoteFormat,
) -> Result<ConfigMap> {
    match format {
        RemoteFormat::Json => {
            let root: HashMap<String, serde_json::Value> = serde_json::from_slice(value)?;
            Ok(root
                .into_iter()
                .map(|(key, value)| (key, Value::from(value)))
                .collect())
        }
        RemoteFormat::Yaml => {
            let root: HashMap<String, serde_yaml::Value> = serde_yaml::from_slice(value)?;
            Ok(root
                .into_iter()
                .map(|(key, value)| (key, Value::from(value)))
                .collect())
        }
        RemoteFormat::Plain => {
            let text = String::from_utf8_lossy(value).trim().to_owned();
            let mut map = ConfigMap::new();
            map.insert(key.to_owned(), Value::String(text));
            Ok(map)
        }
    }
}
