//! # conflux
//!
//! A runtime configuration registry for server-side applications: one
//! uniform lookup surface — a typed value by key, with optional defaults —
//! over a heterogeneous set of sources, composed through a small algebra of
//! loaders.
//!
//! ## Overview
//!
//! Everything producing configuration implements one contract,
//! [`Loader`]: process environment, dotenv / JSON / YAML / TOML / INI /
//! Java-properties files, parsed command-line flag sets, in-memory maps,
//! and the Consul and Etcd key-value stores. Decorators wrap any loader to
//! filter, rename, alias, transform, flatten, cache or error-suppress its
//! output, and [`MultiLoader`] fans out over many loaders concurrently and
//! merges their maps with deterministic precedence.
//!
//! On top sits [`Config`]: an atomic snapshot of the merged map with
//! lock-free reads, typed coercion on lookup, periodic reload and
//! change-notification for observers.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use conflux::decorators::FileCacheLoader;
//! use conflux::sources::{EnvLoader, JsonLoader};
//! use conflux::{Config, MultiLoader, Value};
//!
//! # async fn example() -> conflux::Result<()> {
//! let path = "config/app.json";
//! let loader = MultiLoader::new(true)
//!     .with_loader(FileCacheLoader::new(JsonLoader::from_path(path), path))
//!     .with_loader(EnvLoader::new());
//!
//! let config = Config::builder(loader)
//!     .with_reload_interval(Duration::from_secs(30))
//!     .build()
//!     .await?;
//!
//! let port = config.get_or("APP_PORT", Value::Int(8080));
//!
//! // at shutdown
//! config.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Ownership of loaded maps
//!
//! Every [`Loader::load`] call returns a map the caller fully owns;
//! mutating it never affects a later load, a cache, or another loader in a
//! composition. Stateful loaders (file cache, Consul cache, Etcd live map)
//! clone on store *and* on read to uphold this.
//!
//! ## Feature flags
//!
//! - `consul` *(default)* — the Consul KV loader, over HTTP.
//! - `etcd` *(default)* — the Etcd v3 loader, single-shot or watch-backed.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod coerce;
mod core;
pub mod decorators;
mod error;
mod loader;
mod multi;
pub mod remote;
pub mod sources;
mod value;

pub use crate::core::{Config, ConfigBuilder, NopConfig};
pub use error::{Error, ErrorKind, Result};
pub use loader::{Loader, LoaderFn};
pub use multi::MultiLoader;
pub use value::{ConfigMap, Value};

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::decorators::{
        AliasLoader, AlterValueLoader, FileCacheLoader, Filter, FilterKvLoader, FlattenLoader,
        IgnoreErrorLoader,
    };
    pub use crate::remote::RemoteFormat;
    #[cfg(feature = "consul")]
    pub use crate::remote::ConsulLoader;
    #[cfg(feature = "etcd")]
    pub use crate::remote::EtcdLoader;
    pub use crate::sources::{
        DotenvLoader, EnvLoader, FileLoader, FlagSetLoader, IniLoader, JsonLoader, PlainLoader,
        PropertiesLoader, TomlLoader, YamlLoader,
    };
    pub use crate::{
        Config, ConfigBuilder, ConfigMap, Error, ErrorKind, Loader, LoaderFn, MultiLoader,
        NopConfig, Result, Value,
    };
}
