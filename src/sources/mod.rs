//! Source loaders: one loader per configuration origin.

mod dotenv;
mod env;
mod file;
mod flagset;
mod ini;
mod input;
mod json;
mod plain;
mod properties;
mod toml;
mod yaml;

pub use dotenv::DotenvLoader;
pub use env::EnvLoader;
pub use input::ReadSeek;
pub use file::FileLoader;
pub use flagset::FlagSetLoader;
pub use ini::IniLoader;
pub use json::JsonLoader;
pub use plain::PlainLoader;
pub use properties::PropertiesLoader;
pub use toml::TomlLoader;
pub use yaml::YamlLoader;
