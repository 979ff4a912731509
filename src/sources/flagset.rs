//! Command-line flag-set configuration source.

use async_trait::async_trait;
use clap::parser::ValueSource;
use clap::ArgMatches;

use crate::error::Result;
use crate::loader::Loader;
use crate::value::{ConfigMap, Value};

/// Reduces a parsed [`clap::ArgMatches`] to a configuration map.
///
/// Every flag becomes a text entry keyed by its argument id. By default all
/// defined flags are included (defaults too); [`explicitly_set_only`]
/// restricts the map to flags the user actually passed on the command line.
///
/// [`explicitly_set_only`]: FlagSetLoader::explicitly_set_only
///
/// # Examples
///
/// ```rust
/// use clap::{Arg, Command};
/// use conflux::sources::FlagSetLoader;
///
/// let matches = Command::new("app")
///     .arg(Arg::new("host").long("host").default_value("localhost"))
///     .get_matches_from(["app", "--host", "db.example.com"]);
///
/// let loader = FlagSetLoader::new(matches);
/// ```
pub struct FlagSetLoader {
    matches: ArgMatches,
    all: bool,
}

impl FlagSetLoader {
    /// Create a loader over a parsed flag set, including every defined flag.
    pub fn new(matches: ArgMatches) -> Self {
        Self { matches, all: true }
    }

    /// Only include flags that were explicitly set on the command line.
    pub fn explicitly_set_only(mut self) -> Self {
        self.all = false;
        self
    }
}

#[async_trait]
impl Loader for FlagSetLoader {
    async fn load(&self) -> Result<ConfigMap> {
        let mut map = ConfigMap::new();
        for id in self.matches.ids() {
            let name = id.as_str();
            // groups have no raw values and are skipped
            let Ok(raw) = self.matches.try_get_raw(name) else {
                continue;
            };
            if !self.all
                && self.matches.value_source(name) != Some(ValueSource::CommandLine)
            {
                continue;
            }
            let text = raw
                .and_then(|values| values.last())
                .map(|value| value.to_string_lossy().into_owned())
                // a present flag with no value reads as set
                .unwrap_or_else(|| "true".to_owned());
            map.insert(name.to_owned(), Value::String(text));
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, ArgAction, Command};

    fn command() -> Command {
        Command::new("app")
            .arg(Arg::new("host").long("host").default_value("localhost"))
            .arg(Arg::new("port").long("port").default_value("5432"))
            .arg(Arg::new("verbose").long("verbose").action(ArgAction::SetTrue))
    }

    #[tokio::test]
    async fn all_defined_flags_are_returned_by_default() {
        let matches = command().get_matches_from(["app", "--host", "db.example.com"]);
        let map = FlagSetLoader::new(matches).load().await.unwrap();

        assert_eq!(map["host"], Value::String("db.example.com".into()));
        assert_eq!(map["port"], Value::String("5432".into()));
    }

    #[tokio::test]
    async fn explicitly_set_only_skips_defaults() {
        let matches = command().get_matches_from(["app", "--host", "db.example.com"]);
        let map = FlagSetLoader::new(matches)
            .explicitly_set_only()
            .load()
            .await
            .unwrap();

        assert_eq!(map["host"], Value::String("db.example.com".into()));
        assert!(!map.contains_key("port"));
    }

    #[tokio::test]
    async fn repeated_loads_return_equal_maps() {
        let loader = FlagSetLoader::new(command().get_matches_from(["app"]));
        let first = loader.load().await.unwrap();
        let second = loader.load().await.unwrap();
        assert_eq!(first, second);
    }
}
