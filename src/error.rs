//! Error types for conflux.

use std::fmt::Write as _;

/// Result type alias for conflux operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or serving configuration.
///
/// Every failure in the crate is a returned [`Error`]; loaders never panic.
/// A load that fails returns no map — callers must not consume partial data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Underlying IO failure (file open, stat, read).
    ///
    /// A missing file keeps its `NotFound` identity and can be matched via
    /// [`Error::is_not_found`] or [`ErrorKind::NotFound`].
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding failed.
    #[error("json decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML decoding failed.
    #[error("yaml decode error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML decoding failed.
    #[error("toml decode error: {0}")]
    Toml(#[from] toml::de::Error),

    /// INI parsing failed.
    #[error("ini parse error: {0}")]
    Ini(#[from] ini::ParseError),

    /// Java-properties parsing failed.
    #[error("properties parse error: {0}")]
    Properties(#[from] java_properties::PropertiesError),

    /// Dotenv parsing failed.
    #[error("dotenv parse error: {0}")]
    Dotenv(#[from] dotenvy::Error),

    /// A remote value was not valid base64.
    #[error("base64 data error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// HTTP transport failure talking to Consul.
    #[cfg(feature = "consul")]
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Etcd RPC failure.
    #[cfg(feature = "etcd")]
    #[error("etcd error: {0}")]
    Etcd(#[from] etcd_client::Error),

    /// The requested Consul key does not exist (HTTP 404).
    #[cfg(feature = "consul")]
    #[error("404 - consul key not found")]
    ConsulKeyNotFound,

    /// A duplicate key was found while merging loaders without key
    /// overwrite allowed.
    #[error("key {0:?} already exists")]
    KeyConflict(String),

    /// The alias list given to an alias decorator has an odd number of
    /// elements.
    #[error("alias - missing key")]
    AliasPairBroken,

    /// A file path's extension does not match any supported format.
    #[error("unknown configuration file extension: {0:?}")]
    UnknownExtension(String),

    /// One or more errors accumulated from a composite operation
    /// (multi-loader merge, etcd watch buffer).
    #[error("{}", multi_message(.0))]
    Multi(Vec<Error>),

    /// Generic error for other cases.
    #[error("configuration error: {0}")]
    Other(String),
}

/// Coarse classification of an [`Error`], used for identity matching.
///
/// This is the crate's counterpart of comparing against sentinel errors:
/// decorators such as `IgnoreErrorLoader` match on kinds rather than on
/// error instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A file or remote key does not exist.
    NotFound,
    /// A format decoder rejected its input.
    Parse,
    /// Base64 decoding of a remote value failed.
    Base64,
    /// Network / RPC level failure.
    Transport,
    /// Duplicate key during a merge without overwrite.
    KeyConflict,
    /// Odd-length alias pair list.
    AliasPairBroken,
    /// Unsupported file extension.
    UnknownExtension,
    /// IO failure other than "not found".
    Io,
    /// A collection of accumulated errors.
    Multi,
    /// Anything else.
    Other,
}

impl Error {
    /// Build a [`Error::Multi`] from accumulated errors.
    pub(crate) fn multi(errors: Vec<Error>) -> Self {
        Error::Multi(errors)
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(err) if err.kind() == std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            Error::Io(_) => ErrorKind::Io,
            Error::Json(_)
            | Error::Yaml(_)
            | Error::Toml(_)
            | Error::Ini(_)
            | Error::Properties(_)
            | Error::Dotenv(_) => ErrorKind::Parse,
            Error::Base64(_) => ErrorKind::Base64,
            #[cfg(feature = "consul")]
            Error::Http(_) => ErrorKind::Transport,
            #[cfg(feature = "etcd")]
            Error::Etcd(_) => ErrorKind::Transport,
            #[cfg(feature = "consul")]
            Error::ConsulKeyNotFound => ErrorKind::NotFound,
            Error::KeyConflict(_) => ErrorKind::KeyConflict,
            Error::AliasPairBroken => ErrorKind::AliasPairBroken,
            Error::UnknownExtension(_) => ErrorKind::UnknownExtension,
            Error::Multi(_) => ErrorKind::Multi,
            Error::Other(_) => ErrorKind::Other,
        }
    }

    /// True if this error means "the thing you asked for does not exist"
    /// (missing file, Consul 404).
    pub fn is_not_found(&self) -> bool {
        self.has_kind(ErrorKind::NotFound)
    }

    /// The errors wrapped by a [`Error::Multi`], or an empty slice.
    pub fn sub_errors(&self) -> &[Error] {
        match self {
            Error::Multi(errors) => errors,
            _ => &[],
        }
    }

    /// True if this error, or any error wrapped inside a [`Error::Multi`],
    /// has the given kind.
    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        if self.kind() == kind {
            return true;
        }
        self.sub_errors().iter().any(|err| err.has_kind(kind))
    }
}

fn multi_message(errors: &[Error]) -> String {
    let mut message = format!("{} error(s) occurred:", errors.len());
    for err in errors {
        let _ = write!(message, " [{err}]");
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_is_classified_as_not_found() {
        let err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "nope"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.is_not_found());

        let err = Error::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no"));
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(!err.is_not_found());
    }

    #[test]
    fn multi_reports_every_wrapped_error() {
        let err = Error::multi(vec![
            Error::KeyConflict("foo".into()),
            Error::AliasPairBroken,
        ]);
        assert_eq!(err.kind(), ErrorKind::Multi);
        assert!(err.has_kind(ErrorKind::KeyConflict));
        assert!(err.has_kind(ErrorKind::AliasPairBroken));
        assert!(!err.has_kind(ErrorKind::Parse));

        let message = err.to_string();
        assert!(message.contains("2 error(s) occurred"));
        assert!(message.contains("key \"foo\" already exists"));
        assert!(message.contains("alias - missing key"));
    }

    #[cfg(feature = "consul")]
    #[test]
    fn consul_key_not_found_matches_not_found() {
        assert!(Error::ConsulKeyNotFound.is_not_found());
    }
}
