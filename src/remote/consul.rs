//! Consul KV store loader.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::USER_AGENT;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::{decode_remote_value, RemoteFormat};
use crate::error::{Error, Result};
use crate::loader::Loader;
use crate::value::ConfigMap;

/// Header name carrying the Consul ACL token.
pub const CONSUL_TOKEN_HEADER: &str = "X-Consul-Token";

/// Environment variable overriding the Consul address (`host:port`), as in
/// the official client.
const CONSUL_HTTP_ADDR_ENV: &str = "CONSUL_HTTP_ADDR";
/// Environment variable selecting https when the address comes from env.
const CONSUL_HTTP_SSL_ENV: &str = "CONSUL_HTTP_SSL";

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8500";

/// Loads configuration from the Consul KV store.
///
/// Issues `GET {base}/v1/kv/{key}` and interprets each returned value
/// according to the configured [`RemoteFormat`]. In prefix mode every key
/// under the prefix contributes, merged last-writer-wins.
///
/// With [`with_cache`](Self::with_cache), responses are validated against
/// the server-assigned `ModifyIndex` of every key: when nothing changed,
/// the cached snapshot is served and base64/format decoding is skipped
/// entirely.
///
/// # Examples
///
/// ```rust,no_run
/// use conflux::remote::{ConsulLoader, RemoteFormat};
///
/// let loader = ConsulLoader::new("app/config")
///     .with_value_format(RemoteFormat::Json)
///     .with_auth_token("s3cr3t")
///     .with_cache();
/// ```
pub struct ConsulLoader {
    key: String,
    format: RemoteFormat,
    client: reqwest::Client,
    base_url: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    cache: Option<ConsulCache>,
}

impl ConsulLoader {
    /// Create a loader for `key` with plain value format and the default
    /// endpoint (`http://127.0.0.1:8500`, overridable through
    /// `CONSUL_HTTP_ADDR` / `CONSUL_HTTP_SSL`).
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            format: RemoteFormat::Plain,
            client: default_http_client(),
            base_url: default_base_url(),
            query: Vec::new(),
            headers: Vec::new(),
            cache: None,
        }
    }

    /// Override Consul's base URL, e.g. `http://consul.example.com:8500`.
    pub fn with_host(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use a custom HTTP client (timeouts, proxies, TLS settings).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Treat the key as a prefix: a recursive lookup returning every key
    /// under it.
    pub fn with_prefix(mut self) -> Self {
        self.query.push(("recurse".to_owned(), String::new()));
        self
    }

    /// Query a specific datacenter instead of the agent's own.
    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.query.push(("dc".to_owned(), datacenter.into()));
        self
    }

    /// Query a specific namespace (Consul Enterprise).
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.query.push(("ns".to_owned(), namespace.into()));
        self
    }

    /// Add a request header sent with every lookup.
    pub fn with_request_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Authenticate with a Consul ACL token.
    pub fn with_auth_token(self, token: impl Into<String>) -> Self {
        self.with_request_header(CONSUL_TOKEN_HEADER, token)
    }

    /// Interpret values as the given format instead of plain text.
    pub fn with_value_format(mut self, format: RemoteFormat) -> Self {
        self.format = format;
        self
    }

    /// Cache decoded snapshots keyed by per-key `ModifyIndex`.
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(ConsulCache::default());
        self
    }

    fn decode_pairs(&self, pairs: Vec<ConsulKvPair>) -> Result<ConfigMap> {
        if let Some(cache) = &self.cache {
            if let Some(snapshot) = cache.hit(&pairs) {
                debug!(key = %self.key, "consul modify indexes unchanged, serving cache");
                return Ok(snapshot);
            }
        }

        let mut merged = ConfigMap::new();
        let mut versions = HashMap::with_capacity(pairs.len());
        for pair in &pairs {
            let raw = BASE64.decode(pair.value.as_deref().unwrap_or_default())?;
            let map = decode_remote_value(&pair.key, &raw, self.format)?;
            // merging across keys is last-writer-wins
            merged.extend(map);
            versions.insert(pair.key.clone(), pair.modify_index);
        }

        if let Some(cache) = &self.cache {
            cache.store(&merged, versions);
        }

        Ok(merged)
    }
}

#[async_trait]
impl Loader for ConsulLoader {
    async fn load(&self) -> Result<ConfigMap> {
        let endpoint = format!("{}/v1/kv/{}", self.base_url, self.key);
        debug!(%endpoint, "loading configuration from consul");

        let mut request = self
            .client
            .get(&endpoint)
            .header(USER_AGENT, concat!("conflux/", env!("CARGO_PKG_VERSION")));
        if !self.query.is_empty() {
            request = request.query(&self.query);
        }
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::ConsulKeyNotFound);
        }
        let response = response.error_for_status()?;

        let body = response.bytes().await?;
        let pairs: Vec<ConsulKvPair> = serde_json::from_slice(&body)?;

        self.decode_pairs(pairs)
    }
}

/// One record of Consul's KV read response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConsulKvPair {
    key: String,
    /// Base64 encoded blob of data; null for directory entries.
    #[serde(default)]
    value: Option<String>,
    /// Server-assigned version counter, used as the cache validator.
    #[serde(default)]
    modify_index: u64,
}

/// Snapshot + per-key modify-index pair guarding it.
#[derive(Default)]
struct ConsulCache {
    inner: RwLock<Option<(ConfigMap, HashMap<String, u64>)>>,
}

impl ConsulCache {
    /// A hit requires the same set of keys and an equal modify-index for
    /// every returned key. The caller gets a private copy.
    fn hit(&self, pairs: &[ConsulKvPair]) -> Option<ConfigMap> {
        let guard = self.inner.read().unwrap();
        let (snapshot, versions) = guard.as_ref()?;
        if pairs.is_empty() || pairs.len() != versions.len() {
            return None;
        }
        for pair in pairs {
            if versions.get(&pair.key) != Some(&pair.modify_index) {
                return None;
            }
        }
        Some(snapshot.clone())
    }

    /// Store a private copy of the decoded snapshot.
    fn store(&self, snapshot: &ConfigMap, versions: HashMap<String, u64>) {
        *self.inner.write().unwrap() = Some((snapshot.clone(), versions));
    }
}

fn default_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(20))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Default base URL, honouring `CONSUL_HTTP_ADDR` / `CONSUL_HTTP_SSL` as
/// the official client does.
fn default_base_url() -> String {
    match std::env::var(CONSUL_HTTP_ADDR_ENV) {
        Ok(addr) if !addr.is_empty() => {
            let ssl = std::env::var(CONSUL_HTTP_SSL_ENV)
                .ok()
                .and_then(|flag| crate::coerce::to_bool(&crate::Value::String(flag)))
                .unwrap_or(false);
            let scheme = if ssl { "https" } else { "http" };
            format!("{scheme}://{addr}")
        }
        _ => DEFAULT_BASE_URL.to_owned(),
    }
}
