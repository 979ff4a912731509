//! Etcd v3 loader.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use etcd_client::{
    Client, ConnectOptions, EventType, GetOptions, KeyValue, TlsOptions, WatchOptions,
    WatchStream, Watcher,
};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{decode_remote_value, RemoteFormat};
use crate::error::{Error, Result};
use crate::loader::Loader;
use crate::value::ConfigMap;

/// Environment variable listing etcd endpoints, comma separated.
const ETCD_ENDPOINTS_ENV: &str = "ETCD_ENDPOINTS";

const DEFAULT_ENDPOINT: &str = "127.0.0.1:2379";

/// Loads configuration from etcd.
///
/// Two strategies are available:
///
/// - **single-shot** (the default): every load connects, issues one `Range`
///   request, decodes the result and drops the client. Right for loading
///   configuration once or rarely.
/// - **watch-backed** ([`with_watcher`](Self::with_watcher)): the first
///   load connects, seeds a live in-memory map and starts a background
///   task applying the server's watch events to it; every later load
///   returns a clone of the live map. Right for loading intensively, e.g.
///   behind a reloading [`Config`](crate::Config). Call
///   [`close`](Self::close) at shutdown to release the watch.
///
/// Decode failures seen by the watch task are buffered and surface as the
/// error of the next load; the buffer resets on read.
///
/// # Examples
///
/// ```rust,no_run
/// use conflux::remote::{EtcdLoader, RemoteFormat};
///
/// let loader = EtcdLoader::new("app/")
///     .with_prefix()
///     .with_value_format(RemoteFormat::Yaml)
///     .with_watcher();
/// ```
pub struct EtcdLoader {
    options: EtcdOptions,
    watch: Option<Arc<WatchState>>,
}

struct EtcdOptions {
    key: String,
    format: RemoteFormat,
    endpoints: Vec<String>,
    prefix: bool,
    auth: Option<(String, String)>,
    tls: Option<TlsOptions>,
    dial_timeout: Duration,
}

impl EtcdLoader {
    /// Create a single-shot loader for `key` with plain value format and
    /// the default endpoint (`127.0.0.1:2379`, overridable through the
    /// comma-separated `ETCD_ENDPOINTS`).
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            options: EtcdOptions {
                key: key.into(),
                format: RemoteFormat::Plain,
                endpoints: default_endpoints(),
                prefix: false,
                auth: None,
                tls: None,
                dial_timeout: Duration::from_secs(10),
            },
            watch: None,
        }
    }

    /// Override the etcd endpoints.
    pub fn with_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    /// Treat the key as a prefix: every key under it contributes to the
    /// result.
    pub fn with_prefix(mut self) -> Self {
        self.options.prefix = true;
        self
    }

    /// Authenticate with a username and password.
    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.options.auth = Some((username.into(), password.into()));
        self
    }

    /// Connect over TLS.
    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.options.tls = Some(tls);
        self
    }

    /// Interpret values as the given format instead of plain text.
    pub fn with_value_format(mut self, format: RemoteFormat) -> Self {
        self.options.format = format;
        self
    }

    /// Override the dial timeout (10 seconds by default).
    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.options.dial_timeout = timeout;
        self
    }

    /// Switch to the watch-backed strategy.
    pub fn with_watcher(mut self) -> Self {
        self.watch = Some(Arc::new(WatchState::default()));
        self
    }

    /// Cancel the watch and wait for the background task to exit.
    ///
    /// Only meaningful for watch-backed loaders; idempotent, and a no-op
    /// for single-shot ones.
    pub async fn close(&self) {
        let Some(state) = &self.watch else { return };
        let mut slot = state.task.lock().await;
        if let Some((mut watcher, handle)) = slot.task.take() {
            if let Err(err) = watcher.cancel().await {
                warn!(error = %err, "failed to cancel etcd watcher");
            }
            let _ = handle.await;
        }
    }
}

#[async_trait]
impl Loader for EtcdLoader {
    async fn load(&self) -> Result<ConfigMap> {
        match &self.watch {
            None => single_load(&self.options).await,
            Some(state) => watch_load(state, &self.options).await,
        }
    }
}

/// Connect, issue one Range, decode, drop the client.
async fn single_load(options: &EtcdOptions) -> Result<ConfigMap> {
    let mut client = connect(options).await?;
    let range_options = options.prefix.then(|| GetOptions::new().with_prefix());
    let response = client.get(options.key.clone(), range_options).await?;
    decode_kvs(response.kvs(), options.format)
}

async fn connect(options: &EtcdOptions) -> Result<Client> {
    debug!(endpoints = ?options.endpoints, "connecting to etcd");
    let mut connect = ConnectOptions::new().with_connect_timeout(options.dial_timeout);
    if let Some((username, password)) = &options.auth {
        connect = connect.with_user(username, password);
    }
    if let Some(tls) = &options.tls {
        connect = connect.with_tls(tls.clone());
    }
    Ok(Client::connect(&options.endpoints, Some(connect)).await?)
}

/// Merge a Range response's records, last-writer-wins across keys.
fn decode_kvs(kvs: &[KeyValue], format: RemoteFormat) -> Result<ConfigMap> {
    let mut merged = ConfigMap::new();
    for kv in kvs {
        let key = kv.key_str()?;
        merged.extend(decode_remote_value(key, kv.value(), format)?);
    }
    Ok(merged)
}

/// Live map + error buffer maintained by the watch task.
#[derive(Default)]
struct WatchState {
    live: RwLock<ConfigMap>,
    errors: Mutex<Vec<Error>>,
    task: tokio::sync::Mutex<WatchSlot>,
}

#[derive(Default)]
struct WatchSlot {
    started: bool,
    task: Option<(Watcher, JoinHandle<()>)>,
}

async fn watch_load(state: &Arc<WatchState>, options: &EtcdOptions) -> Result<ConfigMap> {
    {
        let mut slot = state.task.lock().await;
        if !slot.started {
            let mut client = connect(options).await?;

            let range_options = options.prefix.then(|| GetOptions::new().with_prefix());
            let response = client.get(options.key.clone(), range_options).await?;
            *state.live.write().unwrap() = decode_kvs(response.kvs(), options.format)?;

            let watch_options = options.prefix.then(|| WatchOptions::new().with_prefix());
            let (watcher, stream) = client.watch(options.key.clone(), watch_options).await?;
            let handle = tokio::spawn(consume_watch_events(
                Arc::clone(state),
                stream,
                options.format,
            ));

            slot.started = true;
            slot.task = Some((watcher, handle));
        }
    }

    let snapshot = state.live.read().unwrap().clone();
    let buffered = std::mem::take(&mut *state.errors.lock().unwrap());
    if buffered.is_empty() {
        Ok(snapshot)
    } else {
        Err(Error::multi(buffered))
    }
}

/// Apply the server's watch events to the live map, in delivery order.
async fn consume_watch_events(
    state: Arc<WatchState>,
    mut stream: WatchStream,
    format: RemoteFormat,
) {
    loop {
        let response = match stream.message().await {
            Ok(Some(response)) => response,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "etcd watch stream failed");
                state.errors.lock().unwrap().push(Error::Etcd(err));
                break;
            }
        };
        if response.canceled() {
            continue;
        }

        for event in response.events() {
            let Some(kv) = event.kv() else { continue };
            match event.event_type() {
                EventType::Delete => match kv.key_str() {
                    // for json/yaml formats the live map may not contain
                    // the key name itself; only that entry is dropped,
                    // previously merged entries stay (known limitation)
                    Ok(key) => {
                        state.live.write().unwrap().remove(key);
                    }
                    Err(err) => state.errors.lock().unwrap().push(Error::Etcd(err)),
                },
                EventType::Put => {
                    let decoded = kv
                        .key_str()
                        .map_err(Error::Etcd)
                        .and_then(|key| decode_remote_value(key, kv.value(), format));
                    match decoded {
                        Ok(map) => state.live.write().unwrap().extend(map),
                        Err(err) => state.errors.lock().unwrap().push(err),
                    }
                }
            }
        }
    }
    debug!("etcd watch task exited");
}

/// Default endpoints, honouring the comma-separated `ETCD_ENDPOINTS`.
fn default_endpoints() -> Vec<String> {
    match std::env::var(ETCD_ENDPOINTS_ENV) {
        Ok(endpoints) if !endpoints.is_empty() => endpoints
            .split(',')
            .map(|endpoint| endpoint.trim().to_owned())
            .collect(),
        _ => vec![DEFAULT_ENDPOINT.to_owned()],
    }
}
