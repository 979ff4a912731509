//! The configuration handle.

use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::coerce;
use crate::error::{Error, Result};
use crate::loader::Loader;
use crate::value::{ConfigMap, Value};

/// Callback invoked with the keys that changed on a reload.
pub type ObserverFn = dyn Fn(&Config, &[String]) + Send + Sync;

type ReloadErrorHandler = dyn Fn(&Error) + Send + Sync;

/// The configuration handle: one atomic snapshot over a [`Loader`], with
/// typed lookups, optional periodic reload and change notification.
///
/// Reads are lock-free: the current snapshot lives in an `ArcSwap` and is
/// replaced atomically on reload, so a `get` either sees the whole old map
/// or the whole new one, never a partial merge. `Config` is a cheap
/// cloneable handle; clones share the same snapshot and observers.
///
/// When reload is enabled, call [`close`](Config::close) at application
/// shutdown to stop the background task. As a safety net the task also
/// stops on its own once every handle has been dropped, but don't rely on
/// that — close explicitly.
///
/// # Examples
///
/// ```rust,no_run
/// use std::time::Duration;
/// use conflux::sources::FileLoader;
/// use conflux::{Config, Value};
///
/// # async fn example() -> conflux::Result<()> {
/// let config = Config::builder(FileLoader::new("config/app.yaml"))
///     .with_reload_interval(Duration::from_secs(30))
///     .build()
///     .await?;
///
/// let port = config.get_or("port", Value::Int(5432));
/// # Ok(())
/// # }
/// ```
pub struct Config {
    shared: Arc<Shared>,
}

struct Shared {
    loader: Arc<dyn Loader>,
    snapshot: ArcSwap<ConfigMap>,
    observers: RwLock<Vec<Box<ObserverFn>>>,
    ignore_case: bool,
    reload_error_handler: Option<Box<ReloadErrorHandler>>,
    reload_task: Mutex<Option<ReloadTask>>,
}

struct ReloadTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Config {
    /// Start building a configuration over the given loader.
    pub fn builder(loader: impl Loader + 'static) -> ConfigBuilder {
        ConfigBuilder::new(loader)
    }

    /// Look up a key in the current snapshot.
    ///
    /// Returns `None` for absent keys. Never blocks on I/O.
    pub fn get(&self, key: &str) -> Option<Value> {
        let key = self.probe_key(key);
        self.shared.snapshot.load().get(key.as_ref()).cloned()
    }

    /// Look up a key, falling back to `default` when absent, and coercing
    /// the found value to the default's shape.
    ///
    /// The default doubles as a type witness: a `Value::Int` default casts
    /// a `"8080"` text into `Value::Int(8080)`. When the value cannot be
    /// coerced, the default is returned. Defaults of non-coercible shapes
    /// (maps, untyped arrays, null) return the raw value unmodified.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        match self.get(key) {
            None => default,
            Some(value) => coerce::coerce_like(&value, &default).unwrap_or(default),
        }
    }

    /// Register an observer notified with the set of changed keys after
    /// every reload that alters the snapshot.
    ///
    /// Observers are invoked synchronously, in registration order, with
    /// this `Config` as context. Registration is append-only.
    pub fn register_observer(
        &self,
        observer: impl Fn(&Config, &[String]) + Send + Sync + 'static,
    ) {
        self.shared
            .observers
            .write()
            .unwrap()
            .push(Box::new(observer));
    }

    /// Reload the snapshot from the loader now.
    ///
    /// On success the snapshot is replaced atomically and observers are
    /// notified with the diff. On failure the previous snapshot stays
    /// authoritative and the error is returned.
    pub async fn reload(&self) -> Result<()> {
        let mut map = self.shared.loader.load().await?;
        if self.shared.ignore_case {
            uppercase_keys(&mut map);
        }

        let new = Arc::new(map);
        let old = self.shared.snapshot.swap(Arc::clone(&new));

        let changed = changed_keys(&old, &new);
        if !changed.is_empty() {
            debug!(changed = changed.len(), "configuration reloaded with changes");
            let observers = self.shared.observers.read().unwrap();
            for observer in observers.iter() {
                observer(self, &changed);
            }
        }

        Ok(())
    }

    /// Stop the periodic reload task and wait for it to exit.
    ///
    /// Idempotent; a no-op when reload was never enabled.
    pub async fn close(&self) {
        let task = self.shared.reload_task.lock().unwrap().take();
        if let Some(task) = task {
            let _ = task.shutdown.send(true);
            let _ = task.handle.await;
        }
    }

    fn probe_key<'k>(&self, key: &'k str) -> std::borrow::Cow<'k, str> {
        if self.shared.ignore_case {
            std::borrow::Cow::Owned(key.to_uppercase())
        } else {
            std::borrow::Cow::Borrowed(key)
        }
    }
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        // last handle gone; the reload task cannot be awaited here, so
        // abort it as the finalizer safety net
        if let Ok(mut slot) = self.reload_task.lock() {
            if let Some(task) = slot.take() {
                task.handle.abort();
            }
        }
    }
}

/// Builder for [`Config`].
pub struct ConfigBuilder {
    loader: Arc<dyn Loader>,
    reload_interval: Option<Duration>,
    ignore_case: bool,
    reload_error_handler: Option<Box<ReloadErrorHandler>>,
}

impl ConfigBuilder {
    /// Create a builder over the given loader.
    pub fn new(loader: impl Loader + 'static) -> Self {
        Self {
            loader: Arc::new(loader),
            reload_interval: None,
            ignore_case: false,
            reload_error_handler: None,
        }
    }

    /// Reload the configuration periodically at the given interval.
    ///
    /// A zero interval leaves reload disabled (the default).
    pub fn with_reload_interval(mut self, interval: Duration) -> Self {
        self.reload_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Ignore key case: keys are uppercased on store and probes are
    /// uppercased on lookup, so `get("foo")`, `get("FOO")` and
    /// `get("foO")` all return the same value.
    pub fn with_ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Handle errors from periodic reloads (log them, count them, ...).
    ///
    /// Without a handler, reload errors leave the previous snapshot in
    /// place silently.
    pub fn with_reload_error_handler(
        mut self,
        handler: impl Fn(&Error) + Send + Sync + 'static,
    ) -> Self {
        self.reload_error_handler = Some(Box::new(handler));
        self
    }

    /// Perform the initial load and start the reload task if an interval
    /// was set.
    ///
    /// A failing initial load fails construction.
    pub async fn build(self) -> Result<Config> {
        let mut map = self.loader.load().await?;
        if self.ignore_case {
            uppercase_keys(&mut map);
        }

        let shared = Arc::new(Shared {
            loader: self.loader,
            snapshot: ArcSwap::from_pointee(map),
            observers: RwLock::new(Vec::new()),
            ignore_case: self.ignore_case,
            reload_error_handler: self.reload_error_handler,
            reload_task: Mutex::new(None),
        });

        if let Some(interval) = self.reload_interval {
            let (shutdown, shutdown_rx) = watch::channel(false);
            let handle = tokio::spawn(reload_loop(Arc::downgrade(&shared), interval, shutdown_rx));
            *shared.reload_task.lock().unwrap() = Some(ReloadTask { shutdown, handle });
        }

        Ok(Config { shared })
    }
}

/// The periodic reload task.
///
/// Holds only a weak reference so that dropping the last handle stops the
/// loop even without an explicit close.
async fn reload_loop(
    shared: Weak<Shared>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let start = tokio::time::Instant::now() + interval;
    let mut ticker = tokio::time::interval_at(start, interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                let Some(shared) = shared.upgrade() else { break };
                let config = Config { shared };
                if let Err(err) = config.reload().await {
                    warn!(error = %err, "configuration reload failed, keeping previous snapshot");
                    if let Some(handler) = &config.shared.reload_error_handler {
                        handler(&err);
                    }
                }
            }
        }
    }
}

/// The changed-keys set between two snapshots: keys whose value differs,
/// plus keys only one side has.
fn changed_keys(old: &ConfigMap, new: &ConfigMap) -> Vec<String> {
    let mut changed = Vec::new();
    for (key, old_value) in old {
        if new.get(key) != Some(old_value) {
            changed.push(key.clone());
        }
    }
    for key in new.keys() {
        if !old.contains_key(key) {
            changed.push(key.clone());
        }
    }
    changed
}

/// Uppercase all first-level keys in place.
fn uppercase_keys(map: &mut ConfigMap) {
    let entries: Vec<(String, Value)> = map.drain().collect();
    for (key, value) in entries {
        // duplicate keys after uppercasing overwrite each other
        map.insert(key.to_uppercase(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoaderFn;
    use crate::sources::PlainLoader;

    fn plain(entries: &[(&str, Value)]) -> PlainLoader {
        PlainLoader::new(
            entries
                .iter()
                .map(|(key, value)| ((*key).to_owned(), value.clone()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn get_returns_none_for_absent_keys() {
        let config = Config::builder(plain(&[("foo", Value::from("bar"))]))
            .build()
            .await
            .unwrap();

        assert_eq!(config.get("foo"), Some(Value::from("bar")));
        assert_eq!(config.get("missing"), None);
    }

    #[tokio::test]
    async fn get_or_falls_back_and_coerces() {
        let config = Config::builder(plain(&[
            ("port", Value::from("8080")),
            ("debug", Value::from("true")),
            ("broken", Value::from("not a number")),
        ]))
        .build()
        .await
        .unwrap();

        assert_eq!(config.get_or("port", Value::Int(1)), Value::Int(8080));
        assert_eq!(config.get_or("debug", Value::Bool(false)), Value::Bool(true));
        // absent key: default
        assert_eq!(config.get_or("missing", Value::Int(42)), Value::Int(42));
        // coercion failure: default
        assert_eq!(config.get_or("broken", Value::Int(42)), Value::Int(42));
    }

    #[tokio::test]
    async fn ignore_case_normalises_probes_and_storage() {
        let config = Config::builder(plain(&[("Foo", Value::from("bar"))]))
            .with_ignore_case()
            .build()
            .await
            .unwrap();

        for probe in ["foo", "FOO", "foO"] {
            assert_eq!(config.get(probe), Some(Value::from("bar")), "probe {probe}");
        }
    }

    #[tokio::test]
    async fn initial_load_failure_fails_construction() {
        let result = Config::builder(LoaderFn::new(|| {
            Err(Error::Other("intentionally triggered".into()))
        }))
        .build()
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn manual_reload_replaces_the_snapshot() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let generation = Arc::new(AtomicUsize::new(0));
        let loader_generation = Arc::clone(&generation);

        let config = Config::builder(LoaderFn::new(move || {
            let mut map = ConfigMap::new();
            map.insert(
                "generation".into(),
                Value::Int(loader_generation.fetch_add(1, Ordering::SeqCst) as i64),
            );
            Ok(map)
        }))
        .build()
        .await
        .unwrap();

        assert_eq!(config.get("generation"), Some(Value::Int(0)));
        config.reload().await.unwrap();
        assert_eq!(config.get("generation"), Some(Value::Int(1)));
    }

    #[tokio::test]
    async fn observers_receive_the_changed_keys() {
        use std::sync::Mutex as StdMutex;

        let state = Arc::new(StdMutex::new(ConfigMap::new()));
        {
            let mut initial = state.lock().unwrap();
            initial.insert("key1".into(), Value::from("old"));
            initial.insert("key2".into(), Value::from("goes away"));
        }

        let loader_state = Arc::clone(&state);
        let config = Config::builder(LoaderFn::new(move || Ok(loader_state.lock().unwrap().clone())))
            .build()
            .await
            .unwrap();

        let seen: Arc<StdMutex<Vec<Vec<String>>>> = Arc::new(StdMutex::new(Vec::new()));
        let observer_seen = Arc::clone(&seen);
        config.register_observer(move |_config, changed| {
            observer_seen.lock().unwrap().push(changed.to_vec());
        });

        {
            let mut next = state.lock().unwrap();
            next.insert("key1".into(), Value::from("new"));
            next.remove("key2");
            next.insert("key3".into(), Value::from("added"));
        }
        config.reload().await.unwrap();

        let calls = seen.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let mut changed = calls[0].clone();
        changed.sort();
        assert_eq!(changed, vec!["key1", "key2", "key3"]);
    }

    #[tokio::test]
    async fn unchanged_reload_does_not_notify() {
        let config = Config::builder(plain(&[("foo", Value::from("bar"))]))
            .build()
            .await
            .unwrap();

        let notified = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let observer_notified = Arc::clone(&notified);
        config.register_observer(move |_, _| {
            observer_notified.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        config.reload().await.unwrap();
        assert_eq!(notified.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_reload_picks_up_source_changes() {
        use std::sync::atomic::{AtomicI64, Ordering};

        let current = Arc::new(AtomicI64::new(1));
        let loader_current = Arc::clone(&current);
        let config = Config::builder(LoaderFn::new(move || {
            let mut map = ConfigMap::new();
            map.insert("value".into(), Value::Int(loader_current.load(Ordering::SeqCst)));
            Ok(map)
        }))
        .with_reload_interval(Duration::from_secs(5))
        .build()
        .await
        .unwrap();

        assert_eq!(config.get("value"), Some(Value::Int(1)));

        current.store(2, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(config.get("value"), Some(Value::Int(2)));
        config.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn close_stops_the_reload_task() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let loads = Arc::new(AtomicUsize::new(0));
        let loader_loads = Arc::clone(&loads);
        let config = Config::builder(LoaderFn::new(move || {
            loader_loads.fetch_add(1, Ordering::SeqCst);
            Ok(ConfigMap::new())
        }))
        .with_reload_interval(Duration::from_secs(1))
        .build()
        .await
        .unwrap();

        config.close().await;
        // double close is fine
        config.close().await;

        let after_close = loads.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(loads.load(Ordering::SeqCst), after_close);
    }

    #[tokio::test(start_paused = true)]
    async fn reload_errors_keep_the_old_snapshot_and_reach_the_handler() {
        use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

        let fail = Arc::new(AtomicBool::new(false));
        let loader_fail = Arc::clone(&fail);
        let handled = Arc::new(AtomicUsize::new(0));
        let handler_handled = Arc::clone(&handled);

        let config = Config::builder(LoaderFn::new(move || {
            if loader_fail.load(Ordering::SeqCst) {
                Err(Error::Other("intentionally triggered".into()))
            } else {
                let mut map = ConfigMap::new();
                map.insert("foo".into(), Value::from("bar"));
                Ok(map)
            }
        }))
        .with_reload_interval(Duration::from_secs(1))
        .with_reload_error_handler(move |_err| {
            handler_handled.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .await
        .unwrap();

        fail.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(handled.load(Ordering::SeqCst) >= 1);
        assert_eq!(config.get("foo"), Some(Value::from("bar")));
        config.close().await;
    }

    #[test]
    fn changed_keys_covers_updates_additions_and_removals() {
        let mut old = ConfigMap::new();
        old.insert("same".into(), Value::from("x"));
        old.insert("updated".into(), Value::from("before"));
        old.insert("removed".into(), Value::from("gone"));

        let mut new = ConfigMap::new();
        new.insert("same".into(), Value::from("x"));
        new.insert("updated".into(), Value::from("after"));
        new.insert("added".into(), Value::from("fresh"));

        let mut changed = changed_keys(&old, &new);
        changed.sort();
        assert_eq!(changed, vec!["added", "removed", "updated"]);
    }
}
