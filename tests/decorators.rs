//! Integration tests for decorator composition.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use conflux::decorators::{empty_value, exact_keys, key_with_prefix, to_string_list};
use conflux::prelude::*;
use tempfile::TempDir;

fn plain(entries: &[(&str, Value)]) -> PlainLoader {
    PlainLoader::new(
        entries
            .iter()
            .map(|(key, value)| ((*key).to_owned(), value.clone()))
            .collect(),
    )
}

#[tokio::test]
async fn filter_mixed_whitelists_and_blacklist() {
    let source = plain(&[
        ("FOO_1", Value::from("w1")),
        ("FOO_2", Value::from("w1")),
        ("FOO_3", Value::from("w2")),
        ("FOO_4", Value::from("w1")),
        ("FOO_5", Value::from("w1")),
    ]);

    let loader = FilterKvLoader::new(
        source,
        vec![
            Filter::whitelist(exact_keys(["FOO_1", "FOO_2"])),
            Filter::whitelist(|_key: &str, value: &Value| value.as_str() == Some("w2")),
            Filter::blacklist(exact_keys(["FOO_4"])),
        ],
    );

    let map = loader.load().await.unwrap();
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, vec!["FOO_1", "FOO_2", "FOO_3"]);
}

#[tokio::test]
async fn flatten_adds_leaf_shortcuts_and_keeps_nesting() {
    let mut mysql = ConfigMap::new();
    mysql.insert("host".into(), Value::from("H"));
    mysql.insert("port".into(), Value::from(3306i64));
    let mut db = ConfigMap::new();
    db.insert("mysql".into(), Value::Map(mysql));

    let loader = FlattenLoader::new(plain(&[
        ("db", Value::Map(db)),
        ("foo", Value::from("bar")),
    ]));

    let map = loader.load().await.unwrap();
    assert_eq!(map["db.mysql.host"], Value::from("H"));
    assert_eq!(map["db.mysql.port"], Value::from(3306i64));
    assert_eq!(map["foo"], Value::from("bar"));
    assert!(matches!(map["db"], Value::Map(_)));
}

#[tokio::test]
async fn decorators_stack_in_order() {
    // filter away noise, split a list, alias the result
    let source = plain(&[
        ("APP_SHOPPING", Value::from("bread,milk,eggs")),
        ("APP_EMPTY", Value::from("")),
        ("NOISE", Value::from("x")),
    ]);

    let filtered = FilterKvLoader::new(
        source,
        vec![
            Filter::whitelist(key_with_prefix("APP_")),
            Filter::blacklist(empty_value),
        ],
    );
    let altered = AlterValueLoader::new(filtered, to_string_list(","), ["APP_SHOPPING"]);
    let aliased = AliasLoader::new(altered, ["shopping", "APP_SHOPPING"]);

    let map = aliased.load().await.unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(
        map["shopping"],
        Value::StringArray(vec!["bread".into(), "milk".into(), "eggs".into()])
    );
    assert!(!map.contains_key("APP_EMPTY"));
    assert!(!map.contains_key("NOISE"));
}

#[tokio::test]
async fn file_cache_serves_snapshots_under_heavy_concurrency() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"a": "1", "b": "2"}"#).unwrap();

    let inner_loads = Arc::new(AtomicUsize::new(0));
    let counting = {
        let inner_loads = Arc::clone(&inner_loads);
        let path = path.clone();
        LoaderFn::new(move || {
            inner_loads.fetch_add(1, Ordering::SeqCst);
            let text = fs::read_to_string(&path)?;
            let root: std::collections::HashMap<String, serde_json::Value> =
                serde_json::from_str(&text)?;
            Ok(root
                .into_iter()
                .map(|(key, value)| (key, Value::from(value)))
                .collect())
        })
    };

    let loader = Arc::new(FileCacheLoader::new(counting, &path));

    // a writer keeps rewriting the file with consistent snapshots while
    // many readers load; every observed map must be one of the snapshots
    let writer_path = path.clone();
    let staging_path = dir.path().join("config.json.tmp");
    let writer = tokio::spawn(async move {
        for generation in 0..10u32 {
            // write-then-rename so readers never see a torn file
            let body = format!(r#"{{"a": "{generation}", "b": "{generation}"}}"#);
            fs::write(&staging_path, body).unwrap();
            fs::rename(&staging_path, &writer_path).unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
    });

    let mut readers = Vec::new();
    for _ in 0..100 {
        let loader = Arc::clone(&loader);
        readers.push(tokio::spawn(async move {
            for _ in 0..5 {
                let map = loader.load().await.unwrap();
                let a = map["a"].as_str().unwrap().to_owned();
                let b = map["b"].as_str().unwrap().to_owned();
                assert_eq!(a, b, "reader observed a torn snapshot");
            }
        }));
    }

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }

    // the cache must have spared most of the underlying loads
    assert!(inner_loads.load(Ordering::SeqCst) <= 500);
}

#[tokio::test]
async fn ignore_error_only_swallows_the_listed_kinds() {
    let not_found = IgnoreErrorLoader::new(
        FileLoader::new("/no/such/app.yaml"),
        [ErrorKind::NotFound],
    );
    assert!(not_found.load().await.unwrap().is_empty());

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "foo: [unclosed").unwrap();

    let parse_error = IgnoreErrorLoader::new(FileLoader::new(&path), [ErrorKind::NotFound]);
    let err = parse_error.load().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}
