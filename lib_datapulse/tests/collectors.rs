mod common;

use serde_json::Value;

use common::{crypto_api, github_api, settings, weather_api, Canned};
use lib_datapulse::sources::crypto::collect_crypto;
use lib_datapulse::sources::github::collect_github;
use lib_datapulse::sources::weather::collect_weather;
use lib_datapulse::sources::{RawCapture, Source, WeatherRecord};
use lib_datapulse::store::{Area, FileStore};
use lib_datapulse::MemorySink;

fn store(root: &std::path::Path) -> FileStore {
    let store = FileStore::new(root.join("data"));
    store.ensure_directories().unwrap();
    store
}

#[tokio::test]
async fn github_capture_is_saved_with_its_source_label() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let store = store(dir.path());
    let sink = MemorySink::new();

    let repos = collect_github(&github_api(), &store, &settings, &sink).await;
    assert_eq!(repos.len(), 2);
    assert_eq!(repos[1].language, "N/A");

    let path = store.latest(Area::Raw, Source::GitHub.raw_tag(), "json").unwrap().unwrap();
    let capture: RawCapture<Value> = store.load_json(&path).unwrap();
    assert_eq!(capture.source, "GitHub API");
    assert_eq!(capture.data.len(), 2);
    assert_eq!(capture.data[0]["name"], "rust-lang/rust");
}

#[tokio::test]
async fn failing_city_is_skipped_but_capture_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let store = store(dir.path());
    let sink = MemorySink::new();

    let records = collect_weather(&weather_api(), &store, &settings, &sink).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].city, "Seattle");

    let warnings = sink.at_level("warn");
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("Atlantis"));

    let path = store.latest(Area::Raw, "weather", "json").unwrap().unwrap();
    let capture: RawCapture<WeatherRecord> = store.load_json(&path).unwrap();
    assert_eq!(capture.source, "wttr.in");
    assert_eq!(capture.data, records);
}

#[tokio::test]
async fn unreachable_source_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let store = store(dir.path());
    let sink = MemorySink::new();

    let coins = collect_crypto(&Canned::default(), &store, &settings, &sink).await;
    assert!(coins.is_empty());
    assert!(store.latest(Area::Raw, "crypto", "json").unwrap().is_none());

    let errors = sink.at_level("error");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].stage, "crypto");
}

#[tokio::test]
async fn coins_are_ordered_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let store = store(dir.path());

    let coins = collect_crypto(&crypto_api(), &store, &settings, &MemorySink::new()).await;
    let ids: Vec<_> = coins.iter().map(|c| c.coin.as_str()).collect();
    assert_eq!(ids, ["bitcoin", "solana"]);
}
