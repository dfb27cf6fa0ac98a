use std::fs;

use chrono::{Local, TimeZone};

use lib_datapulse::readme::sections::{github_layout, Limits};
use lib_datapulse::records::{RowRecord, Scalar};
use lib_datapulse::store::{Area, FileStore};

#[test]
fn latest_and_archive_follow_capture_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    store.ensure_directories().unwrap();

    let mut written = Vec::new();
    for minute in 0..3 {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap();
        let path = store.path_for(Area::Raw, "weather", "json", at);
        fs::write(&path, "{}").unwrap();
        written.push(path);
    }
    // Different tag in the same directory.
    fs::write(dir.path().join("raw").join("weather_backup.json"), "{}").unwrap();

    assert_eq!(store.list(Area::Raw, "weather", "json").unwrap(), written);
    assert_eq!(store.latest(Area::Raw, "weather", "json").unwrap().as_ref(), written.last());

    let moved = store.archive_stale(Area::Raw, "weather", "json", 1).unwrap();
    assert_eq!(moved.len(), 2);
    assert!(moved.iter().all(|p| p.starts_with(store.dir(Area::Archive))));
    assert_eq!(store.list(Area::Raw, "weather", "json").unwrap(), vec![written[2].clone()]);
    assert!(dir.path().join("raw").join("weather_backup.json").exists());
}

#[test]
fn rows_survive_the_processed_format() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    store.ensure_directories().unwrap();

    let rows = vec![
        RowRecord::new()
            .with("coin", "bitcoin")
            .with("price_usd", 64000.5_f64)
            .with("trend", "📈"),
        RowRecord::new()
            .with("coin", "say \"hi\", ok")
            .with("price_usd", 1_i64)
            .with("trend", "📉"),
    ];
    let path = store.save_rows(Area::Processed, "crypto_processed", &rows).unwrap();
    assert_eq!(store.load_rows(&path).unwrap(), rows);
}

#[test]
fn numeric_looking_text_is_not_reformatted() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    store.ensure_directories().unwrap();

    let rows = vec![
        RowRecord::new()
            .with("name", "octo/semver")
            .with("url", "https://github.com/octo/semver")
            .with("stars", 1200_i64)
            .with("language", "Rust")
            .with("description", "1.10")
            .with("updated_at", "0042"),
        RowRecord::new()
            .with("name", "octo/zip")
            .with("url", "https://github.com/octo/zip")
            .with("stars", 7_i64)
            .with("language", "Go")
            .with("description", "98101")
            .with("updated_at", "2024"),
    ];
    let path = store.save_rows(Area::Processed, "github_processed", &rows).unwrap();
    let back = store.load_rows(&path).unwrap();
    assert_eq!(back, rows);
    assert_eq!(back[0].get("stars"), Some(&Scalar::Int(1200)));

    let limits = Limits {
        table_rows: 5,
        description_chars: 100,
    };
    let table = github_layout(limits).format(&back);
    assert!(
        table.contains("| [octo/semver](https://github.com/octo/semver) | 1,200 | Rust | 1.10 |")
    );
}

#[test]
fn missing_store_has_no_latest() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("never-created"));
    assert!(store.latest(Area::Processed, "github_processed", "csv").unwrap().is_none());
}
