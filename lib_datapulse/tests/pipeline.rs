mod common;

use std::fs;

use chrono::{TimeZone, Utc};

use common::{crypto_api, github_api, settings, weather_api, Canned, README_TEMPLATE};
use lib_datapulse::pipeline::run_pipeline;
use lib_datapulse::process::ProcessSummary;
use lib_datapulse::readme::rewriter::SkipReason;
use lib_datapulse::readme::update_readme_at;
use lib_datapulse::store::{Area, FileStore};
use lib_datapulse::{MemorySink, PipelineError};

#[tokio::test]
async fn full_run_fills_every_section() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    fs::write(&settings.readme_path, README_TEMPLATE).unwrap();
    let sink = MemorySink::new();

    let report = run_pipeline(&github_api(), &weather_api(), &crypto_api(), &settings, &sink)
        .await
        .unwrap();

    assert_eq!(report.collected.github, 2);
    assert_eq!(report.collected.weather, 1);
    assert_eq!(report.collected.crypto, 2);
    assert_eq!(report.processed.weather_cities_tracked, 1);
    assert_eq!(report.readme.rewritten, ["github", "weather", "crypto"]);
    assert!(report.readme.skipped.is_empty());
    assert_eq!(report.readme.sentinels_updated, 1);

    let text = fs::read_to_string(&settings.readme_path).unwrap();
    assert!(text.contains(
        "| [rust-lang/rust](https://github.com/rust-lang/rust) | 98,765 | Rust | Empowering everyone to build reliable and efficient software. |"
    ));
    assert!(text
        .contains("| [octo/empty](https://github.com/octo/empty) | 1,200 | N/A | No description |"));
    assert!(text.contains("| Cities Tracked | Seattle |\n| Average Temperature | 10.0°C (50.0°F) |"));
    assert!(text.contains("| bitcoin | $64,000.00 | $1,250,000,000,000.00 | +2.50% | 📈 |"));
    assert!(text.contains("| solana | $145.20 | $65,000,000,000.00 | -1.25% | 📉 |"));
    assert!(!text.contains("Last Updated: Never"));
    assert!(!text.contains("Last update: Never"));
    assert!(text.contains("\n## How It Works\n\nCollect, process, update.\n\n---\n"));

    let store = FileStore::new(&settings.data_dir);
    let summary: ProcessSummary = store
        .load_json(&store.dir(Area::Processed).join("summary.json"))
        .unwrap();
    assert_eq!(summary.github_repos_analyzed, 2);
    assert_eq!(summary.crypto_currencies_tracked, 2);
}

#[tokio::test]
async fn dead_upstreams_leave_placeholders() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    fs::write(&settings.readme_path, README_TEMPLATE).unwrap();
    let sink = MemorySink::new();

    let none = Canned::default();
    let report = run_pipeline(&none, &none, &none, &settings, &sink).await.unwrap();
    assert_eq!(report.readme.rewritten.len(), 3);

    let text = fs::read_to_string(&settings.readme_path).unwrap();
    let expected = README_TEMPLATE
        .lines()
        .filter(|l| !l.contains("Last Updated:") && !l.contains("Last update:"))
        .collect::<Vec<_>>();
    let actual = text
        .lines()
        .filter(|l| !l.contains("Last Updated:") && !l.contains("Last update:"))
        .collect::<Vec<_>>();
    assert_eq!(actual, expected);
    assert!(!sink.at_level("error").is_empty());
}

#[tokio::test]
async fn rerun_with_the_same_data_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    fs::write(&settings.readme_path, README_TEMPLATE).unwrap();
    let sink = MemorySink::new();
    run_pipeline(&github_api(), &weather_api(), &crypto_api(), &settings, &sink)
        .await
        .unwrap();

    let store = FileStore::new(&settings.data_dir);
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    update_readme_at(&store, &settings, &sink, at).unwrap();
    let once = fs::read_to_string(&settings.readme_path).unwrap();
    update_readme_at(&store, &settings, &sink, at).unwrap();
    let twice = fs::read_to_string(&settings.readme_path).unwrap();

    assert_eq!(once, twice);
    assert!(once
        .contains("### GitHub Trending Repositories (Last Updated: 2024-05-01 12:00:00 UTC)"));
    assert!(once.contains("Last update: 2024-05-01 12:00:00 UTC*"));
}

#[test]
fn missing_document_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let store = FileStore::new(&settings.data_dir);

    let err = update_readme_at(&store, &settings, &MemorySink::new(), Utc::now()).unwrap_err();
    assert!(matches!(err, PipelineError::Io { .. }));
}

#[test]
fn document_without_sections_is_left_alone_except_the_footer() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let store = FileStore::new(&settings.data_dir);
    let doc = "# Notes\n\nNothing generated here.\n";
    fs::write(&settings.readme_path, doc).unwrap();

    let report = update_readme_at(&store, &settings, &MemorySink::new(), Utc::now()).unwrap();
    assert!(report.rewritten.is_empty());
    assert!(report
        .skipped
        .iter()
        .all(|(_, reason)| *reason == SkipReason::HeadingNotFound));
    assert_eq!(fs::read_to_string(&settings.readme_path).unwrap(), doc);
}
