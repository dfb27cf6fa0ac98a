//! # Processing
//!
//! Turns the latest raw capture of each source into a processed table and
//! writes `processed/summary.json` with per-source row counts.
//!
//! Nothing here fails the pipeline. A missing capture is a warning, a broken
//! one an error line; either way that source simply has no new table.

use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::configs::Settings;
use crate::error::{PipelineError, Result};
use crate::loggers::DiagnosticSink;
use crate::records::{RowRecord, ToRow};
use crate::sources::{now_iso, CryptoRecord, RawCapture, RepoRecord, Source, WeatherRecord};
use crate::store::{Area, FileStore};

const STAGE: &str = "process";
pub const SUMMARY_FILE: &str = "summary.json";

pub const TREND_UP: &str = "📈";
pub const TREND_DOWN: &str = "📉";

/// Contents of `processed/summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub generated_at: String,
    pub github_repos_analyzed: usize,
    pub weather_cities_tracked: usize,
    pub crypto_currencies_tracked: usize,
}

impl ProcessSummary {
    fn empty() -> Self {
        Self {
            generated_at: now_iso(),
            github_repos_analyzed: 0,
            weather_cities_tracked: 0,
            crypto_currencies_tracked: 0,
        }
    }
}

/// The newest raw capture of `source`, or `None` with a log line.
fn load_latest_capture<T: DeserializeOwned>(
    store: &FileStore,
    source: Source,
    sink: &dyn DiagnosticSink,
) -> Option<RawCapture<T>> {
    let path = match store.latest(Area::Raw, source.raw_tag(), "json") {
        Ok(Some(path)) => path,
        Ok(None) => {
            sink.warn(STAGE, &format!("No {} data file found", source.name()), None);
            return None;
        }
        Err(e) => {
            sink.error(STAGE, &format!("Error processing {} data: {e}", source.name()), None);
            return None;
        }
    };
    match store.load_json(&path) {
        Ok(capture) => Some(capture),
        Err(e) => {
            sink.error(STAGE, &format!("Error processing {} data: {e}", source.name()), None);
            None
        }
    }
}

fn save_processed(
    store: &FileStore,
    source: Source,
    rows: &[RowRecord],
    sink: &dyn DiagnosticSink,
) -> Option<PathBuf> {
    match store.save_rows(Area::Processed, source.processed_tag(), rows) {
        Ok(path) => {
            sink.info(
                STAGE,
                &format!("Processed {} data saved to {}", source.name(), path.display()),
                Some(json!({ "rows": rows.len(), "path": path })),
            );
            Some(path)
        }
        Err(e) => {
            sink.error(STAGE, &format!("Error saving processed {} data: {e}", source.name()), None);
            None
        }
    }
}

fn to_rows<T: ToRow>(records: &[T]) -> Vec<RowRecord> {
    records.iter().map(ToRow::to_row).collect()
}

/// Latest GitHub capture into `github_processed_<ts>.csv`.
pub fn process_github(store: &FileStore, sink: &dyn DiagnosticSink) -> Option<PathBuf> {
    sink.info(STAGE, "Processing GitHub data...", None);
    let capture: RawCapture<RepoRecord> = load_latest_capture(store, Source::GitHub, sink)?;
    save_processed(store, Source::GitHub, &to_rows(&capture.data), sink)
}

/// Latest weather capture into `weather_processed_<ts>.csv`; logs the mean
/// temperature.
pub fn process_weather(store: &FileStore, sink: &dyn DiagnosticSink) -> Option<PathBuf> {
    sink.info(STAGE, "Processing weather data...", None);
    let capture: RawCapture<WeatherRecord> = load_latest_capture(store, Source::Weather, sink)?;

    if let Some(avg) = average_temperature(&capture.data) {
        sink.info(
            STAGE,
            &format!("Average temperature: {avg:.1}°C"),
            Some(json!({ "cities": capture.data.len() })),
        );
    }
    save_processed(store, Source::Weather, &to_rows(&capture.data), sink)
}

pub fn average_temperature(records: &[WeatherRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    Some(records.iter().map(|r| r.temperature_c).sum::<f64>() / records.len() as f64)
}

/// `📈` for a positive 24h change, `📉` otherwise.
pub fn trend(change_24h: f64) -> &'static str {
    if change_24h > 0.0 {
        TREND_UP
    } else {
        TREND_DOWN
    }
}

/// Latest crypto capture into `crypto_processed_<ts>.csv` with a `trend` column.
pub fn process_crypto(store: &FileStore, sink: &dyn DiagnosticSink) -> Option<PathBuf> {
    sink.info(STAGE, "Processing crypto data...", None);
    let capture: RawCapture<CryptoRecord> = load_latest_capture(store, Source::Crypto, sink)?;

    let rows: Vec<RowRecord> = capture
        .data
        .iter()
        .map(|coin| coin.to_row().with("trend", trend(coin.change_24h)))
        .collect();
    save_processed(store, Source::Crypto, &rows, sink)
}

fn count_latest(store: &FileStore, source: Source) -> Result<usize> {
    match store.latest(Area::Processed, source.processed_tag(), "csv")? {
        Some(path) => Ok(store.load_rows(&path)?.len()),
        None => Ok(0),
    }
}

fn count_all(store: &FileStore, generated_at: &str) -> Result<ProcessSummary> {
    let summary = ProcessSummary {
        generated_at: generated_at.to_string(),
        github_repos_analyzed: count_latest(store, Source::GitHub)?,
        weather_cities_tracked: count_latest(store, Source::Weather)?,
        crypto_currencies_tracked: count_latest(store, Source::Crypto)?,
    };
    write_summary(store, &summary)?;
    Ok(summary)
}

/// Counts the rows of each source's newest processed table and writes
/// `processed/summary.json`.
///
/// A failure while counting is logged and the zeroed summary is returned.
pub fn generate_summary(store: &FileStore, sink: &dyn DiagnosticSink) -> ProcessSummary {
    sink.info(STAGE, "Generating summary statistics...", None);
    let empty = ProcessSummary::empty();

    match count_all(store, &empty.generated_at) {
        Ok(summary) => {
            sink.info(STAGE, "Summary generated successfully", None);
            summary
        }
        Err(e) => {
            sink.error(STAGE, &format!("Error generating summary: {e}"), None);
            empty
        }
    }
}

fn write_summary(store: &FileStore, summary: &ProcessSummary) -> Result<()> {
    let path = store.dir(Area::Processed).join(SUMMARY_FILE);
    let text = serde_json::to_string_pretty(summary).map_err(|e| PipelineError::json(&path, e))?;
    fs::write(&path, text).map_err(|e| PipelineError::io(&path, e))
}

/// Moves all but the newest `keep` raw and processed files of every source
/// into the archive directory.
pub fn archive_stale_captures(store: &FileStore, keep: usize, sink: &dyn DiagnosticSink) -> usize {
    let mut moved = 0;
    for source in Source::ALL {
        let targets = [
            (Area::Raw, source.raw_tag(), "json"),
            (Area::Processed, source.processed_tag(), "csv"),
        ];
        for (area, tag, ext) in targets {
            match store.archive_stale(area, tag, ext, keep) {
                Ok(paths) => moved += paths.len(),
                Err(e) => sink.error(STAGE, &format!("Error archiving {tag} files: {e}"), None),
            }
        }
    }
    if moved > 0 {
        sink.info(STAGE, &format!("Archived {moved} old files"), Some(json!({ "keep": keep })));
    }
    moved
}

/// Processes every source, writes the summary and archives if configured.
pub fn process_all(
    store: &FileStore,
    settings: &Settings,
    sink: &dyn DiagnosticSink,
) -> ProcessSummary {
    sink.info(STAGE, "Starting data processing pipeline", None);

    process_github(store, sink);
    process_weather(store, sink);
    process_crypto(store, sink);

    let summary = generate_summary(store, sink);

    if let Some(keep) = settings.archive_keep {
        archive_stale_captures(store, keep, sink);
    }

    sink.info(
        STAGE,
        "Data processing complete!",
        Some(json!({
            "github_repos": summary.github_repos_analyzed,
            "weather_cities": summary.weather_cities_tracked,
            "crypto_currencies": summary.crypto_currencies_tracked,
        })),
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loggers::MemorySink;

    #[test]
    fn trend_marks_only_gains_as_up() {
        assert_eq!(trend(0.01), TREND_UP);
        assert_eq!(trend(0.0), TREND_DOWN);
        assert_eq!(trend(-3.0), TREND_DOWN);
    }

    #[test]
    fn missing_raw_capture_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.ensure_directories().unwrap();
        let sink = MemorySink::new();

        assert!(process_github(&store, &sink).is_none());
        assert_eq!(sink.at_level("warn").len(), 1);
        assert!(sink.at_level("error").is_empty());
    }

    #[test]
    fn summary_without_tables_is_zeroed_and_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.ensure_directories().unwrap();
        let sink = MemorySink::new();

        let summary = generate_summary(&store, &sink);
        assert_eq!(summary.github_repos_analyzed, 0);
        let on_disk: ProcessSummary = store
            .load_json(&store.dir(Area::Processed).join(SUMMARY_FILE))
            .unwrap();
        assert_eq!(on_disk, summary);
    }
}
