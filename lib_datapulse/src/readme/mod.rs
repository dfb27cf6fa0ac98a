//! # Status Document Update
//!
//! - **`table`**: renders row records as markup table rows.
//! - **`rewriter`**: replaces section tables and timestamp tokens in place.
//! - **`sections`**: the concrete sections of the status document.
//!
//! [`update_readme`] ties them to the file store: it is the only stage whose
//! I/O failure ends the pipeline with an error.

pub mod rewriter;
pub mod sections;
pub mod table;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::configs::Settings;
use crate::error::{PipelineError, Result};
use crate::loggers::DiagnosticSink;
use crate::records::RowRecord;
use crate::sources::Source;
use crate::store::{Area, FileStore};

pub use rewriter::{RewriteReport, SectionRewriter};
pub use sections::{Limits, StatusData};

const STAGE: &str = "readme";

/// `2024-05-01 10:00:00 UTC`
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Latest processed rows for `source`, empty when none can be read.
fn load_latest_rows(
    store: &FileStore,
    source: Source,
    sink: &dyn DiagnosticSink,
) -> Vec<RowRecord> {
    let latest = match store.latest(Area::Processed, source.processed_tag(), "csv") {
        Ok(Some(path)) => path,
        Ok(None) => {
            sink.warn(STAGE, &format!("No processed {} data found", source.name()), None);
            return Vec::new();
        }
        Err(e) => {
            sink.warn(STAGE, &format!("Error looking up {} data: {e}", source.name()), None);
            return Vec::new();
        }
    };
    match store.load_rows(&latest) {
        Ok(rows) => rows,
        Err(e) => {
            sink.warn(STAGE, &format!("Error reading {}: {e}", latest.display()), None);
            Vec::new()
        }
    }
}

/// Loads the newest processed tables of every source.
pub fn load_status_data(store: &FileStore, sink: &dyn DiagnosticSink) -> StatusData {
    StatusData {
        github: load_latest_rows(store, Source::GitHub, sink),
        weather: load_latest_rows(store, Source::Weather, sink),
        crypto: load_latest_rows(store, Source::Crypto, sink),
    }
}

/// Rewrites the status document at `settings.readme_path` from the latest
/// processed captures.
///
/// The new text is computed in full before anything is written, and then
/// replaces the document through a rename, so a failure never leaves a
/// half-written file behind.
pub fn update_readme(
    store: &FileStore,
    settings: &Settings,
    sink: &dyn DiagnosticSink,
) -> Result<RewriteReport> {
    update_readme_at(store, settings, sink, Utc::now())
}

/// [`update_readme`] with an explicit clock.
pub fn update_readme_at(
    store: &FileStore,
    settings: &Settings,
    sink: &dyn DiagnosticSink,
    now: DateTime<Utc>,
) -> Result<RewriteReport> {
    sink.info(STAGE, "Updating README...", None);
    let path = &settings.readme_path;
    let document = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;

    let data = load_status_data(store, sink);
    let limits = Limits {
        table_rows: settings.table_rows,
        description_chars: settings.description_chars,
    };
    let update = sections::build_update(&data, limits, &format_timestamp(now));
    let rewrite = sections::status_rewriter()?.rewrite(&document, &update);

    for (id, reason) in &rewrite.report.skipped {
        sink.warn(
            STAGE,
            &format!("Section `{id}` left unchanged: {reason}"),
            Some(json!({ "section": id })),
        );
    }

    write_atomic(path, &rewrite.text)?;
    sink.info(
        STAGE,
        "README updated successfully",
        Some(json!({
            "path": path,
            "sections": rewrite.report.rewritten,
            "sentinels": rewrite.report.sentinels_updated,
        })),
    );
    Ok(rewrite.report)
}

/// Writes `text` to a sibling temporary file, then renames it over `path`.
pub fn write_atomic(path: &Path, text: &str) -> Result<()> {
    let tmp = temp_sibling(path);
    fs::write(&tmp, text).map_err(|e| PipelineError::io(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(PipelineError::io(path, e));
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}
