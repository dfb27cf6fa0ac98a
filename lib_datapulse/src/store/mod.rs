//! # Timestamped File Store
//!
//! Captures live under `<root>/raw`, `<root>/processed` and `<root>/archive`
//! and are named `<tag>_<YYYYMMDD_HHMMSS>.<ext>`. The "latest" capture for a
//! tag is the matching file with the newest creation time (modification time
//! on filesystems that do not record creation), ties broken by file name.

/// Delimited text codec for processed captures.
pub mod csv;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use glob::glob;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::records::RowRecord;

const CSV_SEPARATOR: char = ',';

/// One of the three store directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    Raw,
    Processed,
    Archive,
}

impl Area {
    pub const ALL: [Area; 3] = [Area::Raw, Area::Processed, Area::Archive];

    pub fn dir_name(self) -> &'static str {
        match self {
            Area::Raw => "raw",
            Area::Processed => "processed",
            Area::Archive => "archive",
        }
    }
}

/// Handle on a store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, area: Area) -> PathBuf {
        self.root.join(area.dir_name())
    }

    /// Creates the three area directories if they are missing.
    pub fn ensure_directories(&self) -> Result<()> {
        for area in Area::ALL {
            let dir = self.dir(area);
            fs::create_dir_all(&dir).map_err(|e| PipelineError::io(&dir, e))?;
        }
        Ok(())
    }

    /// `<root>/<area>/<tag>_<YYYYMMDD_HHMMSS>.<ext>`
    pub fn path_for(&self, area: Area, tag: &str, ext: &str, at: DateTime<Local>) -> PathBuf {
        let timestamp = at.format("%Y%m%d_%H%M%S");
        self.dir(area).join(format!("{tag}_{timestamp}.{ext}"))
    }

    /// All files for `tag` in `area`, oldest first.
    pub fn list(&self, area: Area, tag: &str, ext: &str) -> Result<Vec<PathBuf>> {
        let dir = self.dir(area);
        let pattern = format!(
            "{}/{}_*.{}",
            glob::Pattern::escape(&dir.to_string_lossy()),
            glob::Pattern::escape(tag),
            ext
        );

        let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
        for entry in glob(&pattern)? {
            // Unreadable entries are skipped, same as a missing file.
            let Ok(path) = entry else { continue };
            if !is_capture_of(&path, tag) {
                continue;
            }
            let Ok(meta) = fs::metadata(&path) else { continue };
            let stamp = meta
                .created()
                .or_else(|_| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            files.push((stamp, path));
        }

        files.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.file_name().cmp(&b.1.file_name())));
        Ok(files.into_iter().map(|(_, p)| p).collect())
    }

    /// Newest capture for `tag`, if any.
    pub fn latest(&self, area: Area, tag: &str, ext: &str) -> Result<Option<PathBuf>> {
        Ok(self.list(area, tag, ext)?.pop())
    }

    /// Pretty-printed JSON to a fresh timestamped file.
    pub fn save_json<T: Serialize>(&self, area: Area, tag: &str, value: &T) -> Result<PathBuf> {
        let path = self.path_for(area, tag, "json", Local::now());
        let text = serde_json::to_string_pretty(value).map_err(|e| PipelineError::json(&path, e))?;
        fs::write(&path, text).map_err(|e| PipelineError::io(&path, e))?;
        Ok(path)
    }

    pub fn load_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| PipelineError::json(path, e))
    }

    /// Writes records as delimited text to a fresh timestamped file.
    pub fn save_rows(&self, area: Area, tag: &str, records: &[RowRecord]) -> Result<PathBuf> {
        let path = self.path_for(area, tag, "csv", Local::now());
        let mut buf = Vec::new();
        csv::write_records(&mut buf, records, CSV_SEPARATOR)
            .map_err(|e| PipelineError::io(&path, e))?;
        fs::write(&path, buf).map_err(|e| PipelineError::io(&path, e))?;
        Ok(path)
    }

    pub fn load_rows(&self, path: &Path) -> Result<Vec<RowRecord>> {
        let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        csv::parse_records(&text, CSV_SEPARATOR).map_err(|(line, reason)| PipelineError::Csv {
            path: path.to_path_buf(),
            line,
            reason,
        })
    }

    /// Keeps the newest `keep` captures for `tag` in `area` and moves the
    /// rest into the archive directory. Returns the archived paths.
    pub fn archive_stale(
        &self,
        area: Area,
        tag: &str,
        ext: &str,
        keep: usize,
    ) -> Result<Vec<PathBuf>> {
        if area == Area::Archive {
            return Ok(Vec::new());
        }
        let files = self.list(area, tag, ext)?;
        let stale = files.len().saturating_sub(keep);
        let archive_dir = self.dir(Area::Archive);
        fs::create_dir_all(&archive_dir).map_err(|e| PipelineError::io(&archive_dir, e))?;

        let mut moved = Vec::with_capacity(stale);
        for old in files.into_iter().take(stale) {
            let Some(name) = old.file_name() else { continue };
            let target = archive_dir.join(name);
            fs::rename(&old, &target).map_err(|e| PipelineError::io(&old, e))?;
            moved.push(target);
        }
        Ok(moved)
    }
}

/// `weather_*` also matches `weather_processed_*`; only accept names whose
/// remainder is exactly the timestamp.
fn is_capture_of(path: &Path, tag: &str) -> bool {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    let Some(rest) = stem.strip_prefix(tag).and_then(|r| r.strip_prefix('_')) else {
        return false;
    };
    let bytes = rest.as_bytes();
    bytes.len() == 15
        && bytes[8] == b'_'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 8 || b.is_ascii_digit())
}
