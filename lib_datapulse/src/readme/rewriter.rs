//! # Section Rewriter
//!
//! Replaces the data rows (and optionally a timestamp annotation in the
//! heading) of named sections of a markup document, leaving every other byte
//! as it was.
//!
//! Each section is located by a literal heading prefix and then walked with a
//! small state machine over the document's lines:
//!
//! ```text
//! SeekingTable -> InSeparator -> InDataRows -> Done
//! ```
//!
//! Lines inside fenced code blocks (```` ``` ```` or `~~~`) are never taken
//! for headings or table headers.
//!
//! Anything unexpected (heading missing, table header missing, a heading of
//! the same or higher level before the table) leaves that section exactly as
//! found and is reported in the [`RewriteReport`]. The document is edited by
//! people too, so a partial match must never corrupt it.
//!
//! For a fixed update set the rewrite is idempotent: the region replaced on
//! the second pass is exactly the region written by the first.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{PipelineError, Result};

/// A `<open>value<close>` token inside a line whose value can be replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub open: String,
    pub close: String,
}

impl Annotation {
    pub fn new(open: &str, close: &str) -> Self {
        Self {
            open: open.to_string(),
            close: close.to_string(),
        }
    }

    /// Replaces the value between the first `open` and the next `close`.
    ///
    /// Returns `None` when the line carries no complete annotation.
    pub fn splice(&self, line: &str, value: &str) -> Option<String> {
        let start = line.find(&self.open)? + self.open.len();
        let end = start + line[start..].find(&self.close)?;
        let mut out = String::with_capacity(line.len() + value.len());
        out.push_str(&line[..start]);
        out.push_str(value);
        out.push_str(&line[end..]);
        Some(out)
    }
}

/// How to find one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSpec {
    /// Key used in [`DocumentUpdate::sections`].
    pub id: String,
    /// Literal prefix of the heading line, e.g. `### Weather Data Summary`.
    pub heading: String,
    /// Literal prefix of the table header line, e.g. `| Metric`.
    pub table_header: String,
    /// Timestamp token in the heading, if the section carries one.
    pub annotation: Option<Annotation>,
    level: usize,
}

impl SectionSpec {
    pub fn new(id: &str, heading: &str, table_header: &str) -> Self {
        Self {
            id: id.to_string(),
            heading: heading.to_string(),
            table_header: table_header.to_string(),
            annotation: None,
            // A marker that is not a heading is closed by any heading.
            level: heading_level(heading).unwrap_or(usize::MAX),
        }
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// A heading of equal or higher level ends this section.
    fn is_boundary(&self, line: &str) -> bool {
        heading_level(line).is_some_and(|lvl| lvl <= self.level)
    }
}

/// A free-text line located anywhere in the document by `marker`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinel {
    pub marker: String,
    pub annotation: Annotation,
}

impl Sentinel {
    pub fn new(marker: &str, annotation: Annotation) -> Self {
        Self {
            marker: marker.to_string(),
            annotation,
        }
    }
}

/// Replacement payload for one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionUpdate {
    /// Data rows, newline separated (see [`super::table::TableLayout::format`]).
    pub table: String,
    /// New heading annotation value; `None` leaves the heading untouched.
    pub timestamp: Option<String>,
}

/// Everything to change in one rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentUpdate {
    pub sections: BTreeMap<String, SectionUpdate>,
    /// New value for the sentinel line, if any.
    pub footer_timestamp: Option<String>,
}

/// Why a section was left unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No line starts with the section heading.
    HeadingNotFound,
    /// The document ended before the table header.
    TableHeaderNotFound,
    /// A heading of equal or higher level (1-based line) came before the table header.
    BoundaryBeforeTable { line: usize },
    /// The update names a section nobody registered.
    UnknownSection,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::HeadingNotFound => f.write_str("heading not found"),
            SkipReason::TableHeaderNotFound => f.write_str("table header not found"),
            SkipReason::BoundaryBeforeTable { line } => {
                write!(f, "next section at line {line} starts before the table")
            }
            SkipReason::UnknownSection => f.write_str("no such section registered"),
        }
    }
}

/// Outcome of [`SectionRewriter::rewrite`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Section ids rewritten, in document order.
    pub rewritten: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
    pub sentinels_updated: usize,
}

/// New text plus what happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    pub report: RewriteReport,
}

/// Registered sections and the optional footer sentinel.
#[derive(Debug, Clone, Default)]
pub struct SectionRewriter {
    sections: Vec<SectionSpec>,
    sentinel: Option<Sentinel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SeekingTable,
    InSeparator,
    InDataRows,
    Done,
}

/// Line indices of a located section.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    /// First line of the replaced region.
    data_start: usize,
    /// One past the last replaced line.
    data_end: usize,
}

impl SectionRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a section. Ids must be unique and no heading may be a prefix of
    /// another, otherwise one line could claim two sections.
    pub fn register(mut self, spec: SectionSpec) -> Result<Self> {
        for existing in &self.sections {
            if existing.id == spec.id
                || existing.heading.starts_with(&spec.heading)
                || spec.heading.starts_with(&existing.heading)
            {
                return Err(PipelineError::MarkerOverlap {
                    first: existing.heading.clone(),
                    second: spec.heading,
                });
            }
        }
        self.sections.push(spec);
        Ok(self)
    }

    pub fn with_sentinel(mut self, sentinel: Sentinel) -> Self {
        self.sentinel = Some(sentinel);
        self
    }

    pub fn sections(&self) -> &[SectionSpec] {
        &self.sections
    }

    /// Applies `update` to `document`. Never fails; see [`RewriteReport`].
    pub fn rewrite(&self, document: &str, update: &DocumentUpdate) -> Rewrite {
        let mut report = RewriteReport::default();

        for id in update.sections.keys() {
            if !self.sections.iter().any(|s| &s.id == id) {
                report.skipped.push((id.clone(), SkipReason::UnknownSection));
            }
        }

        // Registration order decides which section claims an ambiguous line.
        let mut pending: Vec<(&SectionSpec, &SectionUpdate)> = self
            .sections
            .iter()
            .filter_map(|s| update.sections.get(&s.id).map(|u| (s, u)))
            .collect();

        let lines: Vec<&str> = document.split_inclusive('\n').collect();
        let mut out = String::with_capacity(document.len() + 512);
        let mut i = 0;
        let mut in_fence = false;

        while i < lines.len() {
            let line = lines[i];
            let content = strip_eol(line);
            let claimed = if in_fence {
                None
            } else {
                pending.iter().position(|(s, _)| content.starts_with(&s.heading))
            };
            let Some(pos) = claimed else {
                if is_fence(content) {
                    in_fence = !in_fence;
                }
                out.push_str(line);
                i += 1;
                continue;
            };
            let (spec, section_update) = pending.remove(pos);

            match locate(&lines, i, spec) {
                Ok(bounds) => {
                    let eol = line_ending(line);
                    out.push_str(&rewrite_heading(line, spec, section_update));
                    for kept in &lines[i + 1..bounds.data_start] {
                        out.push_str(kept);
                    }
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push_str(eol);
                    }
                    for row in section_update.table.lines() {
                        out.push_str(row);
                        out.push_str(eol);
                    }
                    out.push_str(eol);
                    report.rewritten.push(spec.id.clone());
                    i = bounds.data_end;
                }
                Err(reason) => {
                    report.skipped.push((spec.id.clone(), reason));
                    out.push_str(line);
                    i += 1;
                }
            }
        }

        for (spec, _) in pending {
            report.skipped.push((spec.id.clone(), SkipReason::HeadingNotFound));
        }

        let text = match (&self.sentinel, &update.footer_timestamp) {
            (Some(sentinel), Some(stamp)) => {
                let (text, count) = splice_sentinel(&out, sentinel, stamp);
                report.sentinels_updated = count;
                text
            }
            _ => out,
        };

        Rewrite { text, report }
    }
}

/// Walks forward from the heading at `heading_idx` to the end of the data rows.
fn locate(lines: &[&str], heading_idx: usize, spec: &SectionSpec) -> Result<Bounds, SkipReason> {
    let mut state = State::SeekingTable;
    let mut j = heading_idx + 1;
    let mut data_start = j;
    let mut in_fence = false;

    loop {
        match state {
            State::SeekingTable => {
                let Some(line) = lines.get(j).map(|l| strip_eol(l)) else {
                    return Err(SkipReason::TableHeaderNotFound);
                };
                if is_fence(line) {
                    in_fence = !in_fence;
                } else if !in_fence {
                    if line.starts_with(&spec.table_header) {
                        state = State::InSeparator;
                    } else if spec.is_boundary(line) {
                        return Err(SkipReason::BoundaryBeforeTable { line: j + 1 });
                    }
                }
                j += 1;
            }
            State::InSeparator => {
                if lines.get(j).is_some_and(|l| is_separator(strip_eol(l))) {
                    j += 1;
                }
                data_start = j;
                state = State::InDataRows;
            }
            State::InDataRows => match lines.get(j).map(|l| strip_eol(l)) {
                Some(line)
                    if !spec.is_boundary(line)
                        && (line.trim().is_empty() || line.starts_with('|')) =>
                {
                    j += 1
                }
                _ => state = State::Done,
            },
            State::Done => {
                return Ok(Bounds {
                    data_start,
                    data_end: j,
                })
            }
        }
    }
}

fn rewrite_heading(line: &str, spec: &SectionSpec, update: &SectionUpdate) -> String {
    let (Some(annotation), Some(stamp)) = (&spec.annotation, &update.timestamp) else {
        return line.to_string();
    };
    let content = strip_eol(line);
    match annotation.splice(content, stamp) {
        Some(new_content) => format!("{new_content}{}", &line[content.len()..]),
        None => line.to_string(),
    }
}

fn splice_sentinel(text: &str, sentinel: &Sentinel, stamp: &str) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut count = 0;
    for line in text.split_inclusive('\n') {
        let content = strip_eol(line);
        match content
            .contains(&sentinel.marker)
            .then(|| sentinel.annotation.splice(content, stamp))
            .flatten()
        {
            Some(new_content) => {
                out.push_str(&new_content);
                out.push_str(&line[content.len()..]);
                count += 1;
            }
            None => out.push_str(line),
        }
    }
    (out, count)
}

/// `### Title` -> `Some(3)`. Needs at least one `#` followed by a space or
/// the end of the line.
pub fn heading_level(line: &str) -> Option<usize> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if hashes == 0 {
        return None;
    }
    match line.as_bytes().get(hashes) {
        None | Some(b' ') | Some(b'\t') => Some(hashes),
        _ => None,
    }
}

/// Opening or closing line of a fenced code block.
fn is_fence(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("```") || line.starts_with("~~~")
}

/// `|---|:--:|` style separator lines.
fn is_separator(line: &str) -> bool {
    let line = line.trim_end();
    line.starts_with('|')
        && line.contains('-')
        && line.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

fn strip_eol(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn line_ending(line: &str) -> &'static str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}
