//! # Table Formatter
//!
//! Renders Row Records as the data rows of a pipe-delimited markup table.
//! The header and separator lines belong to the document and are never
//! produced here.
//!
//! Formatting cannot fail: a missing or mistyped field renders as
//! [`MISSING`], and an empty input renders one placeholder row so the
//! document always keeps a syntactically valid table.

use crate::records::{RowRecord, Scalar};

/// Rendered in place of a missing or unusable value.
pub const MISSING: &str = "N/A";
/// Notice shown in the first cell of an empty table.
pub const NO_DATA: &str = "*Data will be populated by automated pipeline*";
/// Appended to text cut by [`truncate_text`].
pub const ELLIPSIS: &str = "...";

/// How one column turns a [`Scalar`] into cell text.
#[derive(Debug, Clone, PartialEq)]
pub enum CellFormat {
    /// Free text, cut at `max_chars` characters when set.
    Text { max_chars: Option<usize> },
    /// Markdown link whose target is read from `url_field`.
    Link { url_field: String },
    /// Integer with thousands separators (`98,765`).
    Count,
    /// Fixed number of decimals (`10.0`).
    Decimal(usize),
    /// Rounded to a whole percent (`80%`).
    Percent,
    /// Dollar amount, two decimals with separators (`$64,012.50`).
    Currency,
    /// Signed percentage, two decimals (`+2.35%`).
    SignedPercent,
}

/// One rendered column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub field: String,
    pub format: CellFormat,
}

impl Column {
    pub fn new(field: &str, format: CellFormat) -> Self {
        Self {
            field: field.to_string(),
            format,
        }
    }

    pub fn text(field: &str) -> Self {
        Self::new(field, CellFormat::Text { max_chars: None })
    }
}

/// Columns plus display limits for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub columns: Vec<Column>,
    pub max_rows: usize,
}

impl TableLayout {
    pub fn new(columns: Vec<Column>, max_rows: usize) -> Self {
        Self { columns, max_rows }
    }

    /// Data rows for `rows`, newline separated, without a trailing newline.
    pub fn format(&self, rows: &[RowRecord]) -> String {
        if rows.is_empty() {
            return self.placeholder();
        }
        rows.iter()
            .take(self.max_rows)
            .map(|row| {
                let cells: Vec<String> = self.columns.iter().map(|c| render_cell(row, c)).collect();
                table_line(&cells)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The "no data yet" row: the notice, then one dash per remaining column.
    pub fn placeholder(&self) -> String {
        let mut cells = vec![NO_DATA.to_string()];
        cells.extend(std::iter::repeat("-".to_string()).take(self.columns.len().saturating_sub(1)));
        table_line(&cells)
    }
}

/// `| a | b | c |`
pub fn table_line(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

/// Number of cells in a `| a | b |` line.
pub fn cell_count(line: &str) -> usize {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    // Escaped pipes are cell content, not delimiters.
    inner.replace("\\|", "").split('|').count()
}

fn render_cell(row: &RowRecord, column: &Column) -> String {
    let value = row.get(&column.field).filter(|v| !v.is_null());
    let rendered = match (&column.format, value) {
        (_, None) => None,
        (CellFormat::Text { max_chars }, Some(v)) => v.as_text().map(|t| match max_chars {
            Some(limit) => truncate_text(&t, *limit),
            None => t,
        }),
        (CellFormat::Link { url_field }, Some(v)) => v.as_text().map(|label| {
            match row.get(url_field).and_then(Scalar::as_text) {
                Some(url) if !url.is_empty() => format!("[{label}]({url})"),
                _ => label,
            }
        }),
        (CellFormat::Count, Some(v)) => v.as_i64().map(group_thousands),
        (CellFormat::Decimal(places), Some(v)) => v.as_f64().map(|f| format!("{:.*}", *places, f)),
        (CellFormat::Percent, Some(v)) => v.as_f64().map(|f| format!("{f:.0}%")),
        (CellFormat::Currency, Some(v)) => v.as_f64().map(format_currency),
        (CellFormat::SignedPercent, Some(v)) => v.as_f64().map(|f| format!("{f:+.2}%")),
    };
    escape_cell(&rendered.unwrap_or_else(|| MISSING.to_string()))
}

/// Cuts `text` to `limit` characters and appends [`ELLIPSIS`], but only when
/// something was actually cut.
pub fn truncate_text(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], ELLIPSIS),
        None => text.to_string(),
    }
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as i64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${}.{:02}", group_thousands(cents / 100), cents % 100)
}

// Pipes would split the cell and newlines would end the row.
fn escape_cell(text: &str) -> String {
    text.replace(['\r', '\n'], " ").replace('|', "\\|")
}
