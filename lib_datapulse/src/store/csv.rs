// Delimited text for processed captures.
use std::io::{self, Write};
use std::mem::take;

use crate::records::{RowRecord, Scalar};

/* ---------------- Parsing ---------------- */

/// Minimal CSV parser (quotes + CRLF tolerant).
///
/// Returns the rows together with the 1-based line each one started on, and
/// an error message if a quoted field is never closed.
pub fn parse_rows(text: &str, sep: char) -> Result<Vec<(usize, Vec<String>)>, (usize, String)> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_start = 1;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if matches!(chars.peek(), Some('"')) {
                    chars.next(); // double-quote escape
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            c if c == sep && !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push((row_start, take(&mut row)));
                } else {
                    row.clear();
                }
                line += 1;
                row_start = line;
            }
            '\n' => {
                line += 1;
                field.push(ch);
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err((row_start, "unterminated quoted field".to_string()));
    }

    row.push(field);
    if !(row.len() == 1 && row[0].is_empty()) {
        rows.push((row_start, row));
    }

    Ok(rows)
}

/// Parses a header row followed by data rows into [`RowRecord`]s.
///
/// Types are inferred per column: a column is read as numbers only when every
/// non-empty cell parses with [`Scalar::parse`] and prints back unchanged, so
/// `1.10` or `0042` stay text. Empty cells are `Null` in every column.
pub fn parse_records(text: &str, sep: char) -> Result<Vec<RowRecord>, (usize, String)> {
    let mut rows = parse_rows(text, sep)?.into_iter();
    let Some((_, header)) = rows.next() else {
        return Ok(Vec::new());
    };

    let mut body = Vec::new();
    for (line, cells) in rows {
        if cells.len() != header.len() {
            return Err((
                line,
                format!("expected {} fields, found {}", header.len(), cells.len()),
            ));
        }
        body.push(cells);
    }

    let numeric: Vec<bool> = (0..header.len())
        .map(|col| body.iter().all(|cells| is_lossless_number(&cells[col])))
        .collect();

    Ok(body
        .into_iter()
        .map(|cells| {
            let mut record = RowRecord::new();
            for ((name, cell), numeric) in header.iter().zip(cells).zip(&numeric) {
                let value = match (cell.is_empty(), numeric) {
                    (true, _) => Scalar::Null,
                    (false, true) => Scalar::parse(&cell),
                    (false, false) => Scalar::Text(cell),
                };
                record.set(name, value);
            }
            record
        })
        .collect())
}

fn is_lossless_number(cell: &str) -> bool {
    if cell.is_empty() {
        return true;
    }
    match Scalar::parse(cell) {
        Scalar::Text(_) => false,
        value => value.to_string() == cell,
    }
}

/* ---------------- Writing ---------------- */

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV row to any writer.
pub fn write_row<W: Write>(mut w: W, row: &[String], sep: char) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, "{}", sep)?;
        } else {
            first = false;
        }
        if needs_quotes(cell, sep) {
            let escaped = cell.replace('"', "\"\"");
            write!(w, "\"{}\"", escaped)?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// Writes a header taken from the first record, then one line per record.
///
/// Records missing a header field get an empty cell; extra fields are not
/// written.
pub fn write_records<W: Write>(mut w: W, records: &[RowRecord], sep: char) -> io::Result<()> {
    let Some(first) = records.first() else {
        return Ok(());
    };
    let header: Vec<String> = first.names().map(str::to_string).collect();
    write_row(&mut w, &header, sep)?;

    for record in records {
        let cells: Vec<String> = header
            .iter()
            .map(|name| record.get(name).map(Scalar::to_string).unwrap_or_default())
            .collect();
        write_row(&mut w, &cells, sep)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_fields_survive_a_write_and_read() {
        let records = vec![
            RowRecord::new()
                .with("name", "rust-lang/rust")
                .with("stars", 98_000_i64)
                .with("description", "Empowering everyone, \"reliably\"\nfast"),
            RowRecord::new()
                .with("name", "a,b")
                .with("stars", Option::<i64>::None)
                .with("description", ""),
        ];

        let mut buf = Vec::new();
        write_records(&mut buf, &records, ',').unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("name,stars,description\n"));
        assert!(text.contains("\"a,b\""));

        let back = parse_records(&text, ',').unwrap();
        assert_eq!(back, records.iter().map(|r| {
            let mut r = r.clone();
            if r.get("description") == Some(&Scalar::Text(String::new())) {
                r.set("description", Scalar::Null);
            }
            r
        }).collect::<Vec<_>>());
    }

    #[test]
    fn numeric_looking_text_keeps_its_spelling() {
        let text = "id,version,zip,score\n1,1.10,0042,2.5\n2,2.0,98101,\n";
        let back = parse_records(text, ',').unwrap();
        assert_eq!(back[0].get("id"), Some(&Scalar::Int(1)));
        assert_eq!(back[0].get("version"), Some(&Scalar::Text("1.10".into())));
        assert_eq!(back[0].get("zip"), Some(&Scalar::Text("0042".into())));
        assert_eq!(back[1].get("zip"), Some(&Scalar::Text("98101".into())));
        assert_eq!(back[0].get("score"), Some(&Scalar::Float(2.5)));
        assert_eq!(back[1].get("score"), Some(&Scalar::Null));
    }

    #[test]
    fn crlf_and_trailing_newline_are_tolerated() {
        let rows = parse_rows("a,b\r\n1,2\r\n", ',').unwrap();
        assert_eq!(rows, vec![
            (1, vec!["a".to_string(), "b".to_string()]),
            (2, vec!["1".to_string(), "2".to_string()]),
        ]);
    }

    #[test]
    fn ragged_rows_report_their_line() {
        let err = parse_records("a,b\n1,2\n3\n", ',').unwrap_err();
        assert_eq!(err.0, 3);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert!(parse_rows("a\n\"open", ',').is_err());
    }
}
