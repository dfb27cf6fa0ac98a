//! The sections of the status document and how each one is rendered.

use crate::error::Result;
use crate::records::RowRecord;

use super::rewriter::{
    Annotation, DocumentUpdate, SectionRewriter, SectionSpec, SectionUpdate, Sentinel,
};
use super::table::{CellFormat, Column, TableLayout, MISSING};

pub const GITHUB: &str = "github";
pub const WEATHER: &str = "weather";
pub const CRYPTO: &str = "crypto";

pub const GITHUB_HEADING: &str = "### GitHub Trending Repositories";
pub const WEATHER_HEADING: &str = "### Weather Data Summary";
pub const CRYPTO_HEADING: &str = "### Cryptocurrency Prices";
pub const FOOTER_MARKER: &str = "*This README is automatically updated";

/// Display limits shared by the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub table_rows: usize,
    pub description_chars: usize,
}

/// Rewriter with the three sections and the footer sentinel registered.
pub fn status_rewriter() -> Result<SectionRewriter> {
    Ok(SectionRewriter::new()
        .register(
            SectionSpec::new(GITHUB, GITHUB_HEADING, "| Repository")
                .with_annotation(Annotation::new("(Last Updated: ", ")")),
        )?
        .register(SectionSpec::new(WEATHER, WEATHER_HEADING, "| Metric"))?
        .register(SectionSpec::new(CRYPTO, CRYPTO_HEADING, "| Coin"))?
        .with_sentinel(Sentinel::new(FOOTER_MARKER, Annotation::new("Last update: ", "*"))))
}

pub fn github_layout(limits: Limits) -> TableLayout {
    TableLayout::new(
        vec![
            Column::new("name", CellFormat::Link { url_field: "url".into() }),
            Column::new("stars", CellFormat::Count),
            Column::text("language"),
            Column::new(
                "description",
                CellFormat::Text {
                    max_chars: Some(limits.description_chars),
                },
            ),
        ],
        limits.table_rows,
    )
}

/// `| Metric | Value |`, one row per aggregate.
pub fn weather_layout() -> TableLayout {
    TableLayout::new(vec![Column::text("metric"), Column::text("value")], 4)
}

pub fn crypto_layout(limits: Limits) -> TableLayout {
    TableLayout::new(
        vec![
            Column::text("coin"),
            Column::new("price_usd", CellFormat::Currency),
            Column::new("market_cap", CellFormat::Currency),
            Column::new("change_24h", CellFormat::SignedPercent),
            Column::text("trend"),
        ],
        limits.table_rows,
    )
}

/// Aggregates per-city weather rows into the four summary rows.
///
/// Averages skip values that are missing or not numeric; an average with no
/// input renders as [`MISSING`]. No rows in, no rows out.
pub fn weather_summary(rows: &[RowRecord]) -> Vec<RowRecord> {
    if rows.is_empty() {
        return Vec::new();
    }

    let cities: Vec<String> = rows
        .iter()
        .filter_map(|r| r.get("city").and_then(|v| v.as_text()))
        .collect();
    let temperature = match (mean(rows, "temperature_c"), mean(rows, "temperature_f")) {
        (Some(c), Some(f)) => format!("{c:.1}°C ({f:.1}°F)"),
        (Some(c), None) => format!("{c:.1}°C"),
        _ => MISSING.to_string(),
    };
    let humidity = mean(rows, "humidity")
        .map(|h| format!("{h:.0}%"))
        .unwrap_or_else(|| MISSING.to_string());

    let metric =
        |name: &str, value: String| RowRecord::new().with("metric", name).with("value", value);
    vec![
        metric("Cities Tracked", cities.join(", ")),
        metric("Average Temperature", temperature),
        metric("Average Humidity", humidity),
        metric("Data Points", rows.len().to_string()),
    ]
}

fn mean(rows: &[RowRecord], field: &str) -> Option<f64> {
    let values: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.get(field).and_then(|v| v.as_f64()))
        .collect();
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Latest processed rows of each source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusData {
    pub github: Vec<RowRecord>,
    pub weather: Vec<RowRecord>,
    pub crypto: Vec<RowRecord>,
}

/// Renders every section and stamps the GitHub heading and the footer.
pub fn build_update(data: &StatusData, limits: Limits, stamp: &str) -> DocumentUpdate {
    let mut update = DocumentUpdate {
        footer_timestamp: Some(stamp.to_string()),
        ..Default::default()
    };
    update.sections.insert(
        GITHUB.to_string(),
        SectionUpdate {
            table: github_layout(limits).format(&data.github),
            timestamp: Some(stamp.to_string()),
        },
    );
    update.sections.insert(
        WEATHER.to_string(),
        SectionUpdate {
            table: weather_layout().format(&weather_summary(&data.weather)),
            timestamp: None,
        },
    );
    update.sections.insert(
        CRYPTO.to_string(),
        SectionUpdate {
            table: crypto_layout(limits).format(&data.crypto),
            timestamp: None,
        },
    );
    update
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: Limits = Limits {
        table_rows: 5,
        description_chars: 80,
    };

    fn seattle() -> RowRecord {
        RowRecord::new()
            .with("city", "Seattle")
            .with("temperature_c", 10.0_f64)
            .with("temperature_f", 50.0_f64)
            .with("humidity", 80_i64)
    }

    #[test]
    fn weather_section_gets_four_rows() {
        let doc = "\
# Status

### Weather Data Summary

| Metric | Value |
|--------|-------|
| Cities Tracked | Old |
| Data Points | 9 |

## Next Section
Untouched text.
";
        let data = StatusData {
            weather: vec![seattle()],
            ..Default::default()
        };
        let out = status_rewriter()
            .unwrap()
            .rewrite(doc, &build_update(&data, LIMITS, "2024-05-01 10:00:00 UTC"));

        let expected = "\
# Status

### Weather Data Summary

| Metric | Value |
|--------|-------|
| Cities Tracked | Seattle |
| Average Temperature | 10.0°C (50.0°F) |
| Average Humidity | 80% |
| Data Points | 1 |

## Next Section
Untouched text.
";
        assert_eq!(out.text, expected);
        assert_eq!(out.report.rewritten, vec![WEATHER.to_string()]);
    }

    #[test]
    fn footer_line_alone_changes() {
        let doc = "\
intro
*This README is automatically updated by the pipeline. Last update: 2023-01-01*
outro
";
        let out = status_rewriter()
            .unwrap()
            .rewrite(doc, &build_update(&StatusData::default(), LIMITS, "2024-05-01 10:00:00 UTC"));
        let changed: Vec<(&str, &str)> = doc
            .lines()
            .zip(out.text.lines())
            .filter(|(a, b)| a != b)
            .collect();
        assert_eq!(changed.len(), 1);
        assert_eq!(
            changed[0].1,
            "*This README is automatically updated by the pipeline. Last update: 2024-05-01 10:00:00 UTC*"
        );
        assert_eq!(out.report.sentinels_updated, 1);
    }

    #[test]
    fn empty_sources_render_placeholders() {
        let update = build_update(&StatusData::default(), LIMITS, "now");
        assert!(update.sections[GITHUB].table.starts_with("| *Data will be populated"));
        assert!(update.sections[WEATHER].table.ends_with("| - |"));
        assert_eq!(update.sections[CRYPTO].table.matches(" - ").count(), 4);
    }

    #[test]
    fn averages_skip_unusable_values() {
        let rows = vec![
            seattle(),
            RowRecord::new()
                .with("city", "Oslo")
                .with("temperature_c", 0.0_f64)
                .with("temperature_f", 32.0_f64)
                .with("humidity", "n/a"),
        ];
        let summary = weather_summary(&rows);
        let values: Vec<String> = summary
            .iter()
            .filter_map(|r| r.get("value").and_then(|v| v.as_text()))
            .collect();
        assert_eq!(values, ["Seattle, Oslo", "5.0°C (41.0°F)", "80%", "2"]);
    }
}
