//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;

use serde_json::{json, Value};

use lib_datapulse::configs::{Config, Settings};
use lib_datapulse::retrieve::JsonFetch;
use lib_datapulse::{PipelineError, Result};

/// Answers `get_json` from a fixed path -> body table; unknown paths are a 503.
#[derive(Default)]
pub struct Canned {
    bodies: HashMap<String, Value>,
}

impl Canned {
    pub fn with(mut self, path: &str, body: Value) -> Self {
        self.bodies.insert(path.to_string(), body);
        self
    }
}

impl JsonFetch for Canned {
    async fn get_json(&self, path: &str, _query: &[(&str, String)]) -> Result<Value> {
        self.bodies.get(path).cloned().ok_or_else(|| PipelineError::Status {
            url: path.to_string(),
            status: 503,
            body: "unavailable".to_string(),
        })
    }
}

pub fn settings(root: &Path) -> Settings {
    Settings::resolve(Config {
        data_dir: Some(root.join("data")),
        readme_path: Some(root.join("README.md")),
        log_dir: Some(root.join("logs")),
        weather_cities: Some(vec!["Seattle".into(), "Atlantis".into()]),
        crypto_ids: Some(vec!["bitcoin".into(), "solana".into()]),
        ..Default::default()
    })
    .unwrap()
}

pub fn github_api() -> Canned {
    Canned::default().with(
        "search/repositories",
        json!({
            "items": [
                {
                    "full_name": "rust-lang/rust",
                    "stargazers_count": 98765,
                    "language": "Rust",
                    "description": "Empowering everyone to build reliable and efficient software.",
                    "html_url": "https://github.com/rust-lang/rust",
                    "updated_at": "2024-05-01T00:00:00Z"
                },
                {
                    "full_name": "octo/empty",
                    "stargazers_count": 1200,
                    "language": null,
                    "description": null,
                    "html_url": "https://github.com/octo/empty",
                    "updated_at": "2024-05-01T00:00:00Z"
                }
            ]
        }),
    )
}

pub fn weather_api() -> Canned {
    Canned::default().with(
        "Seattle",
        json!({
            "current_condition": [{
                "temp_C": "10",
                "temp_F": "50",
                "humidity": "80",
                "windspeedKmph": "13",
                "weatherDesc": [{ "value": "Light rain" }]
            }]
        }),
    )
}

pub fn crypto_api() -> Canned {
    Canned::default().with(
        "simple/price",
        json!({
            "bitcoin": { "usd": 64000, "usd_market_cap": 1.25e12, "usd_24h_change": 2.5 },
            "solana": { "usd": 145.2, "usd_market_cap": 6.5e10, "usd_24h_change": -1.25 }
        }),
    )
}

pub const README_TEMPLATE: &str = "\
# Data Pulse

Snapshots of public APIs, refreshed by a scheduled pipeline.

## Live Data

### GitHub Trending Repositories (Last Updated: Never)

| Repository | Stars | Language | Description |
|------------|-------|----------|-------------|
| *Data will be populated by automated pipeline* | - | - | - |

### Weather Data Summary

| Metric | Value |
|--------|-------|
| *Data will be populated by automated pipeline* | - |

### Cryptocurrency Prices

| Coin | Price (USD) | Market Cap | 24h Change | Trend |
|------|-------------|------------|------------|-------|
| *Data will be populated by automated pipeline* | - | - | - | - |

## How It Works

Collect, process, update.

---
*This README is automatically updated by the data pipeline. Last update: Never*
";
