//! # Upstream Sources
//!
//! One module per public API. Each defines the upstream payload model, the
//! normalized record it produces and a `collect_*` function that fetches,
//! normalizes and saves a [`RawCapture`] in the raw area of the store.
//!
//! Collectors never fail the pipeline: a source that cannot be reached is
//! logged through the sink and contributes an empty list.

/// CoinGecko simple price.
pub mod crypto;
/// GitHub repository search.
pub mod github;
/// wttr.in current conditions.
pub mod weather;

use std::path::PathBuf;

use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use crate::configs::Settings;
use crate::error::Result;
use crate::loggers::DiagnosticSink;
use crate::retrieve::{ApiClient, JsonFetch};
use crate::store::{Area, FileStore};

pub use crypto::CryptoRecord;
pub use github::RepoRecord;
pub use weather::WeatherRecord;

/// The three tracked sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    GitHub,
    Weather,
    Crypto,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::GitHub, Source::Weather, Source::Crypto];

    /// File tag of raw captures.
    pub fn raw_tag(self) -> &'static str {
        match self {
            Source::GitHub => "github_trending",
            Source::Weather => "weather",
            Source::Crypto => "crypto",
        }
    }

    /// File tag of processed captures.
    pub fn processed_tag(self) -> &'static str {
        match self {
            Source::GitHub => "github_processed",
            Source::Weather => "weather_processed",
            Source::Crypto => "crypto_processed",
        }
    }

    /// The `source` label written into raw captures.
    pub fn label(self) -> &'static str {
        match self {
            Source::GitHub => "GitHub API",
            Source::Weather => "wttr.in",
            Source::Crypto => "CoinGecko API",
        }
    }

    /// Short name used as the diagnostic stage.
    pub fn name(self) -> &'static str {
        match self {
            Source::GitHub => "github",
            Source::Weather => "weather",
            Source::Crypto => "crypto",
        }
    }
}

/// On-disk shape of a raw capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCapture<T> {
    /// ISO-8601 local time of the capture.
    pub collected_at: String,
    pub source: String,
    pub data: Vec<T>,
}

impl<T> RawCapture<T> {
    pub fn new(source: Source, data: Vec<T>) -> Self {
        Self {
            collected_at: now_iso(),
            source: source.label().to_string(),
            data,
        }
    }
}

pub(crate) fn now_iso() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Saves a capture and logs where it went.
pub(crate) fn save_capture<T: Serialize + Clone>(
    store: &FileStore,
    source: Source,
    data: &[T],
    sink: &dyn DiagnosticSink,
) -> Result<PathBuf> {
    let capture = RawCapture::new(source, data.to_vec());
    let path = store.save_json(Area::Raw, source.raw_tag(), &capture)?;
    sink.info(
        source.name(),
        &format!("{} data saved to {}", source.label(), path.display()),
        Some(json!({ "records": data.len(), "path": path })),
    );
    Ok(path)
}

/// Accepts `12`, `12.5` or `"12"`; anything else becomes `0.0`.
///
/// wttr.in quotes every number and CoinGecko occasionally sends `null`.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or_default(),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}

/// The three upstream clients, built from [`Settings`].
pub struct Clients {
    pub github: ApiClient,
    pub weather: ApiClient,
    pub crypto: ApiClient,
}

impl Clients {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            github: ApiClient::new(github::BASE_URL, settings.http_timeout)?,
            weather: ApiClient::new(weather::BASE_URL, settings.http_timeout)?,
            crypto: ApiClient::new(crypto::BASE_URL, settings.http_timeout)?,
        })
    }
}

/// Record counts of one collection run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectSummary {
    pub github: usize,
    pub weather: usize,
    pub crypto: usize,
}

/// Runs the three collectors one after another.
pub async fn collect_all<G, W, C>(
    github_api: &G,
    weather_api: &W,
    crypto_api: &C,
    store: &FileStore,
    settings: &Settings,
    sink: &dyn DiagnosticSink,
) -> CollectSummary
where
    G: JsonFetch,
    W: JsonFetch,
    C: JsonFetch,
{
    sink.info("collect", "Starting data collection pipeline", None);

    let repos = github::collect_github(github_api, store, settings, sink).await;
    let weather = weather::collect_weather(weather_api, store, settings, sink).await;
    let coins = crypto::collect_crypto(crypto_api, store, settings, sink).await;

    let summary = CollectSummary {
        github: repos.len(),
        weather: weather.len(),
        crypto: coins.len(),
    };
    sink.info(
        "collect",
        "Data collection complete",
        Some(json!({
            "github_repos": summary.github,
            "weather_points": summary.weather,
            "crypto_currencies": summary.crypto,
        })),
    );
    summary
}
