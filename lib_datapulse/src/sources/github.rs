use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::configs::Settings;
use crate::error::{PipelineError, Result};
use crate::loggers::DiagnosticSink;
use crate::records::{RowRecord, ToRow};
use crate::retrieve::JsonFetch;
use crate::store::FileStore;

use super::{save_capture, Source};

pub const BASE_URL: &str = "https://api.github.com/";
const SEARCH_PATH: &str = "search/repositories";
const DESCRIPTION_LIMIT: usize = 100;

/// One item of the search response; only the fields we keep.
#[derive(Debug, Deserialize)]
struct SearchItem {
    full_name: String,
    #[serde(default)]
    stargazers_count: i64,
    language: Option<String>,
    description: Option<String>,
    html_url: String,
    #[serde(default)]
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

/// A normalized repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoRecord {
    pub name: String,
    pub stars: i64,
    pub language: String,
    pub description: String,
    pub url: String,
    pub updated_at: String,
}

impl From<SearchItem> for RepoRecord {
    fn from(item: SearchItem) -> Self {
        let description = item
            .description
            .unwrap_or_else(|| "No description".to_string())
            .chars()
            .take(DESCRIPTION_LIMIT)
            .collect();
        Self {
            name: item.full_name,
            stars: item.stargazers_count,
            language: item.language.unwrap_or_else(|| "N/A".to_string()),
            description,
            url: item.html_url,
            updated_at: item.updated_at,
        }
    }
}

impl ToRow for RepoRecord {
    fn to_row(&self) -> RowRecord {
        RowRecord::new()
            .with("name", self.name.as_str())
            .with("stars", self.stars)
            .with("language", self.language.as_str())
            .with("description", self.description.as_str())
            .with("url", self.url.as_str())
            .with("updated_at", self.updated_at.as_str())
    }
}

/// Turns a search response body into at most `limit` records.
pub fn parse_search(body: Value, limit: usize) -> Result<Vec<RepoRecord>> {
    let response: SearchResponse = serde_json::from_value(body)
        .map_err(|e| PipelineError::Payload(format!("GitHub search: {e}")))?;
    Ok(response
        .items
        .into_iter()
        .take(limit)
        .map(RepoRecord::from)
        .collect())
}

async fn fetch_github<F: JsonFetch>(api: &F, settings: &Settings) -> Result<Vec<RepoRecord>> {
    let query = [
        ("q", settings.github_query.clone()),
        ("sort", "stars".to_string()),
        ("order", "desc".to_string()),
        ("per_page", settings.github_per_page.to_string()),
    ];
    let body = api.get_json(SEARCH_PATH, &query).await?;
    parse_search(body, settings.github_per_page as usize)
}

/// Collects the most starred repositories and saves a raw capture.
///
/// Any failure is logged and yields an empty list; nothing is saved then.
pub async fn collect_github<F: JsonFetch>(
    api: &F,
    store: &FileStore,
    settings: &Settings,
    sink: &dyn DiagnosticSink,
) -> Vec<RepoRecord> {
    let stage = Source::GitHub.name();
    sink.info(stage, "Collecting GitHub trending data...", None);

    let repos = match fetch_github(api, settings).await {
        Ok(repos) => repos,
        Err(e) => {
            sink.error(
                stage,
                &format!("Error collecting GitHub data: {e}"),
                Some(json!({ "source": Source::GitHub.label() })),
            );
            return Vec::new();
        }
    };

    if let Err(e) = save_capture(store, Source::GitHub, &repos, sink) {
        sink.error(stage, &format!("Error saving GitHub data: {e}"), None);
        return Vec::new();
    }
    repos
}
