//! Collect, process and update in one call.

use serde_json::json;

use crate::configs::Settings;
use crate::error::Result;
use crate::loggers::DiagnosticSink;
use crate::process::{process_all, ProcessSummary};
use crate::readme::{update_readme, RewriteReport};
use crate::retrieve::JsonFetch;
use crate::sources::{collect_all, Clients, CollectSummary};
use crate::store::FileStore;

const STAGE: &str = "pipeline";

/// What one full run did.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub collected: CollectSummary,
    pub processed: ProcessSummary,
    pub readme: RewriteReport,
}

/// Runs the three stages in order against the given fetchers.
///
/// Only a store that cannot be created or a status document that cannot be
/// read or written ends the run with an error; upstream and processing
/// failures are logged and leave placeholder tables behind.
pub async fn run_pipeline<G, W, C>(
    github_api: &G,
    weather_api: &W,
    crypto_api: &C,
    settings: &Settings,
    sink: &dyn DiagnosticSink,
) -> Result<PipelineReport>
where
    G: JsonFetch,
    W: JsonFetch,
    C: JsonFetch,
{
    let store = FileStore::new(&settings.data_dir);
    store.ensure_directories()?;

    let collected = collect_all(github_api, weather_api, crypto_api, &store, settings, sink).await;
    let processed = process_all(&store, settings, sink);
    let readme = update_readme(&store, settings, sink)?;

    sink.info(
        STAGE,
        "Pipeline run complete",
        Some(json!({
            "github": collected.github,
            "weather": collected.weather,
            "crypto": collected.crypto,
            "sections": readme.rewritten,
        })),
    );
    Ok(PipelineReport {
        collected,
        processed,
        readme,
    })
}

/// [`run_pipeline`] with the production HTTP clients.
pub async fn run_with_clients(
    clients: &Clients,
    settings: &Settings,
    sink: &dyn DiagnosticSink,
) -> Result<PipelineReport> {
    run_pipeline(&clients.github, &clients.weather, &clients.crypto, settings, sink).await
}
