//! Collect, process and update, once or on a cron schedule.
//!
//! `--schedule "0 0 */6 * * *"` (seconds field first, UTC) keeps the process
//! alive and runs the pipeline on every tick until Ctrl-C.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use tokio_cron_scheduler::{JobBuilder, JobScheduler};
use tracing::{error, info, warn};

use lib_datapulse::configs::{load_settings, Config, Settings};
use lib_datapulse::loggers::setup_logging;
use lib_datapulse::pipeline::{run_with_clients, PipelineReport};
use lib_datapulse::sources::Clients;
use lib_datapulse::TracingSink;

fn log_report(report: &PipelineReport) {
    info!(
        "Collected {} repos, {} cities, {} coins",
        report.collected.github, report.collected.weather, report.collected.crypto
    );
    info!("Sections updated: {}", report.readme.rewritten.join(", "));
    for (id, reason) in &report.readme.skipped {
        warn!("Section `{}` left unchanged: {}", id, reason);
    }
}

async fn run_scheduled(cron: &str, settings: Arc<Settings>, clients: Arc<Clients>) -> Result<()> {
    let mut scheduler = JobScheduler::new()
        .await
        .map_err(|e| anyhow!("Failed to create scheduler: {e:?}"))?;

    let job = JobBuilder::new()
        .with_timezone(Utc)
        .with_cron_job_type()
        .with_schedule(cron)
        .map_err(|e| anyhow!("Invalid schedule `{cron}`: {e:?}"))?
        .with_run_async(Box::new(move |uuid, mut l| {
            let settings = Arc::clone(&settings);
            let clients = Arc::clone(&clients);
            Box::pin(async move {
                match run_with_clients(&clients, &settings, &TracingSink).await {
                    Ok(report) => log_report(&report),
                    Err(e) => error!("Pipeline run failed: {}", e),
                }
                match l.next_tick_for_job(uuid).await {
                    Ok(Some(ts)) => info!("Next pipeline run at {:?}", ts),
                    _ => warn!("Could not get next tick for pipeline job"),
                }
            })
        }))
        .build()
        .map_err(|e| anyhow!("Failed to build pipeline job: {e:?}"))?;

    scheduler
        .add(job)
        .await
        .map_err(|e| anyhow!("Failed to add pipeline job: {e:?}"))?;
    scheduler
        .start()
        .await
        .map_err(|e| anyhow!("Failed to start scheduler: {e:?}"))?;
    info!("Pipeline scheduled with `{}` (UTC)", cron);

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    info!("Shutting down scheduler");
    scheduler
        .shutdown()
        .await
        .map_err(|e| anyhow!("Failed to stop scheduler: {e:?}"))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = load_settings(Config::from_env_and_args()).context("Failed to load settings")?;
    let _guard = setup_logging("run_pipeline", &settings.log_dir, &settings.log_level)
        .context("Failed to initialize logging")?;
    info!("{}", settings);

    let clients = Clients::new(&settings)?;

    match settings.schedule.clone() {
        Some(cron) => run_scheduled(&cron, Arc::new(settings), Arc::new(clients)).await,
        None => {
            let report = run_with_clients(&clients, &settings, &TracingSink).await?;
            log_report(&report);
            Ok(())
        }
    }
}
