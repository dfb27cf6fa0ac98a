//! Fetches one snapshot from every source into `<data_dir>/raw`.

use anyhow::{Context, Result};
use tracing::info;

use lib_datapulse::configs::{load_settings, Config};
use lib_datapulse::loggers::setup_logging;
use lib_datapulse::sources::{collect_all, Clients};
use lib_datapulse::store::FileStore;
use lib_datapulse::TracingSink;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = load_settings(Config::from_env_and_args()).context("Failed to load settings")?;
    let _guard = setup_logging("collect_data", &settings.log_dir, &settings.log_level)
        .context("Failed to initialize logging")?;
    info!("{}", settings);

    let store = FileStore::new(&settings.data_dir);
    store.ensure_directories()?;
    let clients = Clients::new(&settings)?;

    let summary = collect_all(
        &clients.github,
        &clients.weather,
        &clients.crypto,
        &store,
        &settings,
        &TracingSink,
    )
    .await;

    info!(
        "GitHub repos: {}, weather cities: {}, crypto currencies: {}",
        summary.github, summary.weather, summary.crypto
    );
    Ok(())
}
