//! Converts the latest raw captures into processed tables and a summary.

use anyhow::{Context, Result};
use tracing::info;

use lib_datapulse::configs::{load_settings, Config};
use lib_datapulse::loggers::setup_logging;
use lib_datapulse::process::process_all;
use lib_datapulse::store::FileStore;
use lib_datapulse::TracingSink;

fn main() -> Result<()> {
    let settings = load_settings(Config::from_env_and_args()).context("Failed to load settings")?;
    let _guard = setup_logging("process_data", &settings.log_dir, &settings.log_level)
        .context("Failed to initialize logging")?;

    let store = FileStore::new(&settings.data_dir);
    store.ensure_directories()?;

    let summary = process_all(&store, &settings, &TracingSink);
    info!("GitHub repos: {}", summary.github_repos_analyzed);
    info!("Weather cities: {}", summary.weather_cities_tracked);
    info!("Crypto currencies: {}", summary.crypto_currencies_tracked);
    Ok(())
}
