//! Rewrites the status document from the latest processed tables.
//!
//! Exits non-zero when the document cannot be read or written.

use anyhow::{Context, Result};
use tracing::{info, warn};

use lib_datapulse::configs::{load_settings, Config};
use lib_datapulse::loggers::setup_logging;
use lib_datapulse::readme::update_readme;
use lib_datapulse::store::FileStore;
use lib_datapulse::TracingSink;

fn main() -> Result<()> {
    let settings = load_settings(Config::from_env_and_args()).context("Failed to load settings")?;
    let _guard = setup_logging("update_readme", &settings.log_dir, &settings.log_level)
        .context("Failed to initialize logging")?;

    let store = FileStore::new(&settings.data_dir);
    let report = update_readme(&store, &settings, &TracingSink)
        .with_context(|| format!("Failed to update {}", settings.readme_path.display()))?;

    info!("Sections updated: {}", report.rewritten.join(", "));
    if !report.skipped.is_empty() {
        warn!("{} section(s) left unchanged", report.skipped.len());
    }
    Ok(())
}
