use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{PipelineError, Result};

/// Installs the global `tracing` subscriber for a binary.
///
/// Console output is human readable; the file under `log_dir` rolls daily,
/// is named after `app_name` and holds one JSON object per line. `RUST_LOG`
/// overrides `log_level` when set.
///
/// The returned guard flushes the non-blocking file writer when dropped and
/// must be kept alive for the lifetime of `main`.
pub fn setup_logging(app_name: &str, log_dir: &Path, log_level: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir).map_err(|e| PipelineError::io(log_dir, e))?;

    let file_appender = rolling::daily(log_dir, app_name);
    let (non_blocking_appender, guard) = non_blocking(file_appender);

    let console_layer = fmt::layer().with_target(true).with_ansi(true);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking_appender)
        .json();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| PipelineError::Config(format!("invalid log level `{log_level}`: {e}")))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| PipelineError::Config(format!("logging already initialized: {e}")))?;

    tracing::info!("Logging initialized with level: {}", log_level);
    Ok(guard)
}
