use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the tracing filter, e.g. `RVIEW_LOG=debug`.
pub const LOG_ENV: &str = "RVIEW_LOG";
const LOG_FILE: &str = "rview.log";

pub fn default_log_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("rview"))
}

/// Routes tracing output to a file, since the terminal belongs to the UI.
/// The returned guard flushes pending lines when dropped.
pub fn init(dir: Option<PathBuf>) -> Result<Option<WorkerGuard>> {
    let Some(dir) = dir.or_else(default_log_dir) else {
        return Ok(None);
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("logging: failed to create {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("logging: {err}"))?;

    Ok(Some(guard))
}
