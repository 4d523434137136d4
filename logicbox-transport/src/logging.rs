use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging setup shared by every binary
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub verbose: bool,
    /// Also write plain-text logs to this file
    pub log_file: Option<PathBuf>,
}

/// Initialise tracing to stderr and, optionally, a log file.
///
/// Stdout is left alone; the stdio transport owns it. Keep the returned guard
/// alive for the life of the process or buffered file output is lost.
pub fn init_tracing(options: &LogOptions) -> Result<Option<WorkerGuard>> {
    let log_level = if options.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "logicbox={},logicbox_sandbox={},logicbox_transport={},logicbox_logic={}",
            log_level, log_level, log_level, log_level
        ))
    });

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true);

    let (file_layer, guard) = match &options.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let name = path
                .file_name()
                .context("Log file path has no file name")?;
            let file_appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .with(filter)
        .try_init()
        .context("Failed to initialise tracing")?;

    Ok(guard)
}
