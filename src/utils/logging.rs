// src/utils/logging.rs
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::utils::{
    config::LoggingConfig,
    error::{NodeError, Result},
};

const LOG_FILE_PREFIX: &str = "enrollment-node.log";

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over the configured level when set. When a log directory is
/// configured a daily-rolling JSON file layer is added next to the console
/// output; the returned guard must be held for the lifetime of the process so
/// buffered lines are flushed on exit.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| NodeError::Config(format!("Invalid log level '{}': {}", config.level, e)))?;

    let console = if config.json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory).map_err(|e| {
                NodeError::Init(format!(
                    "Failed to create log directory {}: {}",
                    directory.display(),
                    e
                ))
            })?;
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .json();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| NodeError::Init(format!("Failed to install tracing subscriber: {}", e)))?;

    Ok(guard)
}
