use std::fs;

use anyhow::{Context, Result, anyhow};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
use uuid::Uuid;

use crate::config::{LoggingConfig, LoggingRotation};

const LOG_FILE_PREFIX: &str = "uplink";
const LOG_FILE_SUFFIX: &str = "log";

/// Flushes the background file writer when dropped. Hold it until exit.
pub struct LoggingGuard {
    _file_writer: WorkerGuard,
}

/// Installs the global subscriber:
///
/// * a JSON file layer, one object per event, carrying the enclosing
///   `uplink_cycle` span (`cycle_id`, `trial_count`) so every trial event
///   can be grouped by cycle;
/// * an optional plain stderr layer for warnings and errors;
/// * `ErrorLayer` for span traces.
///
/// Retention is delegated to the appender: it keeps `retention_days` worth of
/// rotated files and prunes older ones as it rotates.
pub fn init_tracing(config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = env_filter(&config.filter)?;
    let appender = file_appender(config)?;
    let (writer, file_writer) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_current_span(true)
        .with_span_list(false)
        .with_writer(writer)
        .with_filter(filter);

    let stderr_layer = config.stderr_warn_enabled.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    tracing::info!(
        target: "uplink",
        run_id = %Uuid::now_v7(),
        dir = %config.dir.display(),
        filter = %config.filter,
        rotation = ?config.rotation,
        max_log_files = retained_files(config),
        "logging_initialized"
    );

    Ok(LoggingGuard {
        _file_writer: file_writer,
    })
}

fn env_filter(directives: &str) -> Result<EnvFilter> {
    if directives.trim().is_empty() {
        return Err(anyhow!("logging.filter cannot be empty"));
    }
    EnvFilter::try_new(directives)
        .with_context(|| format!("invalid logging.filter '{directives}'"))
}

fn file_appender(config: &LoggingConfig) -> Result<RollingFileAppender> {
    let dir = &config.dir;
    if dir.as_os_str().is_empty() {
        return Err(anyhow!("logging.dir cannot be empty"));
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    let rotation = match config.rotation {
        LoggingRotation::Daily => Rotation::DAILY,
        LoggingRotation::Hourly => Rotation::HOURLY,
    };

    RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(retained_files(config))
        .build(dir)
        .with_context(|| format!("failed to open log directory {}", dir.display()))
}

/// Number of rotated files covering `retention_days`.
fn retained_files(config: &LoggingConfig) -> usize {
    let days = config.retention_days.max(1);
    match config.rotation {
        LoggingRotation::Daily => days,
        LoggingRotation::Hourly => days.saturating_mul(24),
    }
}
