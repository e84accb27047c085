//! Structured logging
//!
//! Installs a `tracing` subscriber from [`LoggingConfig`]:
//! - `pretty` or `json` formatting
//! - stderr, a daily-rolled file, or both
//! - `RUST_LOG` takes precedence over the configured level
//!
//! Logs never go to stdout, which carries command output.

use crate::config::LoggingConfig;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_NAME: &str = "claude-dash.log";

/// Initialize logging. Hold the returned guard for the life of the process so buffered
/// file output is flushed on exit.
pub fn init_logging(config: &LoggingConfig, log_dir: &Path) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.output.as_str() {
        "file" => init_file_logging(env_filter, &config.format, log_dir),
        "both" => init_combined_logging(env_filter, &config.format, log_dir),
        _ => {
            init_console_logging(env_filter, &config.format);
            None
        }
    }
}

fn init_console_logging(filter: EnvFilter, format: &str) {
    let subscriber = tracing_subscriber::registry().with(filter);

    let result = match format {
        "json" => subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        _ => subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_ansi(true)
                    .pretty(),
            )
            .try_init(),
    };
    report_init_failure(result);
}

fn file_writer(log_dir: &Path) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!(
            "Warning: cannot create log directory {}: {}",
            log_dir.display(),
            e
        );
        return None;
    }
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    Some(tracing_appender::non_blocking(file_appender))
}

fn init_file_logging(filter: EnvFilter, format: &str, log_dir: &Path) -> Option<WorkerGuard> {
    let Some((non_blocking, guard)) = file_writer(log_dir) else {
        init_console_logging(filter, format);
        return None;
    };

    let subscriber = tracing_subscriber::registry().with(filter);

    let result = match format {
        "json" => subscriber
            .with(fmt::layer().json().with_writer(non_blocking))
            .try_init(),
        _ => subscriber
            .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
            .try_init(),
    };
    report_init_failure(result);
    Some(guard)
}

fn init_combined_logging(filter: EnvFilter, format: &str, log_dir: &Path) -> Option<WorkerGuard> {
    let Some((non_blocking, guard)) = file_writer(log_dir) else {
        init_console_logging(filter, format);
        return None;
    };

    let subscriber = tracing_subscriber::registry().with(filter);

    let result = match format {
        "json" => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(fmt::layer().json().with_writer(non_blocking))
            .try_init(),
        _ => subscriber
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .try_init(),
    };
    report_init_failure(result);
    Some(guard)
}

fn report_init_failure(result: Result<(), tracing_subscriber::util::TryInitError>) {
    // Only fails when a subscriber is already installed, e.g. in tests
    if let Err(e) = result {
        eprintln!("Warning: logging already initialized: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_logging_creates_directory() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("nested").join("logs");
        let config = LoggingConfig {
            level: "info".to_string(),
            format: "json".to_string(),
            output: "file".to_string(),
        };

        let guard = init_logging(&config, &log_dir);
        assert!(guard.is_some());
        assert!(log_dir.is_dir());
    }
}
