// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide tracing setup for hosts embedding the hub

use crate::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured filter. Logs go to the configured
/// file through a non-blocking writer, or to stderr. The returned guard
/// must be held for as long as file logging should keep flushing.
pub fn init(config: &LoggingConfig) -> std::io::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(path) = &config.path else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init();
        return Ok(None);
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => std::path::Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("log path has no file name: {}", path.display()),
        )
    })?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .try_init();

    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_logging_creates_directory_and_returns_guard() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            filter: "debug".to_string(),
            path: Some(dir.path().join("logs").join("hub.log")),
        };

        let guard = init(&config).unwrap();

        assert!(guard.is_some());
        assert!(dir.path().join("logs").is_dir());
    }

    #[test]
    fn path_without_file_name_is_rejected() {
        let config = LoggingConfig {
            filter: "info".to_string(),
            path: Some(std::path::PathBuf::from("/")),
        };
        assert!(init(&config).is_err());
    }
}
