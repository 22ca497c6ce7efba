// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization
//!
//! Console output is always installed. With the `file-logging` feature a JSON
//! log file is additionally written to a timestamped run folder.

use anyhow::{anyhow, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

#[cfg(feature = "file-logging")]
use std::path::{Path, PathBuf};

/// Keeps background log writers alive; drop it only at process exit.
#[derive(Default)]
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
    #[cfg(feature = "file-logging")]
    log_dir: Option<PathBuf>,
}

#[cfg(feature = "file-logging")]
impl LoggingGuard {
    /// Run folder holding the log file, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Build the filter from debug flags, falling back to `default_level` for everything else
pub fn build_filter(debug_flags: &CrateDebugFlags, default_level: &str) -> Result<EnvFilter> {
    let directives = debug_flags.to_filter_string(default_level);
    EnvFilter::try_new(&directives)
        .map_err(|e| anyhow!("Invalid log filter '{}': {}", directives, e))
}

/// Initialize console logging
///
/// # Errors
/// Fails if the level is not a valid filter directive or a global subscriber is
/// already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, default_level: &str) -> Result<LoggingGuard> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(build_filter(debug_flags, default_level)?);

    Registry::default()
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(LoggingGuard::default())
}

/// Initialize console logging plus a JSON log file
///
/// Creates `<log_dir>/run_<timestamp>/owl-solver.log`.
#[cfg(feature = "file-logging")]
pub fn init_logging_to_dir(
    debug_flags: &CrateDebugFlags,
    default_level: &str,
    log_dir: &Path,
) -> Result<LoggingGuard> {
    use anyhow::Context;

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let run_folder = log_dir.join(format!("run_{}", timestamp));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(build_filter(debug_flags, default_level)?)
        .boxed();

    let file_appender = tracing_appender::rolling::never(&run_folder, "owl-solver.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(build_filter(debug_flags, default_level)?)
        .boxed();

    Registry::default()
        .with(vec![console_layer, file_layer])
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(LoggingGuard {
        _file_guard: Some(guard),
        log_dir: Some(run_folder),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_levels() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-owl-solver".to_string()]);
        assert!(build_filter(&flags, "info").is_ok());
        assert!(build_filter(&flags, "WARN").is_ok());
    }

    #[test]
    fn test_build_filter_rejects_garbage() {
        let flags = CrateDebugFlags::default();
        assert!(build_filter(&flags, "owl_solver=notalevel").is_err());
    }

    #[cfg(feature = "file-logging")]
    #[test]
    fn test_log_dir_gets_run_folder_with_json_file() {
        let temp = tempfile::tempdir().unwrap();
        let guard = init_logging_to_dir(&CrateDebugFlags::default(), "info", temp.path()).unwrap();

        let run_folder = guard.log_dir().unwrap().to_path_buf();
        assert!(run_folder.starts_with(temp.path()));
        assert!(run_folder
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("run_"));

        tracing::info!(sample_count = 3, "written to the run log");
        // Dropping the guard flushes the background writer
        drop(guard);

        let contents = std::fs::read_to_string(run_folder.join("owl-solver.log")).unwrap();
        let line = contents
            .lines()
            .find(|line| line.contains("written to the run log"))
            .unwrap();
        let record: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(record["level"], "INFO");
    }
}
