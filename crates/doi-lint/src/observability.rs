//! Tracing setup: a non-blocking log file, or stderr when no file can be opened.
//!
//! stdout carries the check report, so diagnostics never go there.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Explicit log file path.
const LOG_PATH_ENV: &str = "DOI_LINT_LOG_PATH";

/// Directory for the default log file.
const LOG_DIR_ENV: &str = "DOI_LINT_LOG_DIR";

const LOG_FILE_NAME: &str = "doi-lint.log";

/// Where log output should go.
#[derive(Debug, Clone, Default)]
pub struct ObservabilityConfig {
    /// Full path of the log file; wins over `log_dir`.
    pub log_path: Option<PathBuf>,
    /// Directory that receives `doi-lint.log`.
    pub log_dir: Option<PathBuf>,
}

impl ObservabilityConfig {
    /// Resolve log locations from the environment, then `config_log_dir`,
    /// then the platform data directory.
    pub fn from_env_with_overrides(config_log_dir: Option<PathBuf>) -> Self {
        let log_path = std::env::var_os(LOG_PATH_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        let log_dir = std::env::var_os(LOG_DIR_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or(config_log_dir)
            .or_else(|| {
                doi_lint_core::config::user_data_local_dir()
                    .map(|dir| dir.join("logs").into_std_path_buf())
            });
        Self { log_path, log_dir }
    }

    fn log_file(&self) -> Option<PathBuf> {
        self.log_path
            .clone()
            .or_else(|| self.log_dir.as_ref().map(|dir| dir.join(LOG_FILE_NAME)))
    }
}

/// Build the filter: `RUST_LOG` wins, then `-q`/`-v`, then the configured level.
pub fn env_filter(quiet: bool, verbose: u8, default_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => default_level,
            1 => "debug",
            _ => "trace",
        }
    };
    EnvFilter::new(level)
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive for
/// the life of the process. `None` means logs go to stderr.
pub fn init_observability(
    config: &ObservabilityConfig,
    filter: EnvFilter,
) -> anyhow::Result<Option<WorkerGuard>> {
    let opened = config
        .log_file()
        .map(|path| open_append(&path).map(|file| (file, path)));

    match opened {
        Some(Ok((file, path))) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;
            tracing::debug!(path = %path.display(), "logging to file");
            Ok(Some(guard))
        }
        other => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .try_init()
                .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;
            if let Some(Err(err)) = other {
                tracing::debug!(error = %err, "log file unavailable, logging to stderr");
            }
            Ok(None)
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
