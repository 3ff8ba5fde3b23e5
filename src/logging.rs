//! Subscriber setup for binaries. Library code only emits `tracing` events.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{EnvConfig, DEFAULT_LOG_FILTER};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file {path}: {source}")]
    OpenLogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Filter from `DOC_CHAT_LOG`; an unparsable directive falls back to the default.
pub fn env_filter(config: &EnvConfig) -> EnvFilter {
    EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    File(PathBuf),
    Stderr,
    /// No subscriber is installed.
    Disabled,
}

/// `DOC_CHAT_LOG_FILE` when set. Otherwise stderr, unless stderr shares the
/// screen with an in-place redraw, where stray lines would shift the cursor.
pub fn log_output(config: &EnvConfig, stderr_shares_redraw: bool) -> LogOutput {
    match config.log_file.as_deref() {
        Some(path) => LogOutput::File(PathBuf::from(path)),
        None if stderr_shares_redraw => LogOutput::Disabled,
        None => LogOutput::Stderr,
    }
}

/// Installs a global fmt subscriber writing to `output`.
pub fn init_logging(config: &EnvConfig, output: &LogOutput) -> Result<(), LoggingError> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true);

    let installed = match output {
        LogOutput::File(path) => {
            let file = open_log_file(path)?;
            subscriber
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .try_init()
        }
        LogOutput::Stderr => subscriber.with_writer(io::stderr).try_init(),
        LogOutput::Disabled => return Ok(()),
    };

    installed.map_err(|error| LoggingError::Install(error.to_string()))
}

fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::OpenLogFile {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::{env_filter, log_output, open_log_file, LogOutput, LoggingError};
    use crate::config::EnvConfig;
    use std::path::{Path, PathBuf};

    #[test]
    fn invalid_filter_falls_back_to_default() {
        let config = EnvConfig {
            log_filter: "doc_chat=verbose".to_string(),
            ..EnvConfig::default()
        };
        assert_eq!(env_filter(&config).to_string(), "warn");
    }

    #[test]
    fn configured_filter_is_used() {
        let config = EnvConfig {
            log_filter: "doc_chat=debug".to_string(),
            ..EnvConfig::default()
        };
        assert_eq!(env_filter(&config).to_string(), "doc_chat=debug");
    }

    #[test]
    fn unopenable_log_file_is_reported() {
        let error = open_log_file(Path::new("/nonexistent-dir/doc-chat.log")).expect_err("must fail");
        assert!(matches!(error, LoggingError::OpenLogFile { .. }));
    }

    #[test]
    fn live_redraw_keeps_logs_off_stderr() {
        let config = EnvConfig::default();
        assert_eq!(log_output(&config, true), LogOutput::Disabled);
        assert_eq!(log_output(&config, false), LogOutput::Stderr);

        let config = EnvConfig {
            log_file: Some("/tmp/doc-chat.log".to_string()),
            ..EnvConfig::default()
        };
        assert_eq!(
            log_output(&config, true),
            LogOutput::File(PathBuf::from("/tmp/doc-chat.log"))
        );
    }
}
