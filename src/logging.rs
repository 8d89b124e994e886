/*!
 * Logging and tracing initialization
 */

use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::error::{S3Error, S3Result};

/// Subscriber settings for [`init_logging`]
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level for this crate when `RUST_LOG` is unset
    pub level: Level,

    /// Write JSON lines to this file instead of compact text on stderr
    pub log_file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_file: None,
        }
    }
}

impl LogConfig {
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            log_file: None,
        }
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }
}

/// Install the global tracing subscriber
///
/// Fails with [`S3Error::InvalidConfig`] if the filter is malformed, the log
/// file cannot be created, or a subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> S3Result<()> {
    let env_filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), config.level)?;

    if let Some(ref log_path) = config.log_file {
        init_file_logging(log_path, env_filter)
    } else {
        init_stderr_logging(env_filter)
    }
}

/// `RUST_LOG` directives when set, else `s3bridge=<level>`
pub(crate) fn build_filter(directives: Option<&str>, level: Level) -> S3Result<EnvFilter> {
    let directives = match directives {
        Some(d) if !d.trim().is_empty() => d.to_string(),
        _ => format!("s3bridge={}", level),
    };

    EnvFilter::try_new(&directives)
        .map_err(|e| S3Error::InvalidConfig(format!("Failed to create log filter: {}", e)))
}

fn init_stderr_logging(env_filter: EnvFilter) -> S3Result<()> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| S3Error::InvalidConfig(format!("Failed to install subscriber: {}", e)))
}

fn init_file_logging(log_path: &Path, env_filter: EnvFilter) -> S3Result<()> {
    let file = File::create(log_path)
        .map_err(|e| S3Error::InvalidConfig(format!("Failed to create log file: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(file)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| S3Error::InvalidConfig(format!("Failed to install subscriber: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_targets_crate() {
        let filter = build_filter(None, Level::DEBUG).unwrap();
        assert_eq!(filter.to_string().to_lowercase(), "s3bridge=debug");

        let filter = build_filter(Some("  "), Level::WARN).unwrap();
        assert_eq!(filter.to_string().to_lowercase(), "s3bridge=warn");
    }

    #[test]
    fn test_rust_log_directives_win() {
        let filter = build_filter(Some("aws_sdk_s3=trace"), Level::INFO).unwrap();
        assert_eq!(filter.to_string().to_lowercase(), "aws_sdk_s3=trace");
    }

    #[test]
    fn test_bad_directives_rejected() {
        let err = build_filter(Some("s3bridge=loud"), Level::INFO).unwrap_err();
        assert!(matches!(err, S3Error::InvalidConfig(_)));
    }

    #[test]
    fn test_file_logging_second_init_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig::verbose().with_log_file(dir.path().join("s3.log"));

        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
        assert!(dir.path().join("s3.log").exists());
    }
}
