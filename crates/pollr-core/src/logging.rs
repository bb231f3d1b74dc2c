//! Tracing setup.
//!
//! Stderr always; a daily-rolling file under `$POLLR_HOME/logs` when
//! `[log] file = true`. `POLLR_LOG` takes precedence over `[log] level`.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::config::{LogConfig, paths};

pub const LOG_ENV: &str = "POLLR_LOG";
const LOG_FILE_PREFIX: &str = "pollr.log";

/// Keeps the file writer flushing. Hold it until exit.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

fn build_filter(env_value: Option<&str>, config: &LogConfig) -> EnvFilter {
    env_value
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_new(&config.level).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

/// Installs the global subscriber.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already set.
pub fn init(config: &LogConfig) -> Result<LogGuard> {
    let env_value = std::env::var(LOG_ENV).ok();
    let filter = build_filter(env_value.as_deref(), config);

    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let (file_layer, guard) = if config.file {
        let dir = paths::logs_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LogGuard { _file: guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_config_level() {
        let config = LogConfig {
            level: "warn".to_string(),
            file: false,
        };
        assert_eq!(build_filter(Some("debug"), &config).to_string(), "debug");
        assert_eq!(build_filter(None, &config).to_string(), "warn");
        assert_eq!(build_filter(Some("  "), &config).to_string(), "warn");
    }

    #[test]
    fn test_bad_config_level_falls_back() {
        let config = LogConfig {
            level: "pollr=loud".to_string(),
            file: false,
        };
        assert_eq!(build_filter(None, &config).to_string(), "warn");
    }
}
