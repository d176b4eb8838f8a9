//! Structured logging through `tracing`.
//!
//! `RUST_LOG` takes precedence over the configured level. Passwords and
//! authorization headers are never passed to any log macro.

use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LogSection;
use crate::error::{AppError, AppResult};

/// Target used for telemetry-style events (pack opened, asset opened, ...).
pub const ANALYTICS_TARGET: &str = "astore::analytics";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
    pub with_ansi: bool,
}

impl LogConfig {
    pub fn from_section(section: &LogSection) -> Self {
        Self {
            level: section.level.clone(),
            format: section.format,
            with_ansi: true,
        }
    }

    /// `-v` raises the level to debug, `-vv` (or more) to trace.
    #[must_use]
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        match verbose {
            0 => {}
            1 => self.level = "debug".to_string(),
            _ => self.level = "trace".to_string(),
        }
        self
    }

    fn env_filter(&self) -> AppResult<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.level)
            .map_err(|err| AppError::config(format!("invalid log level {:?}: {err}", self.level)))
    }
}

/// Installs the global subscriber. Calling it twice is harmless; the
/// second install is ignored.
pub fn init_logging(config: &LogConfig) -> AppResult<()> {
    let filter = config.env_filter()?;
    let result = match config.format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_ansi(config.with_ansi)
                    .with_target(false),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    if let Err(err) = result {
        tracing::debug!(error = %err, "tracing subscriber already installed");
    }
    Ok(())
}
