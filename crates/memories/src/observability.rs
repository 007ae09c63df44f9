//! Logging setup for the `memories` binary.

use std::env;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Configuration for log output.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Explicit log level filter (e.g. "debug"); overrides `RUST_LOG` when set
    pub log_level: Option<String>,
    /// Enable JSON-formatted logs for structured logging
    pub json_logs: bool,
}

impl ObservabilityConfig {
    /// Create a configuration that follows `RUST_LOG` (default `info`) with text output.
    pub fn new() -> Self {
        Self {
            log_level: None,
            json_logs: false,
        }
    }

    /// Set the log level.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Enable JSON-formatted logs.
    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    /// The filter directive in force: explicit level, then `RUST_LOG`, then `info`.
    fn directive(&self) -> String {
        self.log_level
            .clone()
            .or_else(|| env::var("RUST_LOG").ok())
            .unwrap_or_else(|| "info".to_string())
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the global tracing subscriber.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
///
/// # Errors
///
/// Fails if the filter directive is malformed or a subscriber is already set.
pub fn init_observability(config: &ObservabilityConfig) -> Result<(), Box<dyn std::error::Error>> {
    let directive = config.directive();
    let filter = EnvFilter::try_new(&directive)?;

    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    tracing::debug!(filter = %directive, json = config.json_logs, "Logging initialized");
    Ok(())
}
