//! Logging setup for the command line
//!
//! Logs go to stderr so stdout carries only the JSON or table output.
//! `RUST_LOG` takes precedence over the configured filter.

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
    /// Emit one JSON object per event instead of human-readable lines
    pub json: bool,
    /// Include file and line in each event
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "warn".to_string(),
            json: false,
            include_location: cfg!(debug_assertions),
        }
    }
}

impl LoggingConfig {
    /// Filter for `level` across the SQL Doctor crates, warnings elsewhere
    pub fn for_level(level: &str) -> Self {
        let default_filter = format!(
            "warn,sqldoctor={level},sqldoctor_core={level},sqldoctor_analyzer={level},\
             sqldoctor_monitor={level},sqldoctor_driver_mssql={level}"
        );
        Self {
            default_filter,
            ..Self::default()
        }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

/// Installs the global subscriber
pub fn init(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.default_filter)?,
    };

    let layer = if config.json {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_filter(env_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_filter(env_filter)
            .boxed()
    };

    tracing_subscriber::registry().with(layer).try_init()?;

    tracing::debug!(json = config.json, filter = %config.default_filter, "logging initialized");
    Ok(())
}
