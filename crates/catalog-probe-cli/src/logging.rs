//! tracing-subscriber setup

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::commands::LogFormat;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// Filter from `RUST_LOG`, falling back to the verbosity's level
#[must_use]
pub fn env_filter(config: &CliConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_directive()))
}

/// Install the global subscriber. Logs go to stderr; stdout carries results.
pub fn init(config: &CliConfig) -> CliResult<()> {
    let registry = tracing_subscriber::registry().with(env_filter(config));
    let installed = match config.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(config.color.should_color()),
            )
            .try_init(),
    };
    installed.map_err(|e| CliError::config(format!("logging: {e}")))
}
