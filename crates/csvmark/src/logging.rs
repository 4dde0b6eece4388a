//! Process-wide log subscriber setup.

use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LogFormat;
use crate::error::LoggingError;

/// `RUST_LOG` wins when set; otherwise `level` (falling back to `info` if it
/// doesn't parse).
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Builds the subscriber without installing it.
pub fn subscriber(level: &str, format: LogFormat) -> impl Subscriber + Send + Sync {
    let fmt_layer = match format {
        LogFormat::Pretty => fmt::layer().with_target(true).boxed(),
        LogFormat::Json => fmt::layer().json().with_current_span(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter(level))
}

/// Installs the global subscriber and routes `log` records into it.
///
/// Can only succeed once per process.
pub fn init(level: &str, format: LogFormat) -> Result<(), LoggingError> {
    tracing::subscriber::set_global_default(subscriber(level, format))?;
    tracing_log::LogTracer::init()?;
    Ok(())
}
