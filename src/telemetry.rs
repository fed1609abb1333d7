use tracing::Subscriber;
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::error::TelemetryError;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
}

/// Plain-text layer writing records at `level` and above to a daily rolling file.
fn file_layer<S>(log_dir: &str, file_name: &str, level: LevelFilter) -> impl Layer<S> + Send + Sync + 'static
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_writer(tracing_appender::rolling::daily(log_dir, file_name))
        .with_ansi(false)
        .with_filter(level)
}

/// Initialize console logging plus daily rolling files split by level.
///
/// Files are created as `{log_dir}/info.log.2025-01-01`,
/// `{log_dir}/error.log.2025-01-01`, and so on. `RUST_LOG` overrides the
/// default `info` filter.
pub fn init(log_dir: &str) -> Result<(), TelemetryError> {
    std::fs::create_dir_all(log_dir).map_err(|source| TelemetryError::LogDir {
        path: log_dir.to_string(),
        source,
    })?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(console_layer)
        .with(file_layer(log_dir, "info.log", LevelFilter::INFO))
        .with(file_layer(log_dir, "warn.log", LevelFilter::WARN))
        .with(file_layer(log_dir, "error.log", LevelFilter::ERROR))
        .with(file_layer(log_dir, "debug.log", LevelFilter::DEBUG))
        .try_init()?;
    Ok(())
}

/// Console-only logging on stderr for one-shot commands, keeping stdout for
/// command output.
pub fn init_console() -> Result<(), TelemetryError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}
