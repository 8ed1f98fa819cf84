use crate::config::{Environment, LogLevel};
use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt,
};

/// Initialize tracing subscriber with pretty formatting for development
/// and JSON formatting for production. Logs go to stderr.
///
/// `RUST_LOG` wins over `log_level` when it is set.
///
/// Also adds an OpenTelemetry layer that exports traces if a global tracer provider
/// has been initialized (e.g. via `TelemetryGuard::init`).
pub fn setup_logging(log_level: LogLevel, environment: Environment) {
    let registry = tracing_subscriber::registry()
        .with(env_filter(log_level))
        .with(tracing_opentelemetry::layer());

    install_fmt_layer(registry, environment);
}

pub(crate) fn env_filter(log_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.as_str()))
}

pub(crate) fn install_fmt_layer<S>(subscriber: S, environment: Environment)
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a> + Send + Sync + 'static,
{
    match environment {
        Environment::Production => {
            subscriber
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_level(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        Environment::Development => {
            subscriber
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_ansi(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
}
