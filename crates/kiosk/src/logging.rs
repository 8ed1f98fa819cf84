use crate::config::Settings;
use common::TelemetryGuard;

pub const SERVICE_NAME: &str = "kiosk";

/// Export traces and metrics over OTLP when an endpoint is configured,
/// otherwise log locally only. Keep the guard alive until exit.
pub fn init_observability(settings: &Settings) -> anyhow::Result<Option<TelemetryGuard>> {
    match &settings.otel_endpoint {
        Some(endpoint) => {
            let guard = TelemetryGuard::init(
                SERVICE_NAME,
                endpoint,
                settings.environment,
                settings.log_level,
            )?;
            Ok(Some(guard))
        }
        None => {
            common::setup_logging(settings.log_level, settings.environment);
            Ok(None)
        }
    }
}
