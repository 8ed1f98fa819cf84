use crate::config::{Environment, LogLevel};
use crate::logging::{env_filter, install_fmt_layer};
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
    propagation::TraceContextPropagator,
    trace::{Sampler, SdkTracerProvider},
};
use opentelemetry_semantic_conventions::attribute::{SERVICE_NAME, SERVICE_VERSION};
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;

const METRIC_EXPORT_INTERVAL: Duration = Duration::from_secs(10);
const DEPLOYMENT_ENVIRONMENT: &str = "deployment.environment";

/// Keeps OTLP trace and metric export running until dropped.
///
/// `init` installs the global tracing subscriber too, so a process calls
/// either this or [`crate::setup_logging`].
///
/// ```ignore
/// let _telemetry = TelemetryGuard::init("kiosk", "http://localhost:4317", Environment::Production, LogLevel::Info)?;
/// ```
pub struct TelemetryGuard {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl TelemetryGuard {
    /// Export spans and metrics to the collector at `endpoint` over gRPC.
    /// Must run inside a Tokio runtime.
    pub fn init(
        service_name: &str,
        endpoint: &str,
        environment: Environment,
        log_level: LogLevel,
    ) -> anyhow::Result<Self> {
        global::set_text_map_propagator(TraceContextPropagator::new());

        let resource = service_resource(service_name, environment);
        let tracer_provider = tracer_provider(endpoint, resource.clone())?;
        let meter_provider = meter_provider(endpoint, resource)?;

        global::set_tracer_provider(tracer_provider.clone());
        global::set_meter_provider(meter_provider.clone());

        let subscriber = tracing_subscriber::registry()
            .with(env_filter(log_level))
            .with(
                tracing_opentelemetry::layer()
                    .with_tracer(global::tracer(service_name.to_string())),
            );
        install_fmt_layer(subscriber, environment);

        Ok(Self {
            tracer_provider,
            meter_provider,
        })
    }
}

fn service_resource(service_name: &str, environment: Environment) -> Resource {
    Resource::builder()
        .with_attributes([
            KeyValue::new(SERVICE_NAME, service_name.to_string()),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
            KeyValue::new(DEPLOYMENT_ENVIRONMENT, environment.as_str()),
        ])
        .build()
}

fn tracer_provider(endpoint: &str, resource: Resource) -> anyhow::Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
        .with_batch_exporter(exporter)
        .build())
}

fn meter_provider(endpoint: &str, resource: Resource) -> anyhow::Result<SdkMeterProvider> {
    let exporter = MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let reader = PeriodicReader::builder(exporter)
        .with_interval(METRIC_EXPORT_INTERVAL)
        .build();

    Ok(SdkMeterProvider::builder()
        .with_resource(resource)
        .with_reader(reader)
        .build())
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Err(e) = self.tracer_provider.shutdown() {
            warn!(error = ?e, "Tracer provider shutdown failed");
        }
        if let Err(e) = self.meter_provider.shutdown() {
            warn!(error = ?e, "Meter provider shutdown failed");
        }
    }
}
