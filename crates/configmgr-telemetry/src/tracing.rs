//! OTLP trace export.
//!
//! Builds an OpenTelemetry `TracerProvider` with a batch OTLP/gRPC exporter.
//! The provider is returned to the caller (and held by
//! [`TelemetryGuard`](crate::TelemetryGuard)) instead of living only in a
//! global, so shutdown flushes exactly what this process created.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, TracerProvider};
use opentelemetry_sdk::Resource;

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Whether to export spans.
    pub enabled: bool,

    /// OTLP gRPC endpoint, e.g. `http://localhost:4317`.
    pub otlp_endpoint: String,

    /// `service.name` resource attribute.
    pub service_name: String,

    /// `service.version` resource attribute.
    pub service_version: String,

    /// `deployment.environment` resource attribute.
    pub environment: String,

    /// Fraction of traces sampled, clamped to `0.0..=1.0`.
    pub sample_ratio: f64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            service_name: "configmgr".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            sample_ratio: 1.0,
        }
    }
}

impl TracingConfig {
    /// Maps the ratio to a sampler.
    #[must_use]
    pub fn sampler(&self) -> Sampler {
        if self.sample_ratio >= 1.0 {
            Sampler::AlwaysOn
        } else if self.sample_ratio <= 0.0 {
            Sampler::AlwaysOff
        } else {
            Sampler::TraceIdRatioBased(self.sample_ratio)
        }
    }
}

/// Builds and globally registers the tracer provider.
///
/// Returns `None` when tracing is disabled.
///
/// # Errors
///
/// Returns [`TelemetryError::TracingInit`] if the exporter cannot be built.
pub fn init_tracing(config: &TracingConfig) -> TelemetryResult<Option<TracerProvider>> {
    if !config.enabled {
        return Ok(None);
    }

    let resource = Resource::new([
        KeyValue::new(
            opentelemetry_semantic_conventions::attribute::SERVICE_NAME,
            config.service_name.clone(),
        ),
        KeyValue::new(
            opentelemetry_semantic_conventions::attribute::SERVICE_VERSION,
            config.service_version.clone(),
        ),
        KeyValue::new("deployment.environment", config.environment.clone()),
    ]);

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()
        .map_err(|e| TelemetryError::TracingInit(e.to_string()))?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_sampler(config.sampler())
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .build();

    global::set_tracer_provider(provider.clone());
    ::tracing::info!(endpoint = %config.otlp_endpoint, ratio = config.sample_ratio, "trace export enabled");

    Ok(Some(provider))
}
