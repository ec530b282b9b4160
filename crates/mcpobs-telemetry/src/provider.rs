// SPDX-License-Identifier: MIT OR Apache-2.0
//! Assembly of per-test tracer and meter providers bound to capture sinks.

use crate::config::HarnessConfig;
use crate::error::Result;
use crate::sink::{MetricsSink, SpanSink};
use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::SdkTracerProvider;

/// Resource carrying the configured service identity.
pub fn build_resource(config: &HarnessConfig) -> Resource {
    Resource::builder_empty()
        .with_service_name(config.service_name.clone())
        .with_attributes(
            config
                .resource_attributes
                .iter()
                .map(|(k, v)| KeyValue::new(k.clone(), v.clone())),
        )
        .build()
}

/// Tracer provider that delivers every finished span to `sink` before
/// `end()` returns.
pub fn assemble_tracer_provider(config: &HarnessConfig, sink: &SpanSink) -> SdkTracerProvider {
    SdkTracerProvider::builder()
        .with_resource(build_resource(config))
        .with_simple_exporter(sink.exporter())
        .build()
}

/// Meter provider read by `sink`. The sink is attached to the returned
/// provider and cannot be attached again.
pub fn assemble_meter_provider(
    config: &HarnessConfig,
    sink: &MetricsSink,
) -> Result<SdkMeterProvider> {
    let reader = PeriodicReader::builder(sink.exporter()).build();
    let provider = SdkMeterProvider::builder()
        .with_resource(build_resource(config))
        .with_reader(reader)
        .build();
    sink.attach(&provider)?;
    Ok(provider)
}

/// The tracer and meter provider pair owned by one test.
#[derive(Debug, Clone)]
pub struct Providers {
    /// Tracer provider feeding the span sink.
    pub tracer: SdkTracerProvider,
    /// Meter provider read by the metrics sink.
    pub meter: SdkMeterProvider,
}

impl Providers {
    /// Assemble both providers.
    pub fn assemble(
        config: &HarnessConfig,
        spans: &SpanSink,
        metrics: &MetricsSink,
    ) -> Result<Self> {
        Ok(Self {
            tracer: assemble_tracer_provider(config, spans),
            meter: assemble_meter_provider(config, metrics)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;

    fn resource_value(resource: &Resource, key: &str) -> Option<String> {
        resource
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v.to_string())
    }

    #[test]
    fn resource_carries_service_name() {
        let resource = build_resource(&HarnessConfig::default());
        assert_eq!(
            resource_value(&resource, "service.name").as_deref(),
            Some("mcp")
        );
    }

    #[test]
    fn resource_carries_extra_attributes() {
        let config = HarnessConfig::default().with_resource_attribute("deployment.environment", "ci");
        let resource = build_resource(&config);
        assert_eq!(
            resource_value(&resource, "deployment.environment").as_deref(),
            Some("ci")
        );
    }

    #[test]
    fn metrics_sink_binds_to_first_provider_only() {
        let config = HarnessConfig::default();
        let sink = MetricsSink::new();
        assemble_meter_provider(&config, &sink).unwrap();
        assert!(matches!(
            assemble_meter_provider(&config, &sink),
            Err(HarnessError::SinkAlreadyAttached)
        ));
    }
}
