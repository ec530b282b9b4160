// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-test lifecycle: reset the globals, install fresh providers, tear down.

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::globals::{
    reset_metrics_globals, reset_trace_globals, set_meter_provider, set_tracer_provider,
};
use crate::provider::Providers;
use crate::sink::{CapturedSpan, MetricSnapshot, MetricsSink, SpanSink};
use opentelemetry::trace::{SpanKind, TracerProvider as _};
use opentelemetry_sdk::trace::SdkTracer;
use std::ops::Deref;
use tracing::debug;

// ---------------------------------------------------------------------------
// TelemetryHarness
// ---------------------------------------------------------------------------

/// Sinks and providers owned by a single test.
///
/// Build one per test, call [`setup`](Self::setup) before exercising the code
/// under test, and [`teardown`](Self::teardown) (or use
/// [`setup_guarded`](Self::setup_guarded)) when done. Tests that use a
/// harness share process-wide state and must not run concurrently.
#[derive(Debug)]
pub struct TelemetryHarness {
    config: HarnessConfig,
    spans: SpanSink,
    metrics: MetricsSink,
    providers: Providers,
}

impl TelemetryHarness {
    /// Assemble sinks and providers without touching the globals.
    pub fn new(config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        let spans = SpanSink::new();
        let metrics = MetricsSink::new();
        let providers = Providers::assemble(&config, &spans, &metrics)?;
        Ok(Self {
            config,
            spans,
            metrics,
            providers,
        })
    }

    /// Assemble with [`HarnessConfig::default`] and run [`setup`](Self::setup).
    pub fn start() -> Result<Self> {
        let harness = Self::new(HarnessConfig::default())?;
        harness.setup()?;
        Ok(harness)
    }

    /// Clear the sinks, reset both global slots, and install this harness's
    /// providers.
    ///
    /// Safe to call repeatedly: each call leaves exactly one tracer provider
    /// and one meter provider installed.
    pub fn setup(&self) -> Result<()> {
        self.spans.clear();
        self.metrics.clear()?;

        reset_trace_globals();
        if !set_tracer_provider(self.providers.tracer.clone()) {
            return Err(HarnessError::InstallRejected { signal: "tracer" });
        }
        reset_metrics_globals();
        if !set_meter_provider(self.providers.meter.clone()) {
            return Err(HarnessError::InstallRejected { signal: "meter" });
        }

        debug!(service = %self.config.service_name, "telemetry harness installed");
        Ok(())
    }

    /// Reset both global slots, leaving no provider installed.
    pub fn teardown(&self) {
        reset_trace_globals();
        reset_metrics_globals();
        debug!("telemetry harness torn down");
    }

    /// Run [`setup`](Self::setup) and return a guard that tears down on drop.
    pub fn setup_guarded(&self) -> Result<HarnessGuard<'_>> {
        self.setup()?;
        Ok(HarnessGuard { harness: self })
    }

    /// The configuration the providers were assembled from.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Span sink fed by this harness's tracer provider.
    pub fn spans(&self) -> &SpanSink {
        &self.spans
    }

    /// Metrics sink bound to this harness's meter provider.
    pub fn metrics(&self) -> &MetricsSink {
        &self.metrics
    }

    /// The assembled providers.
    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    /// A tracer from this harness's provider, under the configured scope.
    pub fn tracer(&self) -> SdkTracer {
        self.providers.tracer.tracer(self.config.tracer_scope.clone())
    }

    /// Snapshot of the spans finished since the last setup.
    pub fn finished_spans(&self) -> Result<Vec<CapturedSpan>> {
        self.spans.get_finished_spans()
    }

    /// Find a client span by exact name or prefix.
    pub fn find_span(&self, name: &str) -> Result<Option<CapturedSpan>> {
        self.spans.find(name)
    }

    /// Find a span of `kind` by exact name or prefix.
    pub fn find_span_with_kind(&self, name: &str, kind: SpanKind) -> Result<Option<CapturedSpan>> {
        self.spans.find_with_kind(name, kind)
    }

    /// Flush and return the metrics recorded since the last setup.
    pub fn collect_metrics(&self) -> Result<Vec<MetricSnapshot>> {
        self.metrics.collect()
    }
}

// ---------------------------------------------------------------------------
// HarnessGuard
// ---------------------------------------------------------------------------

/// Tears the harness down when dropped.
#[derive(Debug)]
pub struct HarnessGuard<'a> {
    harness: &'a TelemetryHarness,
}

impl Deref for HarnessGuard<'_> {
    type Target = TelemetryHarness;

    fn deref(&self) -> &Self::Target {
        self.harness
    }
}

impl Drop for HarnessGuard<'_> {
    fn drop(&mut self) {
        self.harness.teardown();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::globals::{
        installed_meter_provider, installed_tracer_provider, meter_provider_installed,
        tracer_provider_installed,
    };
    use opentelemetry::global;
    use opentelemetry::trace::{Span as _, Tracer as _};
    use serial_test::serial;

    #[test]
    #[serial]
    fn setup_installs_both_providers() {
        let harness = TelemetryHarness::start().unwrap();
        assert!(tracer_provider_installed());
        assert!(meter_provider_installed());
        harness.teardown();
        assert!(!tracer_provider_installed());
        assert!(!meter_provider_installed());
    }

    #[test]
    #[serial]
    fn global_tracer_reaches_the_sink() {
        let harness = TelemetryHarness::start().unwrap();
        global::tracer("harness-test").start("via-global").end();
        let span = harness
            .find_span_with_kind("via-global", SpanKind::Internal)
            .unwrap()
            .unwrap();
        assert_eq!(span.scope, "harness-test");
        harness.teardown();
    }

    #[test]
    #[serial]
    fn setup_twice_keeps_a_single_provider() {
        let harness = TelemetryHarness::new(HarnessConfig::default()).unwrap();
        harness.setup().unwrap();
        harness.setup().unwrap();
        assert!(installed_tracer_provider().is_some());
        assert!(installed_meter_provider().is_some());

        global::tracer("harness-test").start("once").end();
        assert_eq!(harness.finished_spans().unwrap().len(), 1);
        harness.teardown();
    }

    #[test]
    #[serial]
    fn setup_clears_previous_spans() {
        let harness = TelemetryHarness::start().unwrap();
        harness.tracer().start("stale").end();
        assert_eq!(harness.spans().len().unwrap(), 1);
        harness.setup().unwrap();
        assert!(harness.spans().is_empty().unwrap());
        harness.teardown();
    }

    #[test]
    #[serial]
    fn setup_after_teardown_hides_previous_metrics() {
        let harness = TelemetryHarness::start().unwrap();
        let calls = global::meter("harness-test").u64_counter("calls").build();
        calls.add(1, &[]);
        assert!(harness.metrics().find_metric("calls").unwrap().is_some());
        calls.add(1, &[]);
        harness.teardown();

        harness.setup().unwrap();
        assert!(harness.metrics().find_metric("calls").unwrap().is_none());
        assert!(harness.collect_metrics().unwrap().is_empty());

        global::meter("harness-test").u64_counter("calls").build().add(3, &[]);
        let fresh = harness.metrics().find_metric("calls").unwrap().unwrap();
        assert_eq!(fresh.total(), 3.0);
        harness.teardown();
    }

    #[test]
    #[serial]
    fn guard_tears_down_on_drop() {
        let harness = TelemetryHarness::new(HarnessConfig::default()).unwrap();
        {
            let guard = harness.setup_guarded().unwrap();
            assert_eq!(guard.config().service_name, "mcp");
            assert!(tracer_provider_installed());
        }
        assert!(!tracer_provider_installed());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = TelemetryHarness::new(HarnessConfig::default().with_service_name("")).unwrap_err();
        assert!(matches!(err, HarnessError::ConfigInvalid { .. }));
    }
}
