// SPDX-License-Identifier: MIT OR Apache-2.0
//! Isolation guarantees of the global provider reset protocol across
//! consecutive tests.

use mcpobs_mock_server::{Arguments, TracedClient, create_default_server};
use mcpobs_telemetry::{
    HarnessConfig, HarnessError, TelemetryHarness, installed_meter_provider,
    installed_tracer_provider, meter_provider_installed, reset_metrics_globals,
    reset_trace_globals, set_tracer_provider, tracer_provider_installed,
};
use opentelemetry::global;
use opentelemetry::trace::{Span, Tracer};
use serde_json::json;
use serial_test::serial;

fn greet(name: &str) {
    let server = create_default_server().unwrap();
    let mut args = Arguments::new();
    args.insert("name".into(), json!(name));
    TracedClient::new(&server).call_tool("greet", &args).unwrap();
}

#[test]
#[serial]
fn spans_from_one_harness_never_reach_the_next() {
    let first = TelemetryHarness::start().unwrap();
    greet("first");
    assert!(first.find_span("greet").unwrap().is_some());
    first.teardown();

    let second = TelemetryHarness::start().unwrap();
    assert!(second.finished_spans().unwrap().is_empty());
    greet("second");
    assert_eq!(second.spans().len().unwrap(), 2);
    // The first harness's provider is no longer installed.
    assert_eq!(first.spans().len().unwrap(), 2);
    second.teardown();
}

#[test]
#[serial]
fn second_setup_replaces_the_first_harness() {
    let first = TelemetryHarness::start().unwrap();
    let second = TelemetryHarness::start().unwrap();
    global::tracer("isolation").start("after-second").end();

    assert!(first.finished_spans().unwrap().is_empty());
    assert_eq!(second.finished_spans().unwrap().len(), 1);
    second.teardown();
}

#[test]
#[serial]
fn teardown_leaves_nothing_installed() {
    let harness = TelemetryHarness::start().unwrap();
    harness.teardown();
    assert!(!tracer_provider_installed());
    assert!(!meter_provider_installed());
    assert!(installed_tracer_provider().is_none());
    assert!(installed_meter_provider().is_none());

    global::tracer("isolation").start("orphan").end();
    assert!(harness.finished_spans().unwrap().is_empty());
}

#[test]
#[serial]
fn install_without_reset_is_reported() {
    let harness = TelemetryHarness::new(HarnessConfig::default()).unwrap();
    reset_trace_globals();
    reset_metrics_globals();
    assert!(set_tracer_provider(harness.providers().tracer.clone()));
    // setup resets first, so it still succeeds.
    harness.setup().unwrap();
    assert!(!set_tracer_provider(harness.providers().tracer.clone()));
    harness.teardown();
}

#[test]
#[serial]
fn custom_service_name_reaches_the_provider() {
    let config = HarnessConfig::from_toml_str("service_name = \"gateway\"").unwrap();
    let harness = TelemetryHarness::new(config).unwrap();
    harness.setup().unwrap();
    assert_eq!(harness.config().service_name, "gateway");
    harness.teardown();
}

#[test]
fn broken_config_fails_loudly() {
    let err = HarnessConfig::from_toml_str("service_name = 5").unwrap_err();
    assert!(matches!(err, HarnessError::ConfigParse { .. }));
}
