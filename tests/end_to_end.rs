// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end scenarios: drive the mock server through the traced client and
//! assert on the telemetry captured by a per-test harness.

use mcpobs_mock_server::traced::{METHOD_NAME, OPERATION_COUNT, OPERATION_DURATION, TOOL_NAME};
use mcpobs_mock_server::{Arguments, Content, TracedClient, create_default_server};
use mcpobs_telemetry::{TelemetryHarness, init_test_logging};
use opentelemetry::trace::SpanKind;
use serde_json::{Value, json};
use serial_test::serial;

fn args(value: Value) -> Arguments {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
#[serial]
fn greet_is_traced_and_isolated_from_the_next_setup() {
    init_test_logging();
    let harness = TelemetryHarness::start().unwrap();
    let server = create_default_server().unwrap();

    let out = TracedClient::new(&server)
        .call_tool("greet", &args(json!({"name": "World"})))
        .unwrap();
    assert_eq!(out.as_text(), Some("Hello, World!"));

    let span = harness.find_span("greet").unwrap();
    assert!(span.is_some());
    assert_eq!(
        span.unwrap().attribute_str(TOOL_NAME).as_deref(),
        Some("greet")
    );

    assert!(harness.metrics().find_metric(OPERATION_COUNT).unwrap().is_some());

    harness.teardown();
    harness.setup().unwrap();
    assert!(harness.find_span("greet").unwrap().is_none());
    assert!(harness.metrics().find_metric(OPERATION_COUNT).unwrap().is_none());
    harness.teardown();
}

#[test]
#[serial]
fn greet_produces_an_internal_span() {
    let harness = TelemetryHarness::start().unwrap();
    let server = create_default_server().unwrap();
    TracedClient::new(&server)
        .call_tool("greet", &args(json!({"name": "World"})))
        .unwrap();

    let span = harness
        .find_span_with_kind("greet", SpanKind::Internal)
        .unwrap()
        .unwrap();
    assert!(span.name.starts_with("greet"));
    assert!(harness.find_span("nonexistent").unwrap().is_none());
    assert!(
        harness
            .find_span_with_kind("greet", SpanKind::Server)
            .unwrap()
            .is_none()
    );
    harness.teardown();
}

#[test]
#[serial]
fn version_resource_is_read() {
    let harness = TelemetryHarness::start().unwrap();
    let server = create_default_server().unwrap();
    let out = TracedClient::new(&server)
        .read_resource("config://version")
        .unwrap();
    assert_eq!(out.as_text(), Some("2.0.1"));
    assert!(harness.find_span("config://version").unwrap().is_some());
    harness.teardown();
}

#[test]
#[serial]
fn templated_resource_span_matches_by_prefix() {
    let harness = TelemetryHarness::start().unwrap();
    let server = create_default_server().unwrap();
    let out = TracedClient::new(&server)
        .read_resource("users://7/profile")
        .unwrap();
    assert_eq!(
        out.as_json(),
        Some(&json!({"name": "User 7", "status": "active"}))
    );

    let span = harness.find_span("users://").unwrap().unwrap();
    assert_eq!(span.name, "users://7/profile");
    harness.teardown();
}

#[test]
#[serial]
fn image_and_prompt_calls_are_traced() {
    let harness = TelemetryHarness::start().unwrap();
    let server = create_default_server().unwrap();
    let client = TracedClient::new(&server);

    let image = client.call_tool("get_image", &Arguments::new()).unwrap();
    assert!(matches!(image, Content::Image { .. }));
    let messages = client
        .get_prompt("summarize_request", &args(json!({"text": "hello"})))
        .unwrap();
    assert!(messages[0].content.ends_with("hello"));

    let names: Vec<String> = harness
        .finished_spans()
        .unwrap()
        .into_iter()
        .filter(|s| s.kind == SpanKind::Client)
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["get_image", "summarize_request"]);
    harness.teardown();
}

#[test]
#[serial]
fn client_metrics_are_recorded_per_method() {
    let harness = TelemetryHarness::start().unwrap();
    let server = create_default_server().unwrap();
    let client = TracedClient::new(&server);
    client
        .call_tool("greet", &args(json!({"name": "a"})))
        .unwrap();
    client
        .call_tool("greet", &args(json!({"name": "b"})))
        .unwrap();
    client.read_resource("config://version").unwrap();

    let count = harness
        .metrics()
        .find_metric(OPERATION_COUNT)
        .unwrap()
        .unwrap();
    assert_eq!(count.total(), 3.0);
    let tool_points = count.points_with(METHOD_NAME, "tools/call");
    assert_eq!(tool_points.len(), 1);

    let duration = harness
        .metrics()
        .find_metric(OPERATION_DURATION)
        .unwrap()
        .unwrap();
    assert_eq!(duration.unit, "s");
    assert_eq!(duration.histogram_count(), 3);
    harness.teardown();
}
