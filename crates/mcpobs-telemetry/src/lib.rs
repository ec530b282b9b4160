// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! mcpobs-telemetry
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Isolated OpenTelemetry providers for instrumentation tests.
//!
//! Each test builds a [`TelemetryHarness`], which owns an in-memory
//! [`SpanSink`] and [`MetricsSink`] plus a tracer and meter provider wired to
//! them. [`TelemetryHarness::setup`] resets the process-wide provider slots
//! and installs the harness's providers, so anything that records through
//! [`opentelemetry::global`] lands in this test's sinks and nowhere else.
//!
//! ```no_run
//! use mcpobs_telemetry::TelemetryHarness;
//! use opentelemetry::trace::{Span, Tracer};
//!
//! let harness = TelemetryHarness::start()?;
//! opentelemetry::global::tracer("demo").start("work").end();
//! assert!(harness.finished_spans()?.iter().any(|s| s.name == "work"));
//! harness.teardown();
//! # Ok::<(), mcpobs_telemetry::HarnessError>(())
//! ```

/// Harness configuration.
pub mod config;
/// Harness error type.
pub mod error;
/// Global provider slots and their reset protocol.
pub mod globals;
/// Per-test lifecycle controller.
pub mod harness;
/// Test log output.
pub mod logging;
/// Span lookup helpers.
pub mod lookup;
/// One-shot install guard.
pub mod once;
/// Provider assembly.
pub mod provider;
/// In-memory span and metric sinks.
pub mod sink;

pub use config::{DEFAULT_SERVICE_NAME, HarnessConfig};
pub use error::{HarnessError, Result};
pub use globals::{
    GlobalsReset, SlotSwapReset, installed_meter_provider, installed_tracer_provider,
    meter_provider_installed, reset_metrics_globals, reset_strategy, reset_trace_globals,
    set_meter_provider, set_tracer_provider, tracer_provider_installed,
};
#[cfg(feature = "noop-globals")]
pub use globals::NoopGlobalsReset;
pub use harness::{HarnessGuard, TelemetryHarness};
pub use logging::init_test_logging;
pub use lookup::{find_exact, find_span};
pub use once::SetOnce;
pub use provider::{Providers, assemble_meter_provider, assemble_tracer_provider, build_resource};
pub use sink::{CapturedSpan, MetricPoint, MetricSnapshot, MetricValue, MetricsSink, SpanSink};
