// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors raised by the harness itself.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Failures of the test harness.
///
/// None of these are expected under correct sequencing; they exist so that a
/// broken harness fails the enclosing test loudly instead of hiding
/// instrumentation bugs.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Reading finished spans out of the in-memory exporter failed.
    #[error("failed to read finished spans: {reason}")]
    SpanExport {
        /// Detail reported by the exporter.
        reason: String,
    },

    /// Collecting metrics from the attached meter provider failed.
    #[error("failed to collect metrics: {reason}")]
    MetricCollection {
        /// Detail reported by the SDK.
        reason: String,
    },

    /// The metrics sink is already bound to a meter provider.
    #[error("metrics sink is already attached to a meter provider")]
    SinkAlreadyAttached,

    /// The metrics sink was queried before any meter provider was bound to it.
    #[error("metrics sink is not attached to a meter provider")]
    SinkNotAttached,

    /// Installing a freshly assembled provider into the global slot was refused.
    #[error("global {signal} provider was already installed after reset")]
    InstallRejected {
        /// `"tracer"` or `"meter"`.
        signal: &'static str,
    },

    /// Harness configuration could not be parsed.
    #[error("failed to parse harness config: {reason}")]
    ConfigParse {
        /// Parser detail.
        reason: String,
    },

    /// Harness configuration parsed but is semantically invalid.
    #[error("invalid harness config: {reasons:?}")]
    ConfigInvalid {
        /// Individual validation failures.
        reasons: Vec<String>,
    },
}
