// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory capture sinks for spans and metrics.

use crate::error::{HarnessError, Result};
use crate::lookup::{find_exact, find_span};
use opentelemetry::trace::{SpanId, SpanKind, Status};
use opentelemetry::{KeyValue, Value};
use opentelemetry_sdk::metrics::data::{Gauge, Histogram, Metric, ResourceMetrics, Sum};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, InMemoryMetricExporterBuilder, SdkMeterProvider, Temporality};
use opentelemetry_sdk::trace::{InMemorySpanExporter, SpanData};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime};

// ---------------------------------------------------------------------------
// CapturedSpan
// ---------------------------------------------------------------------------

/// An immutable record of one completed span.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedSpan {
    /// Span name.
    pub name: String,
    /// Span kind.
    pub kind: SpanKind,
    /// Attributes keyed by attribute name.
    pub attributes: BTreeMap<String, Value>,
    /// Start timestamp.
    pub start_time: SystemTime,
    /// End timestamp.
    pub end_time: SystemTime,
    /// Final status.
    pub status: Status,
    /// Name of the instrumentation scope that produced the span.
    pub scope: String,
    /// Identifier of this span.
    pub span_id: SpanId,
    /// Identifier of the parent span, `None` for root spans.
    pub parent_span_id: Option<SpanId>,
}

impl CapturedSpan {
    /// Look up an attribute value.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Look up an attribute and render it as a string.
    pub fn attribute_str(&self, key: &str) -> Option<String> {
        self.attribute(key).map(|v| v.as_str().into_owned())
    }

    /// Wall-clock time between start and end.
    pub fn duration(&self) -> Duration {
        self.end_time
            .duration_since(self.start_time)
            .unwrap_or_default()
    }

    /// Whether the span ended with an error status.
    pub fn is_error(&self) -> bool {
        matches!(self.status, Status::Error { .. })
    }
}

impl From<SpanData> for CapturedSpan {
    fn from(span: SpanData) -> Self {
        let parent = span.parent_span_id;
        Self {
            name: span.name.into_owned(),
            kind: span.span_kind,
            attributes: span
                .attributes
                .into_iter()
                .map(|kv| (kv.key.as_str().to_string(), kv.value))
                .collect(),
            start_time: span.start_time,
            end_time: span.end_time,
            status: span.status,
            scope: span.instrumentation_scope.name().to_string(),
            span_id: span.span_context.span_id(),
            parent_span_id: (parent != SpanId::INVALID).then_some(parent),
        }
    }
}

// ---------------------------------------------------------------------------
// SpanSink
// ---------------------------------------------------------------------------

/// Retains every span exported to it until cleared.
///
/// Cloning shares the underlying storage.
#[derive(Debug, Clone, Default)]
pub struct SpanSink {
    exporter: InMemorySpanExporter,
}

impl SpanSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The exporter to hand to a span processor.
    pub fn exporter(&self) -> InMemorySpanExporter {
        self.exporter.clone()
    }

    /// Snapshot of all finished spans, in completion order.
    pub fn get_finished_spans(&self) -> Result<Vec<CapturedSpan>> {
        let spans = self
            .exporter
            .get_finished_spans()
            .map_err(|e| HarnessError::SpanExport {
                reason: e.to_string(),
            })?;
        Ok(spans.into_iter().map(CapturedSpan::from).collect())
    }

    /// Drop every captured span.
    pub fn clear(&self) {
        self.exporter.reset();
    }

    /// Number of captured spans.
    pub fn len(&self) -> Result<usize> {
        Ok(self.get_finished_spans()?.len())
    }

    /// Whether nothing has been captured.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Find a client span by exact name, falling back to a name prefix.
    pub fn find(&self, name: &str) -> Result<Option<CapturedSpan>> {
        self.find_with_kind(name, SpanKind::Client)
    }

    /// Find a span of `kind` by exact name, falling back to a name prefix.
    pub fn find_with_kind(&self, name: &str, kind: SpanKind) -> Result<Option<CapturedSpan>> {
        let spans = self.get_finished_spans()?;
        Ok(find_span(&spans, name, &kind).cloned())
    }

    /// Find a span of `kind` whose name equals `name` exactly.
    pub fn find_exact(&self, name: &str, kind: SpanKind) -> Result<Option<CapturedSpan>> {
        let spans = self.get_finished_spans()?;
        Ok(find_exact(&spans, name, &kind).cloned())
    }
}

// ---------------------------------------------------------------------------
// Metric snapshots
// ---------------------------------------------------------------------------

/// Aggregated value of one data point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricValue {
    /// Sum or gauge value.
    Number {
        /// Current value.
        value: f64,
    },
    /// Histogram summary.
    Histogram {
        /// Number of recorded measurements.
        count: u64,
        /// Sum of recorded measurements.
        sum: f64,
    },
}

/// One data point of a metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    /// Point attributes (deterministic ordering).
    pub attributes: BTreeMap<String, String>,
    /// Aggregated value.
    pub value: MetricValue,
}

/// Aggregated state of one metric at collection time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    /// Instrument name.
    pub name: String,
    /// Instrument description.
    pub description: String,
    /// Instrument unit.
    pub unit: String,
    /// Name of the meter's instrumentation scope.
    pub scope: String,
    /// Data points.
    pub points: Vec<MetricPoint>,
}

impl MetricSnapshot {
    /// Total number of histogram measurements across all points.
    pub fn histogram_count(&self) -> u64 {
        self.points
            .iter()
            .map(|p| match p.value {
                MetricValue::Histogram { count, .. } => count,
                MetricValue::Number { .. } => 0,
            })
            .sum()
    }

    /// Sum of all numeric point values.
    pub fn total(&self) -> f64 {
        self.points
            .iter()
            .map(|p| match p.value {
                MetricValue::Number { value } => value,
                MetricValue::Histogram { sum, .. } => sum,
            })
            .sum()
    }

    /// Points whose attribute `key` equals `value`.
    pub fn points_with(&self, key: &str, value: &str) -> Vec<&MetricPoint> {
        self.points
            .iter()
            .filter(|p| p.attributes.get(key).is_some_and(|v| v == value))
            .collect()
    }
}

fn attribute_map(attributes: &[KeyValue]) -> BTreeMap<String, String> {
    attributes
        .iter()
        .map(|kv| (kv.key.as_str().to_string(), kv.value.as_str().into_owned()))
        .collect()
}

/// Numeric types carried by SDK data points.
trait AsF64: Copy {
    fn as_f64(self) -> f64;
}

impl AsF64 for f64 {
    fn as_f64(self) -> f64 {
        self
    }
}

impl AsF64 for u64 {
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl AsF64 for i64 {
    fn as_f64(self) -> f64 {
        self as f64
    }
}

/// How points of the same metric and attribute set combine across batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Merge {
    /// Deltas add up.
    Add,
    /// The latest value wins.
    Replace,
}

impl From<Temporality> for Merge {
    // Up-down counters stay cumulative even under a delta exporter.
    fn from(temporality: Temporality) -> Self {
        match temporality {
            Temporality::Delta => Self::Add,
            _ => Self::Replace,
        }
    }
}

fn sum_points<T: AsF64>(sum: &Sum<T>) -> Vec<MetricPoint> {
    sum.data_points
        .iter()
        .map(|dp| MetricPoint {
            attributes: attribute_map(&dp.attributes),
            value: MetricValue::Number {
                value: dp.value.as_f64(),
            },
        })
        .collect()
}

fn gauge_points<T: AsF64>(gauge: &Gauge<T>) -> Vec<MetricPoint> {
    gauge
        .data_points
        .iter()
        .map(|dp| MetricPoint {
            attributes: attribute_map(&dp.attributes),
            value: MetricValue::Number {
                value: dp.value.as_f64(),
            },
        })
        .collect()
}

fn histogram_points<T: AsF64>(histogram: &Histogram<T>) -> Vec<MetricPoint> {
    histogram
        .data_points
        .iter()
        .map(|dp| MetricPoint {
            attributes: attribute_map(&dp.attributes),
            value: MetricValue::Histogram {
                count: dp.count,
                sum: dp.sum.as_f64(),
            },
        })
        .collect()
}

fn metric_points(metric: &Metric) -> Result<(Vec<MetricPoint>, Merge)> {
    let data = metric.data.as_any();
    let points = if let Some(sum) = data.downcast_ref::<Sum<f64>>() {
        (sum_points(sum), sum.temporality.into())
    } else if let Some(sum) = data.downcast_ref::<Sum<u64>>() {
        (sum_points(sum), sum.temporality.into())
    } else if let Some(sum) = data.downcast_ref::<Sum<i64>>() {
        (sum_points(sum), sum.temporality.into())
    } else if let Some(gauge) = data.downcast_ref::<Gauge<f64>>() {
        (gauge_points(gauge), Merge::Replace)
    } else if let Some(gauge) = data.downcast_ref::<Gauge<u64>>() {
        (gauge_points(gauge), Merge::Replace)
    } else if let Some(gauge) = data.downcast_ref::<Gauge<i64>>() {
        (gauge_points(gauge), Merge::Replace)
    } else if let Some(histogram) = data.downcast_ref::<Histogram<f64>>() {
        (histogram_points(histogram), histogram.temporality.into())
    } else if let Some(histogram) = data.downcast_ref::<Histogram<u64>>() {
        (histogram_points(histogram), histogram.temporality.into())
    } else if let Some(histogram) = data.downcast_ref::<Histogram<i64>>() {
        (histogram_points(histogram), histogram.temporality.into())
    } else {
        return Err(HarnessError::MetricCollection {
            reason: format!("metric '{}' has an unsupported aggregation", metric.name),
        });
    };
    Ok(points)
}

fn merge_point(points: &mut Vec<MetricPoint>, incoming: MetricPoint, merge: Merge) {
    let Some(index) = points
        .iter()
        .position(|p| p.attributes == incoming.attributes)
    else {
        points.push(incoming);
        return;
    };
    let existing = &mut points[index];
    match (merge, &mut existing.value, incoming.value) {
        (Merge::Add, MetricValue::Number { value }, MetricValue::Number { value: more }) => {
            *value += more;
        }
        (
            Merge::Add,
            MetricValue::Histogram { count, sum },
            MetricValue::Histogram {
                count: more_count,
                sum: more_sum,
            },
        ) => {
            *count += more_count;
            *sum += more_sum;
        }
        (_, slot, value) => *slot = value,
    }
}

/// Fold delta batches, oldest first, into one snapshot per metric.
///
/// Metrics without any data point are left out.
fn merge_batches(batches: &[ResourceMetrics]) -> Result<Vec<MetricSnapshot>> {
    let mut merged: Vec<MetricSnapshot> = Vec::new();
    for batch in batches {
        for sm in &batch.scope_metrics {
            let scope = sm.scope.name();
            for metric in &sm.metrics {
                let (points, merge) = metric_points(metric)?;
                let index = match merged
                    .iter()
                    .position(|m| m.name == metric.name && m.scope == scope)
                {
                    Some(index) => index,
                    None => {
                        merged.push(MetricSnapshot {
                            name: metric.name.to_string(),
                            description: metric.description.to_string(),
                            unit: metric.unit.to_string(),
                            scope: scope.to_string(),
                            points: Vec::new(),
                        });
                        merged.len() - 1
                    }
                };
                let snapshot = &mut merged[index];
                for point in points {
                    merge_point(&mut snapshot.points, point, merge);
                }
            }
        }
    }
    merged.retain(|m| !m.points.is_empty());
    Ok(merged)
}

// ---------------------------------------------------------------------------
// MetricsSink
// ---------------------------------------------------------------------------

/// Accumulates metrics exported by exactly one meter provider.
///
/// The exporter runs with delta temporality, so every flush hands over only
/// what was recorded since the previous one. [`collect`](Self::collect) folds
/// the retained batches together and [`clear`](Self::clear) drops them, which
/// makes measurements taken before a clear invisible afterwards.
///
/// Cloning shares both the exported batches and the provider binding.
#[derive(Clone)]
pub struct MetricsSink {
    exporter: InMemoryMetricExporter,
    provider: Arc<OnceLock<SdkMeterProvider>>,
}

impl fmt::Debug for MetricsSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsSink")
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}

impl Default for MetricsSink {
    fn default() -> Self {
        Self {
            exporter: InMemoryMetricExporterBuilder::new()
                .with_temporality(Temporality::Delta)
                .build(),
            provider: Arc::default(),
        }
    }
}

impl MetricsSink {
    /// Create an unattached sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The exporter to hand to a metric reader.
    pub fn exporter(&self) -> InMemoryMetricExporter {
        self.exporter.clone()
    }

    /// Bind the sink to the provider whose reader feeds it.
    pub fn attach(&self, provider: &SdkMeterProvider) -> Result<()> {
        self.provider
            .set(provider.clone())
            .map_err(|_| HarnessError::SinkAlreadyAttached)
    }

    /// Whether a provider is bound.
    pub fn is_attached(&self) -> bool {
        self.provider.get().is_some()
    }

    fn flush(&self) -> Result<()> {
        let provider = self.provider.get().ok_or(HarnessError::SinkNotAttached)?;
        provider
            .force_flush()
            .map_err(|e| HarnessError::MetricCollection {
                reason: e.to_string(),
            })
    }

    /// Flush the attached provider and return everything recorded since the
    /// last [`clear`](Self::clear).
    pub fn collect(&self) -> Result<Vec<MetricSnapshot>> {
        self.flush()?;
        let batches =
            self.exporter
                .get_finished_metrics()
                .map_err(|e| HarnessError::MetricCollection {
                    reason: e.to_string(),
                })?;
        merge_batches(&batches)
    }

    /// Collect and return the metric called `name`, if it was recorded.
    pub fn find_metric(&self, name: &str) -> Result<Option<MetricSnapshot>> {
        Ok(self.collect()?.into_iter().find(|m| m.name == name))
    }

    /// Drain pending measurements out of the provider and drop every batch.
    ///
    /// An unattached sink has nothing pending and is simply emptied.
    pub fn clear(&self) -> Result<()> {
        if self.is_attached() {
            self.flush()?;
        }
        self.exporter.reset();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
