// SPDX-License-Identifier: MIT OR Apache-2.0
//! Span lookup over captured spans.
//!
//! Instrumented span names may carry a dynamic suffix such as a resource URI,
//! so lookups try an exact name first and then fall back to a prefix match.

use crate::sink::CapturedSpan;
use opentelemetry::trace::SpanKind;

/// Find the span of `kind` named `name`.
///
/// An exact name match always wins. Otherwise the first span (in capture
/// order) whose name starts with `name` is returned. Spans of any other kind
/// are ignored.
pub fn find_span<'a>(
    spans: &'a [CapturedSpan],
    name: &str,
    kind: &SpanKind,
) -> Option<&'a CapturedSpan> {
    find_exact(spans, name, kind).or_else(|| {
        spans
            .iter()
            .filter(|s| &s.kind == kind)
            .find(|s| s.name.starts_with(name))
    })
}

/// Find the span of `kind` whose name equals `name`, without prefix fallback.
pub fn find_exact<'a>(
    spans: &'a [CapturedSpan],
    name: &str,
    kind: &SpanKind,
) -> Option<&'a CapturedSpan> {
    spans.iter().filter(|s| &s.kind == kind).find(|s| s.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{SpanId, Status};
    use std::collections::BTreeMap;
    use std::time::SystemTime;

    fn span(name: &str, kind: SpanKind, id: u64) -> CapturedSpan {
        CapturedSpan {
            name: name.to_string(),
            kind,
            attributes: BTreeMap::new(),
            start_time: SystemTime::UNIX_EPOCH,
            end_time: SystemTime::UNIX_EPOCH,
            status: Status::Unset,
            scope: "test".to_string(),
            span_id: SpanId::from(id),
            parent_span_id: None,
        }
    }

    #[test]
    fn exact_match_is_found() {
        let spans = vec![span("greet", SpanKind::Client, 1)];
        let found = find_span(&spans, "greet", &SpanKind::Client).unwrap();
        assert_eq!(found.span_id, SpanId::from(1));
    }

    #[test]
    fn exact_beats_earlier_prefix() {
        let spans = vec![
            span("greeting", SpanKind::Client, 1),
            span("greet", SpanKind::Client, 2),
        ];
        let found = find_span(&spans, "greet", &SpanKind::Client).unwrap();
        assert_eq!(found.span_id, SpanId::from(2));
    }

    #[test]
    fn first_prefix_match_wins() {
        let spans = vec![
            span("users://1/profile", SpanKind::Client, 1),
            span("users://2/profile", SpanKind::Client, 2),
        ];
        let found = find_span(&spans, "users://", &SpanKind::Client).unwrap();
        assert_eq!(found.span_id, SpanId::from(1));
    }

    #[test]
    fn kind_filter_hides_other_kinds() {
        let spans = vec![span("greet", SpanKind::Internal, 1)];
        assert!(find_span(&spans, "greet", &SpanKind::Client).is_none());
        assert!(find_span(&spans, "greet", &SpanKind::Internal).is_some());
    }

    #[test]
    fn missing_name_is_not_found() {
        let spans = vec![span("greet", SpanKind::Client, 1)];
        assert!(find_span(&spans, "nonexistent", &SpanKind::Client).is_none());
        assert!(find_span(&[], "greet", &SpanKind::Client).is_none());
    }

    #[test]
    fn exact_lookup_ignores_prefixes() {
        let spans = vec![span("config://version", SpanKind::Client, 1)];
        assert!(find_exact(&spans, "config://", &SpanKind::Client).is_none());
        assert!(find_span(&spans, "config://", &SpanKind::Client).is_some());
    }
}
