// SPDX-License-Identifier: MIT OR Apache-2.0
//! Resource URI templates such as `users://{user_id}/profile`.

use crate::error::{Result, ServerError};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A parsed URI template with `{name}` placeholders.
///
/// Each placeholder matches one non-empty run of characters without `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl UriTemplate {
    /// Parse a template.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| ServerError::InvalidTemplate {
            template: raw.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut rest = raw;
        while !rest.is_empty() {
            match rest.find('{') {
                Some(0) => {
                    let close = rest.find('}').ok_or_else(|| invalid("unclosed '{'"))?;
                    let name = &rest[1..close];
                    if name.is_empty() || name.contains('{') {
                        return Err(invalid("placeholder names must be non-empty"));
                    }
                    if matches!(segments.last(), Some(Segment::Variable(_))) {
                        return Err(invalid("adjacent placeholders are ambiguous"));
                    }
                    segments.push(Segment::Variable(name.to_string()));
                    rest = &rest[close + 1..];
                }
                Some(open) => {
                    segments.push(Segment::Literal(rest[..open].to_string()));
                    rest = &rest[open..];
                }
                None => {
                    segments.push(Segment::Literal(rest.to_string()));
                    rest = "";
                }
            }
        }

        if segments
            .iter()
            .any(|s| matches!(s, Segment::Literal(l) if l.contains('}')))
        {
            return Err(invalid("unbalanced '}'"));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The template as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in order of appearance.
    pub fn variables(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Variable(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Match `uri` and return the bound placeholder values.
    pub fn match_uri(&self, uri: &str) -> Option<BTreeMap<String, String>> {
        let mut params = BTreeMap::new();
        let mut pos = 0;
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(lit) => {
                    if !uri[pos..].starts_with(lit.as_str()) {
                        return None;
                    }
                    pos += lit.len();
                }
                Segment::Variable(name) => {
                    let end = match self.segments.get(i + 1) {
                        Some(Segment::Literal(next)) => pos + uri[pos..].find(next.as_str())?,
                        _ => uri.len(),
                    };
                    let value = &uri[pos..end];
                    if value.is_empty() || value.contains('/') {
                        return None;
                    }
                    params.insert(name.clone(), value.to_string());
                    pos = end;
                }
            }
        }
        (pos == uri.len()).then_some(params)
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
