//! Route matching logic.
//!
//! # Responsibilities
//! - Split and decode the request path
//! - Scan same-length candidates in specificity order
//! - Capture parameter values for the first full match
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Linear scan over candidates; route counts are small enough that a trie
//!   buys nothing measurable
//! - A path that exists under another method is reported separately from a
//!   plain miss, even though the pipeline currently answers both with 404

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::Method;

use crate::routing::pattern::Segment;
use crate::routing::table::{RouteBinding, RouteTable};

/// Raw captured parameter values keyed by parameter name.
pub type RawParams = BTreeMap<String, String>;

/// Outcome of matching a request against the table.
#[derive(Debug, Clone)]
pub enum RouteMatch {
    Matched {
        binding: Arc<RouteBinding>,
        raw_params: RawParams,
    },
    /// The path matches a pattern registered only for other methods.
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

impl RouteMatch {
    pub fn is_matched(&self) -> bool {
        matches!(self, RouteMatch::Matched { .. })
    }
}

/// Split a request path into decoded segments.
///
/// The trailing slash is ignored; `/` yields no segments.
pub fn split_path(path: &str) -> Vec<Cow<'_, str>> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .split('/')
        .map(|raw| urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw)))
        .collect()
}

/// Try a single pattern against pre-split segments.
fn try_match(binding: &RouteBinding, segments: &[Cow<'_, str>]) -> Option<RawParams> {
    if binding.pattern.len() != segments.len() {
        return None;
    }
    let mut params = RawParams::new();
    for (expected, actual) in binding.pattern.segments().iter().zip(segments) {
        match expected {
            Segment::Literal(text) => {
                if text != actual.as_ref() {
                    return None;
                }
            }
            Segment::Param(name) => {
                if actual.is_empty() {
                    return None;
                }
                params.insert(name.clone(), actual.to_string());
            }
        }
    }
    Some(params)
}

/// Resolve `method` + `path` to a binding.
pub fn match_route(table: &RouteTable, method: &Method, path: &str) -> RouteMatch {
    let segments = split_path(path);

    for binding in table.ordered_for(method) {
        if let Some(raw_params) = try_match(binding, &segments) {
            return RouteMatch::Matched {
                binding: Arc::clone(binding),
                raw_params,
            };
        }
    }

    let mut allowed: Vec<Method> = table
        .ordered()
        .filter(|b| b.method != *method)
        .filter(|b| try_match(b, &segments).is_some())
        .map(|b| b.method.clone())
        .collect();
    if allowed.is_empty() {
        return RouteMatch::NotFound;
    }
    allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    allowed.dedup();
    RouteMatch::MethodNotAllowed { allowed }
}
