//  Copyright 2017 Palantir Technologies, Inc.
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

//! Duplicate span merging.
//!
//! Instrumentation frequently reports the same span more than once: a client
//! and server flushing separately, retries on the transport, or a tracer
//! recording an endpoint on one record and timing on another. Before a trace
//! can be shaped into a tree, such duplicates are collapsed into one
//! canonical record per span.
use trace_tree_types::{Endpoint, Span};

/// Collapses duplicate records in a single trace into canonical spans.
///
/// Two records are duplicates when they agree on `(trace_id, id, shared)` and
/// their local endpoints are compatible: equal, or absent on at least one
/// side. Shared spans with distinct endpoints are *not* duplicates; they are
/// separate servers answering on the same span ID and the tree builder keeps
/// them apart by endpoint.
///
/// The result preserves the arrival order of each span's first record, so
/// feeding it to the tree builder yields the same child ordering as the raw
/// input would.
pub fn merge_trace(spans: Vec<Span>) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    'spans: for span in spans {
        for canonical in &mut merged {
            if mergeable(canonical, &span) {
                *canonical = merge_pair(canonical, &span);
                continue 'spans;
            }
        }
        merged.push(span);
    }
    merged
}

fn mergeable(left: &Span, right: &Span) -> bool {
    left.trace_id() == right.trace_id()
        && left.id() == right.id()
        && left.shared() == right.shared()
        && match (left.local_endpoint(), right.local_endpoint()) {
            (Some(l), Some(r)) => l == r,
            _ => true,
        }
}

/// Merges two records of the same span into one canonical span.
///
/// `right` is the later-arriving record and wins ties. For scalar fields
/// (`name`, `kind`, `timestamp`, `duration`) the first non-absent value wins;
/// when both records carry differing values, the record with the longer
/// duration dominates. Endpoints union field-wise with more-specific values
/// overriding, tags union with non-empty values preferred, annotations union
/// as a set ordered by `(timestamp, value)`, and the `shared` and `debug`
/// flags OR together.
pub fn merge_pair(left: &Span, right: &Span) -> Span {
    // which record's scalars dominate when both are present and disagree
    let prefer_right = right.duration().unwrap_or(0) >= left.duration().unwrap_or(0);

    let mut merged = Span::builder();
    merged
        .trace_id(left.trace_id())
        .id(left.id())
        .shared(left.shared() || right.shared())
        .debug(left.debug() || right.debug());

    if let Some(parent_id) = left.parent_id().or_else(|| right.parent_id()) {
        merged.parent_id(parent_id);
    }
    if let Some(name) = dominant(left.name(), right.name(), prefer_right) {
        merged.name(name);
    }
    if let Some(kind) = dominant(left.kind(), right.kind(), prefer_right) {
        merged.kind(kind);
    }
    if let Some(timestamp) = dominant(left.timestamp(), right.timestamp(), prefer_right) {
        merged.timestamp(timestamp);
    }
    if let Some(duration) = dominant(left.duration(), right.duration(), prefer_right) {
        merged.duration(duration);
    }
    if let Some(endpoint) = union_endpoints(left.local_endpoint(), right.local_endpoint()) {
        merged.local_endpoint(endpoint);
    }
    if let Some(endpoint) = union_endpoints(left.remote_endpoint(), right.remote_endpoint()) {
        merged.remote_endpoint(endpoint);
    }

    let mut tags = left.tags().clone();
    for (key, value) in right.tags() {
        match tags.get(key) {
            // an empty late arrival never clobbers a real value
            Some(existing) if value.is_empty() && !existing.is_empty() => {}
            _ => {
                tags.insert(key.clone(), value.clone());
            }
        }
    }
    merged.tags(tags);

    let mut annotations = left.annotations().to_vec();
    annotations.extend(right.annotations().iter().cloned());
    annotations.sort();
    annotations.dedup();
    merged.annotations(annotations);

    merged.build()
}

fn dominant<T: PartialEq>(left: Option<T>, right: Option<T>, prefer_right: bool) -> Option<T> {
    match (left, right) {
        (Some(l), Some(r)) => {
            if l != r && prefer_right {
                Some(r)
            } else {
                Some(l)
            }
        }
        (Some(l), None) => Some(l),
        (None, r) => r,
    }
}

fn union_endpoints(left: Option<&Endpoint>, right: Option<&Endpoint>) -> Option<Endpoint> {
    let (left, right) = match (left, right) {
        (Some(l), Some(r)) => (l, r),
        (Some(e), None) | (None, Some(e)) => return Some(e.clone()),
        (None, None) => return None,
    };

    let mut union = Endpoint::builder();
    if let Some(name) = specific(left.service_name(), right.service_name(), |n| !n.is_empty()) {
        union.service_name(name);
    }
    if let Some(ip) = specific(left.ipv4(), right.ipv4(), |ip| !ip.is_unspecified()) {
        union.ipv4(ip);
    }
    if let Some(ip) = specific(left.ipv6(), right.ipv6(), |ip| !ip.is_unspecified()) {
        union.ipv6(ip);
    }
    if let Some(port) = specific(left.port(), right.port(), |&p| p != 0) {
        union.port(port);
    }
    Some(union.build())
}

/// Picks the more specific of two optional values; the later (`right`) wins
/// when both qualify.
fn specific<T, F>(left: Option<T>, right: Option<T>, is_specific: F) -> Option<T>
where
    F: Fn(&T) -> bool,
{
    match (left, right) {
        (_, Some(r)) if is_specific(&r) => Some(r),
        (Some(l), _) if is_specific(&l) => Some(l),
        (l, r) => r.or(l),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::Ipv4Addr;
    use trace_tree_types::{Annotation, Kind, SpanId, TraceId};

    fn base() -> trace_tree_types::span::Builder {
        let mut builder = Span::builder();
        builder.trace_id(TraceId::from(1u64)).id(SpanId::from(2));
        builder
    }

    fn endpoint(name: &str) -> Endpoint {
        let mut builder = Endpoint::builder();
        builder.service_name(name);
        builder.build()
    }

    #[test]
    fn first_value_wins_when_other_absent() {
        let left = base().name("get").timestamp(100).build();
        let right = base().duration(10).build();

        let merged = merge_pair(&left, &right);
        assert_eq!(merged.name(), Some("get"));
        assert_eq!(merged.timestamp(), Some(100));
        assert_eq!(merged.duration(), Some(10));
    }

    #[test]
    fn longer_duration_dominates_conflicts() {
        let left = base().name("long").duration(100).build();
        let right = base().name("short").duration(10).build();
        assert_eq!(merge_pair(&left, &right).name(), Some("long"));

        // durations tied: the later record wins
        let left = base().kind(Kind::Client).duration(10).build();
        let right = base().kind(Kind::Server).duration(10).build();
        assert_eq!(merge_pair(&left, &right).kind(), Some(Kind::Server));
    }

    #[test]
    fn endpoints_union_field_wise() {
        let mut l = Endpoint::builder();
        l.service_name("frontend").ipv4(Ipv4Addr::UNSPECIFIED);
        let mut r = Endpoint::builder();
        r.ipv4(Ipv4Addr::new(10, 0, 0, 1)).port(8080);

        let left = base().local_endpoint(l.build()).build();
        let right = base().local_endpoint(r.build()).build();

        // distinct concrete endpoints do not merge, so drive merge_pair directly
        let merged = merge_pair(&left, &right);
        let endpoint = merged.local_endpoint().unwrap();
        assert_eq!(endpoint.service_name(), Some("frontend"));
        assert_eq!(endpoint.ipv4(), Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(endpoint.port(), Some(8080));
    }

    #[test]
    fn tags_union_keeps_non_empty_values() {
        let left = base().tag("error", "timeout").tag("peer", "").build();
        let right = base().tag("error", "").tag("peer", "backend").build();

        let merged = merge_pair(&left, &right);
        assert_eq!(merged.tags()["error"], "timeout");
        assert_eq!(merged.tags()["peer"], "backend");
    }

    #[test]
    fn annotations_union_as_ordered_set() {
        let left = base()
            .annotation(Annotation::new(2, "ws"))
            .annotation(Annotation::new(1, "wr"))
            .build();
        let right = base().annotation(Annotation::new(2, "ws")).build();

        let merged = merge_pair(&left, &right);
        assert_eq!(
            merged.annotations(),
            &[Annotation::new(1, "wr"), Annotation::new(2, "ws")]
        );
    }

    #[test]
    fn flags_or_together() {
        let left = base().build();
        let right = base().shared(true).debug(true).build();

        let merged = merge_pair(&left, &right);
        assert!(merged.shared());
        assert!(merged.debug());
    }

    #[test]
    fn merge_is_commutative_without_conflicts() {
        let left = base().name("get").build();
        let right = base().duration(10).tag("k", "v").build();

        assert_eq!(merge_pair(&left, &right), merge_pair(&right, &left));
    }

    #[test]
    fn trace_collapses_exact_duplicates() {
        let span = base().build();
        let merged = merge_trace(vec![span.clone(), span.clone(), span.clone()]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn trace_keeps_duplicate_server_spans_apart() {
        let client = base().build();
        let foo = base().shared(true).local_endpoint(endpoint("foo")).build();
        let bar = base().shared(true).local_endpoint(endpoint("bar")).build();

        let merged = merge_trace(vec![client.clone(), foo.clone(), bar.clone()]);
        assert_eq!(merged, vec![client, foo, bar]);
    }

    #[test]
    fn trace_merges_endpointless_record_into_server() {
        let with_endpoint = base()
            .shared(true)
            .local_endpoint(endpoint("backend"))
            .build();
        let timing_only = base().shared(true).duration(25).build();

        let merged = merge_trace(vec![with_endpoint, timing_only]);
        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged[0].local_endpoint().unwrap().service_name(),
            Some("backend")
        );
        assert_eq!(merged[0].duration(), Some(25));
    }

    #[test]
    fn trace_preserves_first_arrival_order() {
        let a = base().id(SpanId::from(10)).build();
        let b = base().id(SpanId::from(11)).build();
        let merged = merge_trace(vec![a.clone(), b.clone(), a.clone()]);
        assert_eq!(merged, vec![a, b]);
    }
}
