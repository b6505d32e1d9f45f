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

//! Spans.
use crate::{Annotation, Endpoint, SpanId, TraceId};
use std::collections::HashMap;

/// How a span participated in an RPC or messaging exchange, if it did.
///
/// The kind fixes the meaning of the span's timestamp, duration, and remote
/// endpoint; a span without one is a local unit of work.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[non_exhaustive]
pub enum Kind {
    /// The caller's half of an RPC: the timestamp is when the request left,
    /// the duration is how long the caller waited, and the remote endpoint
    /// names the server.
    Client,

    /// The callee's half of an RPC: the timestamp is when the request
    /// arrived and the remote endpoint names the client.
    ///
    /// Under the B3 convention the callee reuses the caller's span ID and
    /// reports with `shared` set; its local endpoint is then what keeps it
    /// distinct from the client record and from other servers answering on
    /// the same ID.
    Server,

    /// A message handed to a broker; the duration, when present, covers
    /// delays such as batching before the send.
    Producer,

    /// A message taken from a broker; the duration, when present, covers
    /// time spent in the backlog.
    Consumer,
}

/// One span record as a collecting backend receives it.
///
/// A span is a single timed operation within a trace. What arrives on the
/// wire is not the operation itself but a *report* of it: the identifiers
/// plus whatever the flushing tracer happened to know. The same operation is
/// routinely reported more than once (a client and server each flush their
/// half of an RPC, or one tracer splits timing and endpoint across records),
/// so consumers first collapse duplicates and then resolve the
/// `parent_id`/`id` references into a tree.
///
/// All times are microseconds: timestamps since the UNIX epoch, durations as
/// elapsed wall time. This is the wire resolution, kept raw here so that
/// record comparison and merging stay plain integer arithmetic.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Span {
    trace_id: TraceId,
    id: SpanId,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    parent_id: Option<SpanId>,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "is_false", default = "false_value")
    )]
    shared: bool,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    kind: Option<Kind>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    name: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    timestamp: Option<u64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    duration: Option<u64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    local_endpoint: Option<Endpoint>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    remote_endpoint: Option<Endpoint>,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "is_false", default = "false_value")
    )]
    debug: bool,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Vec::is_empty", default)
    )]
    annotations: Vec<Annotation>,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "HashMap::is_empty", default)
    )]
    tags: HashMap<String, String>,
}

#[cfg(feature = "serde")]
#[inline]
fn is_false(v: &bool) -> bool {
    !*v
}

#[cfg(feature = "serde")]
#[inline]
fn false_value() -> bool {
    false
}

impl Span {
    /// Returns a builder used to construct a `Span`.
    #[inline]
    pub fn builder() -> Builder {
        Builder {
            trace_id: None,
            id: None,
            parent_id: None,
            shared: false,
            kind: None,
            name: None,
            timestamp: None,
            duration: None,
            local_endpoint: None,
            remote_endpoint: None,
            debug: false,
            annotations: vec![],
            tags: HashMap::new(),
        }
    }

    /// The ID of the trace this record belongs to, shared by every span in
    /// it.
    #[inline]
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// The span's own 64 bit ID, unique within the trace except where an RPC
    /// callee reuses its caller's ID (see [`shared`](Span::shared)).
    #[inline]
    pub fn id(&self) -> SpanId {
        self.id
    }

    /// The ID of the enclosing span, absent on a trace's root.
    ///
    /// An absent parent on a non-root record is tolerated downstream; tree
    /// assembly attributes such spans to whatever root it finds.
    #[inline]
    pub fn parent_id(&self) -> Option<SpanId> {
        self.parent_id
    }

    /// Whether this record was produced by a tracer that did not start the
    /// span, i.e. the server half of an RPC reusing the client's span ID.
    #[inline]
    pub fn shared(&self) -> bool {
        self.shared
    }

    /// The RPC or messaging role of the span, absent for local work.
    #[inline]
    pub fn kind(&self) -> Option<Kind> {
        self.kind
    }

    /// The operation name, e.g. an RPC method, normalized to lowercase.
    ///
    /// Names are grouping labels; high-cardinality values such as
    /// interpolated arguments defeat that purpose and should never appear
    /// here.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// When the operation began, in microseconds since the UNIX epoch.
    #[inline]
    pub fn timestamp(&self) -> Option<u64> {
        self.timestamp
    }

    /// How long the operation took, in microseconds, rounded up to a minimum
    /// of 1.
    ///
    /// Duplicate-record merging treats a longer duration as a sign of the
    /// more complete report. A child may legitimately outlast its parent
    /// when work continues asynchronously.
    #[inline]
    pub fn duration(&self) -> Option<u64> {
        self.duration
    }

    /// The host that recorded this span.
    ///
    /// Besides serving service-name queries, this is the qualifier that
    /// separates duplicate server spans: two callees answering on the same
    /// shared ID differ only here.
    #[inline]
    pub fn local_endpoint(&self) -> Option<&Endpoint> {
        self.local_endpoint.as_ref()
    }

    /// The peer of an RPC or messaging span, when known.
    #[inline]
    pub fn remote_endpoint(&self) -> Option<&Endpoint> {
        self.remote_endpoint.as_ref()
    }

    /// Whether the span was forcibly sampled, overriding the sampling
    /// configuration.
    #[inline]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Timestamped events recorded against the span.
    #[inline]
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Key/value context recorded against the span, for search and analysis.
    #[inline]
    pub fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }
}

/// A builder for `Span`s.
///
/// Only the two identifiers are mandatory; everything else reflects how
/// little a tracer may know when it flushes. `Builder::from(span)` reopens an
/// existing record, which is how duplicate-record merging writes its
/// canonical result without touching a finished `Span`.
pub struct Builder {
    trace_id: Option<TraceId>,
    id: Option<SpanId>,
    parent_id: Option<SpanId>,
    shared: bool,
    kind: Option<Kind>,
    name: Option<String>,
    timestamp: Option<u64>,
    duration: Option<u64>,
    local_endpoint: Option<Endpoint>,
    remote_endpoint: Option<Endpoint>,
    debug: bool,
    annotations: Vec<Annotation>,
    tags: HashMap<String, String>,
}

impl From<Span> for Builder {
    #[inline]
    fn from(s: Span) -> Builder {
        Builder {
            trace_id: Some(s.trace_id),
            id: Some(s.id),
            parent_id: s.parent_id,
            shared: s.shared,
            kind: s.kind,
            name: s.name,
            timestamp: s.timestamp,
            duration: s.duration,
            local_endpoint: s.local_endpoint,
            remote_endpoint: s.remote_endpoint,
            debug: s.debug,
            annotations: s.annotations,
            tags: s.tags,
        }
    }
}

impl Builder {
    /// Sets the ID of the trace the span belongs to.
    #[inline]
    pub fn trace_id(&mut self, trace_id: TraceId) -> &mut Builder {
        self.trace_id = Some(trace_id);
        self
    }

    /// Sets the span's own ID.
    #[inline]
    pub fn id(&mut self, id: SpanId) -> &mut Builder {
        self.id = Some(id);
        self
    }

    /// Sets the ID of the enclosing span. Leave unset on a root.
    #[inline]
    pub fn parent_id(&mut self, parent_id: SpanId) -> &mut Builder {
        self.parent_id = Some(parent_id);
        self
    }

    /// Marks the record as reported by a tracer that did not start the span.
    ///
    /// `false` unless set.
    #[inline]
    pub fn shared(&mut self, shared: bool) -> &mut Builder {
        self.shared = shared;
        self
    }

    /// Sets the span's RPC or messaging role.
    #[inline]
    pub fn kind(&mut self, kind: Kind) -> &mut Builder {
        self.kind = Some(kind);
        self
    }

    /// Sets the operation name; the stored value is lowercased.
    #[inline]
    pub fn name(&mut self, name: &str) -> &mut Builder {
        self.name = Some(name.to_lowercase());
        self
    }

    /// Sets when the operation began, in microseconds since the UNIX epoch.
    #[inline]
    pub fn timestamp(&mut self, timestamp: u64) -> &mut Builder {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets how long the operation took, in microseconds.
    #[inline]
    pub fn duration(&mut self, duration: u64) -> &mut Builder {
        self.duration = Some(duration);
        self
    }

    /// Sets the host that recorded the span.
    #[inline]
    pub fn local_endpoint(&mut self, local_endpoint: Endpoint) -> &mut Builder {
        self.local_endpoint = Some(local_endpoint);
        self
    }

    /// Sets the peer of an RPC or messaging span.
    #[inline]
    pub fn remote_endpoint(&mut self, remote_endpoint: Endpoint) -> &mut Builder {
        self.remote_endpoint = Some(remote_endpoint);
        self
    }

    /// Marks the span as forcibly sampled.
    ///
    /// `false` unless set.
    #[inline]
    pub fn debug(&mut self, debug: bool) -> &mut Builder {
        self.debug = debug;
        self
    }

    /// Records a timestamped event against the span.
    #[inline]
    pub fn annotation(&mut self, annotation: Annotation) -> &mut Builder {
        self.annotations.push(annotation);
        self
    }

    /// Records a batch of timestamped events against the span.
    #[inline]
    pub fn annotations<I>(&mut self, annotations: I) -> &mut Builder
    where
        I: IntoIterator<Item = Annotation>,
    {
        self.annotations.extend(annotations);
        self
    }

    /// Records one tag, replacing any previous value for the key.
    #[inline]
    pub fn tag(&mut self, key: &str, value: &str) -> &mut Builder {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    /// Records a batch of tags.
    #[inline]
    pub fn tags<I>(&mut self, tags: I) -> &mut Builder
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.tags.extend(tags);
        self
    }

    /// Constructs the `Span`.
    ///
    /// # Panics
    ///
    /// Panics if `trace_id` or `id` was never set; a record without its
    /// identifiers is meaningless.
    #[inline]
    pub fn build(&self) -> Span {
        Span {
            trace_id: self.trace_id.expect("trace ID not set"),
            id: self.id.expect("span ID not set"),
            parent_id: self.parent_id,
            shared: self.shared,
            kind: self.kind,
            name: self.name.clone(),
            timestamp: self.timestamp,
            duration: self.duration,
            local_endpoint: self.local_endpoint.clone(),
            remote_endpoint: self.remote_endpoint.clone(),
            debug: self.debug,
            annotations: self.annotations.clone(),
            tags: self.tags.clone(),
        }
    }
}


#[cfg(all(test, feature = "serde"))]
mod serde_test {
    use super::*;

    #[test]
    fn serializes_in_wire_format() {
        let mut endpoint = Endpoint::builder();
        endpoint.service_name("frontend");
        let span = Span::builder()
            .trace_id(TraceId::from(0x1234u64))
            .parent_id(SpanId::from(1))
            .id(SpanId::from(2))
            .name("get")
            .timestamp(1_000_000)
            .duration(25)
            .shared(true)
            .local_endpoint(endpoint.build())
            .build();

        let json = serde_json::to_value(&span).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "traceId": "0000000000001234",
                "parentId": "0000000000000001",
                "id": "0000000000000002",
                "name": "get",
                "timestamp": 1_000_000,
                "duration": 25,
                "shared": true,
                "localEndpoint": { "serviceName": "frontend" },
            })
        );
    }

    #[test]
    fn absent_flags_deserialize_to_false() {
        let span: Span = serde_json::from_value(serde_json::json!({
            "traceId": "0000000000001234",
            "id": "0000000000000002",
        }))
        .unwrap();

        assert!(!span.shared());
        assert!(!span.debug());
        assert_eq!(span.kind(), None);
        assert!(span.annotations().is_empty());
        assert!(span.tags().is_empty());
    }

    #[test]
    fn kind_uses_screaming_snake_case() {
        assert_eq!(
            serde_json::to_value(Kind::Client).unwrap(),
            serde_json::json!("CLIENT")
        );
    }
}
