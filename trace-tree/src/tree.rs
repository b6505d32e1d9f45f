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

//! Trace tree assembly.
//!
//! [`TreeBuilder`] turns the unordered, possibly incomplete set of spans
//! collected for one trace into a rooted [`SpanTree`]. The builder tolerates
//! out-of-order arrival, missing roots, orphan subtrees, and the B3
//! convention of a client and server sharing one span ID; malformed input
//! degrades to a best-effort tree and a FINE diagnostic rather than an
//! error.
use crate::merge;
use crate::node::{NodeId, SpanTree};
use indexmap::IndexMap;
use log::{Level, Log, Metadata, Record};
use std::fmt;
use std::mem;
use trace_tree_types::{Endpoint, Span, SpanId, TraceId};

/// The lookup identity of a span while its trace is under assembly.
///
/// The endpoint component disambiguates "duplicate server spans": distinct
/// servers legitimately answering on the same client span ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key {
    id: SpanId,
    shared: bool,
    endpoint: Option<Endpoint>,
}

impl Key {
    fn new(id: SpanId, shared: bool, endpoint: Option<Endpoint>) -> Key {
        Key {
            id,
            shared,
            endpoint,
        }
    }
}

/// Assembles the spans of a single trace into a [`SpanTree`].
///
/// Spans are fed one at a time through [`add_node`](TreeBuilder::add_node)
/// and resolved all at once by [`build`](TreeBuilder::build). Duplicate span
/// *records* (several reports of the same span) must be collapsed with
/// [`merge::merge_trace`] before they are added; [`SpanTree::assemble`] does
/// both steps.
///
/// A builder handles exactly one trace and is not safe for concurrent
/// mutation; the tree it produces is freely shareable for reads.
pub struct TreeBuilder<'a> {
    trace_id: TraceId,
    logger: &'a dyn Log,
    entries: Vec<Span>,
    span_to_parent: IndexMap<Key, Option<Key>>,
}

impl<'a> TreeBuilder<'a> {
    /// Creates a builder for the trace with the given ID.
    ///
    /// Diagnostics about data quality (circular references, orphans, missing
    /// roots) are emitted to `logger` at the `Debug` level and never surfaced
    /// as errors.
    pub fn new(trace_id: TraceId, logger: &'a dyn Log) -> TreeBuilder<'a> {
        TreeBuilder {
            trace_id,
            logger,
            entries: vec![],
            span_to_parent: IndexMap::new(),
        }
    }

    /// Adds a span to the trace, returning whether it was accepted.
    ///
    /// A span that names itself as its parent is dropped and logged; no
    /// other validation is performed. Spans whose trace ID does not match
    /// the builder's are the caller's responsibility to filter.
    pub fn add_node(&mut self, span: Span) -> bool {
        if span.parent_id() == Some(span.id()) {
            self.fine(format_args!(
                "skipping circular dependency: traceId={}, spanId={}",
                self.trace_id,
                span.id()
            ));
            return false;
        }

        self.index(&span);
        self.entries.push(span);
        true
    }

    /// Records the provisional parent of a span before any relationships are
    /// resolved.
    ///
    /// A shared span is the server half of an RPC: its parent is the client
    /// half on the same ID, and it is additionally registered under its
    /// endpoint so children that know the endpoint can find it later.
    fn index(&mut self, span: &Span) {
        let parent = if span.shared() {
            Some(Key::new(span.id(), false, None))
        } else {
            span.parent_id().map(|id| Key::new(id, false, None))
        };

        self.span_to_parent
            .insert(Key::new(span.id(), span.shared(), None), parent.clone());
        if span.shared() {
            if let Some(endpoint) = span.local_endpoint() {
                self.span_to_parent.insert(
                    Key::new(span.id(), true, Some(endpoint.clone())),
                    parent,
                );
            }
        }
    }

    /// Resolves every buffered span and returns the root of the assembled
    /// tree.
    ///
    /// The first root-like span (no parent, not shared) becomes the root;
    /// later root-like spans and subtrees whose parent never arrived are
    /// attached under it. If no root-like span exists at all, a synthetic
    /// node carrying no span takes its place.
    pub fn build(mut self) -> SpanTree {
        let mut tree = SpanTree::new();
        let mut key_to_node: IndexMap<Key, NodeId> = IndexMap::new();
        let mut root: Option<(NodeId, SpanId)> = None;

        for span in mem::take(&mut self.entries) {
            let endpoint = span.local_endpoint().cloned();
            let key = Key::new(span.id(), span.shared(), endpoint.clone());
            let no_endpoint_key = Key::new(span.id(), span.shared(), None);

            let mut parent = None;
            if span.shared() {
                // the server half of an RPC pairs with its client on the same
                // ID regardless of endpoint
                parent = Some(Key::new(span.id(), false, None));
            } else if let Some(parent_id) = span.parent_id() {
                // Most specific candidate first: a shared parent on this
                // span's endpoint, e.g. an intermediate local span under a
                // shared server.
                let shared_parent = Key::new(parent_id, true, endpoint.clone());
                let local_parent = Key::new(parent_id, false, endpoint.clone());
                if self.span_to_parent.contains_key(&shared_parent) {
                    self.span_to_parent
                        .insert(no_endpoint_key.clone(), Some(shared_parent.clone()));
                    parent = Some(shared_parent);
                } else if self.span_to_parent.contains_key(&local_parent) {
                    // a same-host parent reported without shared=true
                    self.span_to_parent
                        .insert(no_endpoint_key.clone(), Some(local_parent.clone()));
                    parent = Some(local_parent);
                } else {
                    parent = Some(Key::new(parent_id, false, None));
                }
            } else if let Some((_, root_span_id)) = root {
                self.fine(format_args!(
                    "attributing span missing parent to root: traceId={}, rootSpanId={}, spanId={}",
                    self.trace_id,
                    root_span_id,
                    span.id()
                ));
            }

            let span_id = span.id();
            let shared = span.shared();
            let node = tree.push(Some(span));

            // The first root is taken to be the real one; it never enters the
            // node map, so its direct children resolve through the
            // missing-parent path below.
            if parent.is_none() && root.is_none() {
                root = Some((node, span_id));
                self.span_to_parent.shift_remove(&no_endpoint_key);
            } else if shared {
                // reachable both by children that know the endpoint and by
                // children that don't
                key_to_node.insert(key, node);
                key_to_node.insert(no_endpoint_key, node);
            } else {
                key_to_node.insert(no_endpoint_key, node);
            }
        }

        let root = match root {
            Some((node, _)) => node,
            None => {
                self.fine(format_args!(
                    "substituting dummy node for missing root span: traceId={}",
                    self.trace_id
                ));
                tree.push(None)
            }
        };
        tree.set_root(root);

        for (child_key, parent_key) in &self.span_to_parent {
            let child = match key_to_node.get(child_key) {
                Some(&child) => child,
                None => {
                    debug_assert!(false, "no node indexed for {:?}", child_key);
                    continue;
                }
            };
            match parent_key
                .as_ref()
                .and_then(|key| key_to_node.get(key))
            {
                Some(&parent) => tree.add_child(parent, child),
                // headless: the parent never arrived, or this was a span
                // attributed to the root
                None => tree.add_child(root, child),
            }
        }

        tree
    }

    fn fine(&self, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder()
            .level(Level::Debug)
            .target("trace_tree")
            .build();
        if self.logger.enabled(&metadata) {
            self.logger.log(
                &Record::builder()
                    .args(args)
                    .level(Level::Debug)
                    .target("trace_tree")
                    .module_path(Some(module_path!()))
                    .build(),
            );
        }
    }
}

impl SpanTree {
    /// Merges and assembles a batch of raw span records into a tree.
    ///
    /// This is the one-call entry point for callers holding everything
    /// collected for a trace: duplicates are collapsed with
    /// [`merge::merge_trace`], then each canonical span is added to a
    /// [`TreeBuilder`] and the tree is built.
    pub fn assemble(trace_id: TraceId, spans: Vec<Span>, logger: &dyn Log) -> SpanTree {
        let mut builder = TreeBuilder::new(trace_id, logger);
        for span in merge::merge_trace(spans) {
            builder.add_node(span);
        }
        builder.build()
    }
}
