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

//! Trace tree assembly for Zipkin-compatible tracing backends.
//!
//! A tracing backend receives the spans of a trace as an unordered, possibly
//! duplicated, possibly incomplete batch. This crate reconstructs the
//! parent/child hierarchy those spans describe:
//!
//! * [`merge_trace`] collapses duplicate reports of the same span into one
//!   canonical record;
//! * [`TreeBuilder`] resolves parent references (including the B3
//!   convention of a server reusing its client's span ID) into a rooted
//!   [`SpanTree`], tolerating missing roots, orphan subtrees, and circular
//!   references;
//! * [`TimelineLayout`] derives the tree-edge glyphs a timeline renderer
//!   draws next to the depth-indented span rows.
//!
//! ```
//! use trace_tree::{SpanTree, TraceId};
//!
//! # fn spans() -> Vec<trace_tree::Span> { vec![] }
//! let trace_id = TraceId::from(1u64);
//! let tree = SpanTree::assemble(trace_id, spans(), log::logger());
//!
//! // breadth-first over the reconstructed hierarchy
//! let nodes = tree.root().traverse().count();
//! assert_eq!(nodes, 1); // just the synthetic root for an empty batch
//! ```
//!
//! # Serialization
//!
//! If the `serde` Cargo feature is enabled, the re-exported span model types
//! implement `Serialize` and `Deserialize` in the standard Zipkin format.
#![doc(html_root_url = "https://docs.rs/trace-tree/0.1")]
#![warn(missing_docs)]

#[doc(inline)]
pub use crate::merge::{merge_pair, merge_trace};
#[doc(inline)]
pub use crate::node::{Children, Flatten, NodeId, SpanNode, SpanTree, Traverse};
#[doc(inline)]
pub use crate::timeline::{Horizontal, TimelineLayout, Vertical};
#[doc(inline)]
pub use crate::tree::TreeBuilder;

pub use trace_tree_types::{Annotation, Endpoint, Kind, Span, SpanId, TraceId};

pub mod merge;
pub mod node;
pub mod timeline;
pub mod tree;
