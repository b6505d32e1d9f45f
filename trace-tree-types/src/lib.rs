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

//! Type definitions for Zipkin trace tree assembly.
//!
//! These are the value types consumed by the `trace-tree` crate: the spans
//! collected for a trace, the endpoints that qualify them, and the trace and
//! span identifiers that tie them together. Timestamps and durations are
//! microseconds, as on the wire.
//!
//! # Serialization
//!
//! If the `serde` Cargo feature is enabled, `Annotation`, `Endpoint`, `Kind`,
//! `Span`, `SpanId`, and `TraceId` implement `Serialize` and `Deserialize` in
//! the standard Zipkin format.
#![doc(html_root_url = "https://docs.rs/trace-tree-types/0.1")]
#![warn(missing_docs)]

#[doc(inline)]
pub use crate::annotation::Annotation;
#[doc(inline)]
pub use crate::endpoint::Endpoint;
#[doc(inline)]
pub use crate::id::{IdParseError, SpanId, TraceId};
#[doc(inline)]
pub use crate::span::{Kind, Span};

pub mod annotation;
pub mod endpoint;
pub mod id;
pub mod span;
