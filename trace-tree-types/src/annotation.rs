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

//! Annotations.

/// Associates an event that explains latency with a timestamp.
///
/// Unlike log statements, annotations are often codes, e.g. "ws" for WireSend.
/// Timestamps are microseconds since the UNIX epoch.
///
/// Annotations order by `(timestamp, value)`, which is also the identity used
/// when merging duplicate span records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Annotation {
    timestamp: u64,
    value: String,
}

impl Annotation {
    /// Creates a new `Annotation`.
    pub fn new(timestamp: u64, value: &str) -> Annotation {
        Annotation {
            timestamp,
            value: value.to_string(),
        }
    }

    /// Returns the time at which the annotated event occurred, in
    /// microseconds since the UNIX epoch.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Returns the value of the annotation.
    pub fn value(&self) -> &str {
        &self.value
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn orders_by_timestamp_then_value() {
        let mut annotations = vec![
            Annotation::new(2, "ws"),
            Annotation::new(1, "wr"),
            Annotation::new(1, "foo"),
        ];
        annotations.sort();
        assert_eq!(
            annotations,
            vec![
                Annotation::new(1, "foo"),
                Annotation::new(1, "wr"),
                Annotation::new(2, "ws"),
            ]
        );
    }
}
