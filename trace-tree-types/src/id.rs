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

//! Trace and span IDs.
use data_encoding::{DecodeError, HEXLOWER_PERMISSIVE};
use std::error::Error;
use std::fmt;
use std::str::FromStr;

fn decode_hex(s: &str, buf: &mut [u8]) -> Result<(), IdParseError> {
    match HEXLOWER_PERMISSIVE.decode_len(s.len()) {
        Ok(n) if n == buf.len() => HEXLOWER_PERMISSIVE
            .decode_mut(s.as_bytes(), buf)
            .map(|_| ())
            .map_err(|e| IdParseError(Some(e.error))),
        _ => Err(IdParseError(None)),
    }
}

fn write_hex(bytes: &[u8], fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
    for b in bytes {
        write!(fmt, "{:02x}", b)?;
    }
    Ok(())
}

/// The ID of a span.
///
/// Span IDs are 8 bytes, rendered as 16 lowercase hex digits with leading
/// zeros preserved.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpanId {
    buf: [u8; 8],
}

impl SpanId {
    /// Returns the bytes of the span ID.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl FromStr for SpanId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<SpanId, IdParseError> {
        let mut buf = [0; 8];
        decode_hex(s, &mut buf)?;
        Ok(SpanId { buf })
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(&self.buf, fmt)
    }
}

impl From<[u8; 8]> for SpanId {
    #[inline]
    fn from(bytes: [u8; 8]) -> SpanId {
        SpanId { buf: bytes }
    }
}

impl From<u64> for SpanId {
    #[inline]
    fn from(id: u64) -> SpanId {
        SpanId {
            buf: id.to_be_bytes(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum Inner {
    Short([u8; 8]),
    Long([u8; 16]),
}

/// The ID of a trace.
///
/// Trace IDs are either 8 or 16 bytes, rendered as 16 or 32 lowercase hex
/// digits respectively with leading zeros preserved.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TraceId(Inner);

impl TraceId {
    /// Returns the byte representation of the trace ID.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        match self.0 {
            Inner::Short(ref buf) => buf,
            Inner::Long(ref buf) => buf,
        }
    }
}

impl FromStr for TraceId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<TraceId, IdParseError> {
        let inner = match HEXLOWER_PERMISSIVE.decode_len(s.len()) {
            Ok(8) => {
                let mut buf = [0; 8];
                decode_hex(s, &mut buf)?;
                Inner::Short(buf)
            }
            Ok(16) => {
                let mut buf = [0; 16];
                decode_hex(s, &mut buf)?;
                Inner::Long(buf)
            }
            _ => return Err(IdParseError(None)),
        };

        Ok(TraceId(inner))
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(self.bytes(), fmt)
    }
}

impl From<[u8; 8]> for TraceId {
    #[inline]
    fn from(bytes: [u8; 8]) -> TraceId {
        TraceId(Inner::Short(bytes))
    }
}

impl From<[u8; 16]> for TraceId {
    #[inline]
    fn from(bytes: [u8; 16]) -> TraceId {
        TraceId(Inner::Long(bytes))
    }
}

impl From<u64> for TraceId {
    #[inline]
    fn from(id: u64) -> TraceId {
        TraceId(Inner::Short(id.to_be_bytes()))
    }
}

impl From<u128> for TraceId {
    #[inline]
    fn from(id: u128) -> TraceId {
        TraceId(Inner::Long(id.to_be_bytes()))
    }
}

/// The error returned when parsing a `SpanId` or `TraceId` from a string.
#[derive(Debug)]
pub struct IdParseError(Option<DecodeError>);

impl fmt::Display for IdParseError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str("error parsing ID: ")?;
        match self.0 {
            Some(ref err) => write!(fmt, "{}", err),
            None => fmt.write_str("invalid length"),
        }
    }
}

impl Error for IdParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.as_ref().map(|e| e as _)
    }
}

#[cfg(feature = "serde")]
mod serde {
    use crate::id::{SpanId, TraceId};
    use serde::de::{Error, Unexpected, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::fmt;

    impl Serialize for SpanId {
        fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            s.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for SpanId {
        fn deserialize<D>(d: D) -> Result<SpanId, D::Error>
        where
            D: Deserializer<'de>,
        {
            d.deserialize_str(SpanIdVisitor)
        }
    }

    struct SpanIdVisitor;

    impl<'de> Visitor<'de> for SpanIdVisitor {
        type Value = SpanId;

        fn expecting(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
            fmt.write_str("a hex-encoded span ID")
        }

        fn visit_str<E>(self, v: &str) -> Result<SpanId, E>
        where
            E: Error,
        {
            v.parse()
                .map_err(|_| Error::invalid_value(Unexpected::Str(v), &self))
        }
    }

    impl Serialize for TraceId {
        fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            s.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for TraceId {
        fn deserialize<D>(d: D) -> Result<TraceId, D::Error>
        where
            D: Deserializer<'de>,
        {
            d.deserialize_str(TraceIdVisitor)
        }
    }

    struct TraceIdVisitor;

    impl<'de> Visitor<'de> for TraceIdVisitor {
        type Value = TraceId;

        fn expecting(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
            fmt.write_str("a hex-encoded trace ID")
        }

        fn visit_str<E>(self, v: &str) -> Result<TraceId, E>
        where
            E: Error,
        {
            v.parse()
                .map_err(|_| Error::invalid_value(Unexpected::Str(v), &self))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn span_id_round_trip() {
        let id = "000000000000000a".parse::<SpanId>().unwrap();
        assert_eq!(id, SpanId::from(10));
        assert_eq!(id.to_string(), "000000000000000a");
    }

    #[test]
    fn span_id_rejects_bad_lengths() {
        assert!("abcd".parse::<SpanId>().is_err());
        assert!("000000000000000a00".parse::<SpanId>().is_err());
    }

    #[test]
    fn trace_id_widths() {
        let short = "0001020304050607".parse::<TraceId>().unwrap();
        assert_eq!(short.bytes(), &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(short.to_string().len(), 16);

        let long = "00010203040506070001020304050607"
            .parse::<TraceId>()
            .unwrap();
        assert_eq!(long.bytes().len(), 16);
        assert_eq!(long.to_string().len(), 32);
    }

    #[test]
    fn trace_id_preserves_leading_zeros() {
        assert_eq!(TraceId::from(1u64).to_string(), "0000000000000001");
        assert_eq!(
            TraceId::from(1u128).to_string(),
            "00000000000000000000000000000001"
        );
    }
}
