//! Trace identifier attached to every logged request.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Header carrying the trace id on inbound requests and outbound responses.
pub const TRACE_ID_HEADER: HeaderName = HeaderName::from_static("x-trace-id");

/// Opaque identifier correlating all output produced while handling one request.
///
/// Generated ids are random UUID v4 strings. Any non-empty value supplied by a
/// client through [`TRACE_ID_HEADER`] is reused, and the response echoes the
/// original header bytes unchanged. Values that are not valid UTF-8 appear
/// lossily decoded in records and tagged output.
///
/// # Examples
///
/// ```
/// use trace_logger::domain::trace_id::TraceId;
///
/// let id = TraceId::parse("req-42").unwrap();
/// assert_eq!(id.as_str(), "req-42");
///
/// assert!(TraceId::parse("").is_none());
/// assert!(TraceId::parse("upstream trace 42").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct TraceId {
    id: String,
    inbound: Option<HeaderValue>,
}

impl TraceId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            inbound: None,
        }
    }

    /// Accepts any non-empty value that can travel in a header.
    pub fn parse(raw: &str) -> Option<Self> {
        let value = HeaderValue::from_str(raw).ok()?;
        Self::from_header_value(&value)
    }

    /// Reuses a raw header value, or `None` if it is empty.
    pub fn from_header_value(value: &HeaderValue) -> Option<Self> {
        if value.is_empty() {
            return None;
        }

        Some(Self {
            id: String::from_utf8_lossy(value.as_bytes()).into_owned(),
            inbound: Some(value.clone()),
        })
    }

    /// Reads the trace id from request headers.
    ///
    /// Returns `None` when the header is absent or empty, in which case
    /// callers generate a new id.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers.get(TRACE_ID_HEADER).and_then(Self::from_header_value)
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// Header value for the response: the inbound bytes when the id came from
    /// a request, the generated string otherwise.
    pub fn to_header_value(&self) -> Option<HeaderValue> {
        match &self.inbound {
            Some(value) => Some(value.clone()),
            None => HeaderValue::from_str(&self.id).ok(),
        }
    }
}

impl PartialEq for TraceId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TraceId {}

impl Hash for TraceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Serialize for TraceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.id)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl AsRef<str> for TraceId {
    fn as_ref(&self) -> &str {
        &self.id
    }
}

impl From<TraceId> for String {
    fn from(id: TraceId) -> Self {
        id.id
    }
}
