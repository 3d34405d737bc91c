//! Normalized response as observed by the dispatcher.

use std::time::Duration;

use serde::Serialize;

use crate::value::Value;

/// Parsed response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ResponseBody {
    Empty,
    Parsed(Value),
    /// Not valid JSON; holds the (lossy) raw text.
    Unparseable(String),
}

impl ResponseBody {
    /// Classify raw bytes: empty, JSON, or parse failure.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self::Empty;
        }
        match serde_json::from_slice::<serde_json::Value>(bytes) {
            Ok(v) => Self::Parsed(Value::from(v)),
            Err(_) => Self::Unparseable(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Parsed(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("<empty>"),
            Self::Parsed(v) => write!(f, "{v}"),
            Self::Unparseable(raw) => write!(f, "<unparseable: {raw}>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseRecord {
    /// `0` when the request never got a response.
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
    pub transport_error: Option<String>,
}

impl ResponseRecord {
    /// Record for a request that failed before a response arrived.
    #[must_use]
    pub fn transport_failure(error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            status: 0,
            headers: Vec::new(),
            body: ResponseBody::Empty,
            elapsed,
            transport_error: Some(error.into()),
        }
    }

    #[must_use]
    pub fn is_transport_failure(&self) -> bool {
        self.transport_error.is_some()
    }
}

mod duration_ms {
    use std::time::Duration;

    pub fn serialize<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        #[allow(clippy::cast_precision_loss)]
        let ms = d.as_micros() as f64 / 1000.0;
        s.serialize_f64(ms)
    }
}
