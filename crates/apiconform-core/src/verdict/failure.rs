//! Failure records: case identity plus expected-vs-actual detail

use serde::Serialize;

use crate::descriptor::RequestDescriptor;
use crate::outcome::CaseIdentity;
use crate::response::ResponseBody;
use crate::value::Value;

/// Why a case failed - decides the exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Status/body did not meet the expectation
    Assertion,
    /// No response (connection refused, timeout, ...)
    Transport,
}

impl FailureKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assertion => "assertion",
            Self::Transport => "transport",
        }
    }
}

/// What the case expected of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// Status 200 and a body equal to the stub
    Stub,
    /// Anything other than (200, stub)
    Deviation,
}

impl std::fmt::Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stub => f.write_str("status 200 with stub body"),
            Self::Deviation => f.write_str("non-200 status or non-stub body"),
        }
    }
}

/// Expected vs actual for one failed check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureDetail {
    pub kind: FailureKind,
    pub expectation: Expectation,
    pub expected_body: Value,
    pub actual_status: u16,
    pub actual_body: ResponseBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_error: Option<String>,
}

impl std::fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(err) = &self.transport_error {
            return write!(f, "expected {}, got transport error: {err}", self.expectation);
        }
        write!(
            f,
            "expected {} (stub {}), got status {} body {}",
            self.expectation, self.expected_body, self.actual_status, self.actual_body
        )
    }
}

/// Request as sent, kept for reproduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestSnapshot {
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RequestSnapshot {
    /// Snapshot of `descriptor` against `base_url`, with the `Cookie` header
    /// materialized.
    #[must_use]
    pub fn capture(descriptor: &RequestDescriptor, base_url: &str) -> Self {
        let mut headers: Vec<(String, String)> = descriptor
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if let Some(cookie) = descriptor.cookie_header() {
            headers.push(("Cookie".to_string(), cookie));
        }
        Self {
            method: descriptor.method().to_string(),
            url: descriptor.url(base_url),
            headers,
            body: descriptor.body().map(crate::descriptor::Body::text),
        }
    }
}

/// A failed case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub case: CaseIdentity,
    pub detail: FailureDetail,
    pub request: RequestSnapshot,
    /// Virtual user that observed it
    pub vu: u32,
    pub iteration: u32,
}

impl Failure {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        self.detail.kind
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.case, self.detail)
    }
}
