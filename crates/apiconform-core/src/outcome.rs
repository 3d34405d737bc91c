//! Case classification: positive, or negative with exactly one fault.

use serde::{Deserialize, Serialize};

/// Aspect of a request made invalid by a negative case. Cookies count as
/// headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultDimension {
    Headers,
    Path,
    Query,
    Body,
}

impl std::fmt::Display for FaultDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Headers => "headers",
            Self::Path => "path",
            Self::Query => "query",
            Self::Body => "body",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultReason {
    MissingRequiredHeader,
    WrongHeaderValue,
    EmptyBody,
    InvalidPathParam,
    MissingRequiredQuery,
    ConstViolation,
    IfThenViolation,
    UnevaluatedPropertyViolation,
    RangeViolation,
    MalformedId,
}

impl FaultReason {
    pub const ALL: [Self; 10] = [
        Self::MissingRequiredHeader,
        Self::WrongHeaderValue,
        Self::EmptyBody,
        Self::InvalidPathParam,
        Self::MissingRequiredQuery,
        Self::ConstViolation,
        Self::IfThenViolation,
        Self::UnevaluatedPropertyViolation,
        Self::RangeViolation,
        Self::MalformedId,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingRequiredHeader => "missing-required-header",
            Self::WrongHeaderValue => "wrong-header-value",
            Self::EmptyBody => "empty-body",
            Self::InvalidPathParam => "invalid-path-param",
            Self::MissingRequiredQuery => "missing-required-query",
            Self::ConstViolation => "const-violation",
            Self::IfThenViolation => "if-then-violation",
            Self::UnevaluatedPropertyViolation => "unevaluated-property-violation",
            Self::RangeViolation => "range-violation",
            Self::MalformedId => "malformed-id",
        }
    }
}

impl std::fmt::Display for FaultReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single injected fault of a negative case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub reason: FaultReason,
    pub dimension: FaultDimension,
    /// What was mutated, e.g. `X-Schema-ID` or `body.quantity`
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CaseOutcome {
    Positive,
    Negative(Fault),
}

impl CaseOutcome {
    #[must_use]
    pub fn negative(reason: FaultReason, dimension: FaultDimension, target: impl Into<String>) -> Self {
        Self::Negative(Fault {
            reason,
            dimension,
            target: target.into(),
        })
    }

    #[must_use]
    pub const fn is_positive(&self) -> bool {
        matches!(self, Self::Positive)
    }

    #[must_use]
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Positive => None,
            Self::Negative(f) => Some(f),
        }
    }

    /// `positive`, or `<reason>(<target>)`.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Positive => "positive".to_string(),
            Self::Negative(f) => format!("{}({})", f.reason, f.target),
        }
    }
}

/// Literal identity of one case in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseIdentity {
    pub group: String,
    pub method: String,
    pub path_template: String,
    pub outcome: CaseOutcome,
}

impl std::fmt::Display for CaseIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} {} {}",
            self.group,
            self.method,
            self.path_template,
            self.outcome.label()
        )
    }
}
