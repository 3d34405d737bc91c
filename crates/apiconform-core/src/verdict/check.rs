//! Conformance check of one response against the stub

use super::failure::{Expectation, FailureDetail, FailureKind};
use crate::outcome::CaseOutcome;
use crate::response::ResponseRecord;
use crate::value::Value;

/// Result of [`check`].
#[derive(Debug, Clone, PartialEq)]
pub enum CheckVerdict {
    Pass,
    Fail(FailureDetail),
}

impl CheckVerdict {
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Whether the target treated the request as the happy path: status 200
/// and a body structurally equal to the stub. An empty or unparseable body
/// never matches.
#[must_use]
pub fn matches_stub(expected_stub: &Value, response: &ResponseRecord) -> bool {
    response.status == 200 && response.body.as_value() == Some(expected_stub)
}

/// Judge `response` for a case classified as `outcome`.
///
/// Positive cases pass iff the response matches the stub; negative cases
/// pass iff it does not. A transport failure fails either kind.
#[must_use]
pub fn check(outcome: &CaseOutcome, expected_stub: &Value, response: &ResponseRecord) -> CheckVerdict {
    let expectation = if outcome.is_positive() {
        Expectation::Stub
    } else {
        Expectation::Deviation
    };

    let kind = if response.is_transport_failure() {
        FailureKind::Transport
    } else {
        let matched = matches_stub(expected_stub, response);
        if matched == outcome.is_positive() {
            return CheckVerdict::Pass;
        }
        FailureKind::Assertion
    };

    CheckVerdict::Fail(FailureDetail {
        kind,
        expectation,
        expected_body: expected_stub.clone(),
        actual_status: response.status,
        actual_body: response.body.clone(),
        transport_error: response.transport_error.clone(),
    })
}
