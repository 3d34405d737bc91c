//! Run verdict and exit codes

use super::failure::FailureKind;
use super::summary::RunReport;

/// Exit code: every case passed.
pub const EXIT_PASS: i32 = 0;
/// Exit code: at least one assertion failure.
pub const EXIT_ASSERTION: i32 = 1;
/// Exit code: failures, all of them transport failures.
pub const EXIT_TRANSPORT: i32 = 2;
/// Exit code: tool or configuration error (nothing judged).
pub const EXIT_TOOL_ERROR: i32 = 3;

/// Final verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub exit_code: i32,
    pub reason: String,
}

/// Pass or fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictStatus {
    Pass,
    Fail,
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

impl Verdict {
    /// PASS requires every case to pass. Assertion failures outrank
    /// transport failures for the exit code.
    #[must_use]
    pub fn from_report(report: &RunReport) -> Self {
        let total = report.total();
        if total == 0 {
            return Self {
                status: VerdictStatus::Fail,
                exit_code: EXIT_TOOL_ERROR,
                reason: "No cases were run".to_string(),
            };
        }

        let assertion = report.count_kind(FailureKind::Assertion);
        let transport = report.count_kind(FailureKind::Transport);

        if assertion == 0 && transport == 0 {
            return Self {
                status: VerdictStatus::Pass,
                exit_code: EXIT_PASS,
                reason: format!("All {total} cases passed"),
            };
        }

        let mut parts = Vec::new();
        if assertion > 0 {
            parts.push(format!("{assertion} assertion failures"));
        }
        if transport > 0 {
            parts.push(format!("{transport} transport failures"));
        }
        Self {
            status: VerdictStatus::Fail,
            exit_code: if assertion > 0 {
                EXIT_ASSERTION
            } else {
                EXIT_TRANSPORT
            },
            reason: format!("{} of {total} cases failed: {}", assertion + transport, parts.join("; ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{CaseIdentity, CaseOutcome};
    use crate::response::ResponseBody;
    use crate::value::Value;
    use crate::verdict::failure::{Expectation, Failure, FailureDetail, RequestSnapshot};
    use crate::verdict::summary::{CaseRecord, GroupSummary};

    fn record(passed: bool, kind: FailureKind) -> CaseRecord {
        let case = CaseIdentity {
            group: "crud".into(),
            method: "GET".into(),
            path_template: "/documents".into(),
            outcome: CaseOutcome::Positive,
        };
        let failure = (!passed).then(|| Failure {
            case: case.clone(),
            detail: FailureDetail {
                kind,
                expectation: Expectation::Stub,
                expected_body: Value::Null,
                actual_status: if kind == FailureKind::Transport { 0 } else { 500 },
                actual_body: ResponseBody::Empty,
                transport_error: (kind == FailureKind::Transport).then(|| "refused".to_string()),
            },
            request: RequestSnapshot {
                method: "GET".into(),
                url: "http://localhost:8282/documents".into(),
                headers: Vec::new(),
                body: None,
            },
            vu: 0,
            iteration: 0,
        });
        CaseRecord {
            case,
            status: 200,
            elapsed_ms: 1.0,
            passed,
            failure,
        }
    }

    fn report(records: &[CaseRecord]) -> RunReport {
        let mut r = RunReport::default();
        r.merge_groups([GroupSummary::from_records("crud", records)]);
        r
    }

    #[test]
    fn all_pass() {
        let v = Verdict::from_report(&report(&[record(true, FailureKind::Assertion)]));
        assert_eq!(v.status, VerdictStatus::Pass);
        assert_eq!(v.exit_code, EXIT_PASS);
        assert_eq!(v.reason, "All 1 cases passed");
    }

    #[test]
    fn empty_report_is_tool_error() {
        let v = Verdict::from_report(&RunReport::default());
        assert_eq!(v.status, VerdictStatus::Fail);
        assert_eq!(v.exit_code, EXIT_TOOL_ERROR);
    }

    #[test]
    fn assertion_failures_outrank_transport() {
        let v = Verdict::from_report(&report(&[
            record(false, FailureKind::Transport),
            record(false, FailureKind::Assertion),
            record(true, FailureKind::Assertion),
        ]));
        assert_eq!(v.exit_code, EXIT_ASSERTION);
        assert_eq!(v.reason, "2 of 3 cases failed: 1 assertion failures; 1 transport failures");
    }

    #[test]
    fn transport_only() {
        let v = Verdict::from_report(&report(&[record(false, FailureKind::Transport)]));
        assert_eq!(v.exit_code, EXIT_TRANSPORT);
    }

    #[test]
    fn merge_accumulates_same_group() {
        let mut r = report(&[record(true, FailureKind::Assertion)]);
        r.merge_groups([
            GroupSummary::from_records("crud", &[record(false, FailureKind::Assertion)]),
            GroupSummary::from_records("other", &[record(true, FailureKind::Assertion)]),
        ]);
        assert_eq!(r.groups.len(), 2);
        assert_eq!(r.groups[0].total, 2);
        assert_eq!(r.groups[0].failed, 1);
        assert_eq!(r.groups[0].failures.len(), 1);
        assert_eq!(r.total(), 3);
        assert_eq!(r.passed(), 2);
    }
}
