//! Verdict module - conformance check, failure detail, summaries and policy

mod check;
mod failure;
mod policy;
mod summary;

pub use check::{CheckVerdict, check, matches_stub};
pub use failure::{Expectation, Failure, FailureDetail, FailureKind, RequestSnapshot};
pub use policy::{
    EXIT_ASSERTION, EXIT_PASS, EXIT_TOOL_ERROR, EXIT_TRANSPORT, Verdict, VerdictStatus,
};
pub use summary::{CaseRecord, GroupSummary, RunReport};
