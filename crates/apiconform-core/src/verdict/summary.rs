//! Per-group summaries and the merged run report

use serde::Serialize;

use super::failure::{Failure, FailureKind};
use crate::outcome::CaseIdentity;

/// One entry of a virtual user's append-only result log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseRecord {
    pub case: CaseIdentity,
    pub status: u16,
    pub elapsed_ms: f64,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group: String,
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub failures: Vec<Failure>,
}

impl GroupSummary {
    #[must_use]
    pub fn from_records(group: impl Into<String>, records: &[CaseRecord]) -> Self {
        let passed = records.iter().filter(|r| r.passed).count() as u64;
        Self {
            group: group.into(),
            total: records.len() as u64,
            passed,
            failed: records.len() as u64 - passed,
            failures: records.iter().filter_map(|r| r.failure.clone()).collect(),
        }
    }

    /// Fold another summary of the same group into this one.
    pub fn absorb(&mut self, other: Self) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
        self.failures.extend(other.failures);
    }
}

/// Everything a run observed, merged over virtual users and iterations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub scenario: String,
    pub base_url: String,
    pub vus: u32,
    pub iterations: u32,
    pub groups: Vec<GroupSummary>,
}

impl RunReport {
    /// Merge summaries group-by-group, keeping first-seen group order.
    pub fn merge_groups(&mut self, summaries: impl IntoIterator<Item = GroupSummary>) {
        for summary in summaries {
            match self.groups.iter_mut().find(|g| g.group == summary.group) {
                Some(existing) => existing.absorb(summary),
                None => self.groups.push(summary),
            }
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.groups.iter().map(|g| g.total).sum()
    }

    #[must_use]
    pub fn passed(&self) -> u64 {
        self.groups.iter().map(|g| g.passed).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &Failure> {
        self.groups.iter().flat_map(|g| g.failures.iter())
    }

    #[must_use]
    pub fn count_kind(&self, kind: FailureKind) -> usize {
        self.failures().filter(|f| f.kind() == kind).count()
    }
}
