//! Dry run plan types and config validation
//!
//! Describes the cases a run *would* send without sending any requests.
//! Used for pre-flight validation and CI previews.

use serde::Serialize;

use crate::Config;
use crate::outcome::FaultReason;

// ── Plan types ──

/// Complete dry run plan: cases per endpoint, totals, and validations.
#[derive(Debug, Clone, Serialize)]
pub struct DryRunPlan {
    pub scenario: String,
    pub endpoints: Vec<EndpointPlan>,
    /// Cases one iteration of one virtual user sends
    pub cases_per_iteration: u64,
    /// `cases_per_iteration * vus * iterations`
    pub total_requests: u64,
    pub validations: Vec<Validation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointPlan {
    pub group: String,
    /// Endpoint label, e.g. "POST /documents"
    pub endpoint: String,
    pub cases: Vec<CasePlan>,
}

/// One planned case.
#[derive(Debug, Clone, Serialize)]
pub struct CasePlan {
    /// `positive` or `<reason>(<target>)`
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FaultReason>,
    pub method: String,
    /// Rendered path and query
    pub target: String,
}

/// A validation check result.
#[derive(Debug, Clone, Serialize)]
pub struct Validation {
    pub check: String,
    pub status: ValidationStatus,
    pub message: String,
}

/// Status of a validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Ok,
    Warning,
    Error,
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

impl DryRunPlan {
    /// Format as human-readable terminal output.
    #[must_use]
    pub fn to_terminal(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "Dry run: {} endpoints, {} cases per iteration, {} requests planned\n",
            self.endpoints.len(),
            self.cases_per_iteration,
            self.total_requests,
        ));

        let mut group = None;
        for ep in &self.endpoints {
            if group != Some(ep.group.as_str()) {
                lines.push(format!("[{}]", ep.group));
                group = Some(ep.group.as_str());
            }
            lines.push(format!("  {} ({} cases):", ep.endpoint, ep.cases.len()));
            for case in &ep.cases {
                lines.push(format!("    {:<48} {} {}", case.label, case.method, case.target));
            }
        }
        lines.push(String::new());

        lines.push("Config validation:".into());
        for v in &self.validations {
            lines.push(format!("  [{}] {}", v.status, v.message));
        }

        lines.join("\n")
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.validations
            .iter()
            .any(|v| v.status == ValidationStatus::Error)
    }
}

// ── Config validation ──

/// Values that look like unfilled placeholders.
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-token",
    "YOUR_TOKEN",
    "CHANGEME",
    "changeme",
    "placeholder",
    "REPLACE_ME",
];

fn validation(check: &str, status: ValidationStatus, message: String) -> Validation {
    Validation {
        check: check.into(),
        status,
        message,
    }
}

/// Validate config and produce validation results.
#[must_use]
pub fn validate_config(config: &Config) -> Vec<Validation> {
    let mut checks = Vec::new();

    if config.scenario.exists() {
        checks.push(validation(
            "scenario",
            ValidationStatus::Ok,
            format!("scenario: {} (exists)", config.scenario.display()),
        ));
    } else {
        checks.push(validation(
            "scenario",
            ValidationStatus::Error,
            format!("scenario: {} (not found)", config.scenario.display()),
        ));
    }

    if config.base_url.starts_with("http://") || config.base_url.starts_with("https://") {
        checks.push(validation(
            "base_url",
            ValidationStatus::Ok,
            format!("base_url: {}", config.base_url),
        ));
    } else {
        checks.push(validation(
            "base_url",
            ValidationStatus::Warning,
            format!(
                "base_url: {} (missing http:// or https:// prefix)",
                config.base_url
            ),
        ));
    }

    for (key, value) in config.headers.iter().chain(config.cookies.iter()) {
        let angle = value.contains('<') && value.contains('>');
        if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| value.contains(**p)) {
            checks.push(validation(
                "headers",
                ValidationStatus::Warning,
                format!("{key}: contains '{pattern}', may be a placeholder"),
            ));
        } else if angle {
            checks.push(validation(
                "headers",
                ValidationStatus::Warning,
                format!("{key}: contains '<...>' placeholder"),
            ));
        }
    }

    if config.vus == 0 || config.iterations == 0 {
        checks.push(validation(
            "load",
            ValidationStatus::Error,
            format!(
                "vus={} iterations={} (both must be at least 1)",
                config.vus, config.iterations
            ),
        ));
    } else {
        checks.push(validation(
            "load",
            ValidationStatus::Ok,
            format!("vus={} iterations={}", config.vus, config.iterations),
        ));
    }

    if config.timeout_secs == 0 {
        checks.push(validation(
            "timeout",
            ValidationStatus::Error,
            "timeout_secs: 0 (must be positive)".into(),
        ));
    }

    checks
}
