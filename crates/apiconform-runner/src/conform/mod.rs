//! Scenario execution
//!
//! Loads and compiles the scenario, generates every case up front so that
//! configuration errors surface before the first request, then runs one OS
//! thread per virtual user. Each thread owns its generator, dispatcher and
//! result log; logs are merged only after all threads have joined.

mod cases;
mod dispatch;

use std::time::Duration;

use tracing::{debug, info, warn};

use apiconform_core::config::Config;
use apiconform_core::dump::Interaction;
use apiconform_core::endpoint::{EndpointSpec, Group, Scenario, ScenarioError};
use apiconform_core::outcome::CaseIdentity;
use apiconform_core::plan::{CasePlan, DryRunPlan, EndpointPlan, Validation, ValidationStatus};
use apiconform_core::scenario::ScenarioFile;
use apiconform_core::serialize::SerializeError;
use apiconform_core::verdict::{
    CaseRecord, CheckVerdict, Failure, GroupSummary, RequestSnapshot, RunReport, check,
};

pub use cases::{Case, CaseGenerator};
pub use dispatch::Dispatcher;

/// Seed of the preflight generator when the run itself is unseeded.
const PREFLIGHT_SEED: u64 = 0;

/// Lifecycle of one case inside a virtual user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    Pending,
    Dispatching,
    Checked,
    Recorded,
}

impl std::fmt::Display for CaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Dispatching => "dispatching",
            Self::Checked => "checked",
            Self::Recorded => "recorded",
        })
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub report: RunReport,
    /// Concatenated per-VU result logs, in VU order
    pub records: Vec<CaseRecord>,
    /// Full request/response pairs; empty unless collection was enabled
    pub interactions: Vec<Interaction>,
}

/// One virtual user's append-only log.
#[derive(Default)]
struct VuLog {
    records: Vec<CaseRecord>,
    summaries: Vec<GroupSummary>,
    interactions: Vec<Interaction>,
}

pub struct ScenarioRunner {
    scenario: Scenario,
    base_url: String,
    timeout: Duration,
    vus: u32,
    iterations: u32,
    seed: Option<u64>,
    collect_interactions: bool,
}

impl ScenarioRunner {
    /// Load, compile and configure the scenario named by `config`.
    ///
    /// # Errors
    ///
    /// Returns error if the scenario cannot be read, parsed or compiled,
    /// or the config overrides make it invalid.
    pub fn from_config(config: &Config) -> Result<Self, RunnerError> {
        let file = ScenarioFile::load(&config.scenario)?;
        let scenario = config.apply(file.compile()?)?;
        Ok(Self::new(scenario, &config.base_url)
            .with_timeout(Duration::from_secs(config.timeout_secs))
            .with_vus(config.vus)
            .with_iterations(config.iterations)
            .with_seed(config.seed)
            .with_interactions(config.dump))
    }

    #[must_use]
    pub fn new(scenario: Scenario, base_url: impl Into<String>) -> Self {
        Self {
            scenario,
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
            vus: 1,
            iterations: 1,
            seed: None,
            collect_interactions: false,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_vus(mut self, vus: u32) -> Self {
        self.vus = vus;
        self
    }

    #[must_use]
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Keep full request/response pairs for dumping.
    #[must_use]
    pub fn with_interactions(mut self, collect: bool) -> Self {
        self.collect_interactions = collect;
        self
    }

    #[must_use]
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Generate every case without sending anything.
    ///
    /// # Errors
    ///
    /// Returns error if a case cannot be built.
    pub fn plan(&self, config: &Config) -> Result<DryRunPlan, RunnerError> {
        let mut generator =
            CaseGenerator::new(&self.scenario, Some(self.seed.unwrap_or(PREFLIGHT_SEED)));
        let mut endpoints = Vec::new();
        let mut cases_per_iteration: u64 = 0;

        for group in &self.scenario.groups {
            generator.start_group();
            for endpoint in &group.endpoints {
                let cases: Vec<CasePlan> = generator
                    .cases(endpoint)?
                    .into_iter()
                    .map(|case| CasePlan {
                        label: case.outcome.label(),
                        reason: case.outcome.fault().map(|f| f.reason),
                        method: case.request.method().to_string(),
                        target: case.request.target(),
                    })
                    .collect();
                cases_per_iteration += cases.len() as u64;
                endpoints.push(EndpointPlan {
                    group: group.name.clone(),
                    endpoint: endpoint.label(),
                    cases,
                });
            }
        }

        let mut validations = apiconform_core::plan::validate_config(config);
        validations.push(Validation {
            check: "scenario_endpoints".into(),
            status: ValidationStatus::Ok,
            message: format!(
                "{} endpoints in {} groups",
                self.scenario.endpoint_count(),
                self.scenario.groups.len()
            ),
        });

        Ok(DryRunPlan {
            scenario: self.scenario.name.clone(),
            endpoints,
            cases_per_iteration,
            total_requests: cases_per_iteration
                * u64::from(self.vus)
                * u64::from(self.iterations),
            validations,
        })
    }

    /// Run every group for every virtual user and iteration.
    ///
    /// # Errors
    ///
    /// Returns error before any request is sent if the settings are invalid,
    /// a case cannot be built, or the HTTP client cannot be created.
    pub fn run(&self) -> Result<RunOutput, RunnerError> {
        if self.vus == 0 || self.iterations == 0 {
            return Err(RunnerError::Settings(format!(
                "vus and iterations must be at least 1 (vus={}, iterations={})",
                self.vus, self.iterations
            )));
        }

        let mut preflight =
            CaseGenerator::new(&self.scenario, Some(self.seed.unwrap_or(PREFLIGHT_SEED)));
        for group in &self.scenario.groups {
            preflight.start_group();
            for endpoint in &group.endpoints {
                preflight.cases(endpoint)?;
            }
        }
        // Surface client construction errors before spawning.
        Dispatcher::new(&self.base_url, self.timeout)?;

        info!(
            scenario = %self.scenario.name,
            base_url = %self.base_url,
            vus = self.vus,
            iterations = self.iterations,
            "starting run"
        );

        let logs: Vec<Result<VuLog, RunnerError>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..self.vus)
                .map(|vu| s.spawn(move || self.run_vu(vu)))
                .collect();
            handles
                .into_iter()
                .zip(0..self.vus)
                .map(|(handle, vu)| {
                    handle
                        .join()
                        .unwrap_or(Err(RunnerError::WorkerPanicked(vu)))
                })
                .collect()
        });

        let mut output = RunOutput {
            report: RunReport {
                scenario: self.scenario.name.clone(),
                base_url: self.base_url.clone(),
                vus: self.vus,
                iterations: self.iterations,
                groups: Vec::new(),
            },
            ..RunOutput::default()
        };
        for log in logs {
            let log = log?;
            output.report.merge_groups(log.summaries);
            output.records.extend(log.records);
            output.interactions.extend(log.interactions);
        }

        info!(
            total = output.report.total(),
            passed = output.report.passed(),
            "run complete"
        );
        Ok(output)
    }

    fn run_vu(&self, vu: u32) -> Result<VuLog, RunnerError> {
        let dispatcher = Dispatcher::new(&self.base_url, self.timeout)?;
        let seed = self.seed.map(|s| s.wrapping_add(u64::from(vu)));
        let mut generator = CaseGenerator::new(&self.scenario, seed);
        let mut log = VuLog::default();

        for iteration in 0..self.iterations {
            for group in &self.scenario.groups {
                generator.start_group();
                let first = log.records.len();
                for endpoint in &group.endpoints {
                    for case in generator.cases(endpoint)? {
                        let record = self.execute(&dispatcher, group, endpoint, case, vu, iteration, &mut log);
                        log.records.push(record);
                    }
                }
                let summary = GroupSummary::from_records(&group.name, &log.records[first..]);
                info!(
                    vu,
                    iteration,
                    group = %group.name,
                    passed = summary.passed,
                    failed = summary.failed,
                    "group complete"
                );
                log.summaries.push(summary);
            }
        }
        Ok(log)
    }

    #[allow(clippy::too_many_arguments)]
    fn execute(
        &self,
        dispatcher: &Dispatcher,
        group: &Group,
        endpoint: &EndpointSpec,
        case: Case,
        vu: u32,
        iteration: u32,
        log: &mut VuLog,
    ) -> CaseRecord {
        let identity = CaseIdentity {
            group: group.name.clone(),
            method: endpoint.method.to_string(),
            path_template: endpoint.path.clone(),
            outcome: case.outcome,
        };
        debug!(vu, case = %identity, state = %CaseState::Pending);

        debug!(vu, case = %identity, target = %case.request.target(), state = %CaseState::Dispatching);
        let response = dispatcher.dispatch(&case.request);
        if let Some(error) = &response.transport_error {
            warn!(vu, case = %identity, %error, "transport failure");
        }

        let verdict = check(&identity.outcome, &self.scenario.expected_stub, &response);
        let passed = verdict.is_pass();
        debug!(vu, case = %identity, status = response.status, passed, state = %CaseState::Checked);

        let request = RequestSnapshot::capture(&case.request, dispatcher.base_url());
        let failure = match verdict {
            CheckVerdict::Pass => None,
            CheckVerdict::Fail(detail) => Some(Failure {
                case: identity.clone(),
                detail,
                request: request.clone(),
                vu,
                iteration,
            }),
        };

        let record = CaseRecord {
            case: identity.clone(),
            status: response.status,
            elapsed_ms: response.elapsed.as_secs_f64() * 1000.0,
            passed,
            failure,
        };
        if self.collect_interactions {
            log.interactions.push(Interaction {
                vu,
                iteration,
                case: identity,
                request,
                response,
                passed,
            });
        }
        debug!(vu, case = %record.case, state = %CaseState::Recorded);
        record
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error("{endpoint}: {source}")]
    Serialize {
        endpoint: String,
        source: SerializeError,
    },
    #[error("HTTP client error: {0}")]
    Client(String),
    #[error("virtual user {0} panicked")]
    WorkerPanicked(u32),
    #[error("Invalid settings: {0}")]
    Settings(String),
}
