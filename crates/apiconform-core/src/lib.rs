//! apiconform-core: endpoint model, parameter serializer and conformance verdicts
//!
//! This crate holds the pure parts of a conformance run: the tagged value
//! model, OpenAPI parameter serialization, scenario compilation and
//! validation, request descriptors, and the checker that judges responses
//! against the stub body.

pub mod config;
pub mod descriptor;
pub mod dump;
pub mod endpoint;
pub mod outcome;
pub mod plan;
pub mod repro;
pub mod response;
pub mod scenario;
pub mod schema;
pub mod serialize;
pub mod value;
pub mod verdict;

pub use config::{Config, ConfigError};
pub use descriptor::{HeaderMap, RequestDescriptor};
pub use dump::{DumpError, DumpIndex, Interaction};
pub use endpoint::{EndpointSpec, Location, Method, Scenario, ScenarioError, SchemaId};
pub use outcome::{CaseIdentity, CaseOutcome, Fault, FaultDimension, FaultReason};
pub use plan::DryRunPlan;
pub use repro::to_http_file;
pub use response::{ResponseBody, ResponseRecord};
pub use scenario::ScenarioFile;
pub use schema::{Schema, SchemaConstraint};
pub use serialize::{Escape, SerializeError, Style};
pub use value::Value;
pub use verdict::{
    CheckVerdict, Failure, FailureKind, GroupSummary, RunReport, Verdict, VerdictStatus, check,
};
