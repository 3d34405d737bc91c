//! apiconform-runner: case generation, HTTP dispatch and scenario execution

pub mod conform;
pub mod datagen;

pub use conform::{Case, CaseGenerator, Dispatcher, RunOutput, RunnerError, ScenarioRunner};
