//! Project configuration for conformance runs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::endpoint::{Location, Scenario, ScenarioError, SchemaId, default_stub};

/// Environment variable overriding `base_url`.
pub const BASE_URL_ENV: &str = "BASE_URL";

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scenario file path (YAML, JSON or TOML)
    pub scenario: PathBuf,

    /// Base URL of the service under test
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Parallel virtual users
    pub vus: u32,

    /// Iterations per virtual user
    pub iterations: u32,

    /// RNG seed for reproducible runs (random when unset)
    pub seed: Option<u64>,

    /// Extra headers sent with every request (auth, tracing, ...)
    pub headers: BTreeMap<String, String>,

    /// Session cookies added to the scenario's required cookies
    pub cookies: BTreeMap<String, String>,

    /// Override the scenario's schema header name
    pub schema_header: Option<String>,

    /// Override the scenario's schema identifier
    pub schema_id: Option<SchemaId>,

    /// Override the identifier used by wrong-header-value negatives
    pub wrong_schema_id: Option<SchemaId>,

    /// Dump every case interaction to JSONL files
    pub dump: bool,

    /// Directory for dump files (default: ".apiconform/dumps")
    pub dump_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scenario: PathBuf::from("scenario.yaml"),
            base_url: "http://localhost:8282".to_string(),
            timeout_secs: 10,
            vus: 1,
            iterations: 1,
            seed: None,
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
            schema_header: None,
            schema_id: None,
            wrong_schema_id: None,
            dump: false,
            dump_dir: None,
        }
    }
}

impl Config {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Load from default location (.apiconform.toml)
    ///
    /// # Errors
    ///
    /// Returns error if a candidate file exists but cannot be read or parsed
    pub fn load_default() -> Result<Self, ConfigError> {
        let candidates = [".apiconform.toml", ".apiconform.json", "apiconform.toml"];

        for name in candidates {
            let path = Path::new(name);
            if path.exists() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Apply `BASE_URL` from the environment, if set and non-empty.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_base_url_override(std::env::var(BASE_URL_ENV).ok())
    }

    #[must_use]
    pub fn with_base_url_override(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.base_url = url;
        }
        self
    }

    /// Layer config overrides onto a compiled scenario.
    ///
    /// # Errors
    ///
    /// Returns error if the resulting wrong schema id equals the valid one, or
    /// if a config header shares its name with a header the scenario mutates.
    pub fn apply(&self, mut scenario: Scenario) -> Result<Scenario, ScenarioError> {
        if let Some(header) = &self.schema_header {
            scenario.schema_header.clone_from(header);
        }
        if let Some(id) = &self.schema_id {
            let stub_was_default = scenario.expected_stub == default_stub(&scenario.schema_id);
            scenario.schema_id = id.clone();
            if stub_was_default {
                scenario.expected_stub = default_stub(id);
            }
            if scenario.wrong_schema_id == *id {
                scenario.wrong_schema_id = id.different();
            }
        }
        if let Some(wrong) = &self.wrong_schema_id {
            scenario.wrong_schema_id = wrong.clone();
        }
        if scenario.wrong_schema_id == scenario.schema_id {
            return Err(ScenarioError::WrongIdNotDifferent(
                scenario.wrong_schema_id.clone(),
            ));
        }
        for (name, value) in &self.cookies {
            match scenario.cookies.iter_mut().find(|(k, _)| k == name) {
                Some(slot) => slot.1.clone_from(value),
                None => scenario.cookies.push((name.clone(), value.clone())),
            }
        }
        for name in self.headers.keys() {
            if shadows_negative_axis(&scenario, name) {
                return Err(ScenarioError::ShadowedHeader(name.clone()));
            }
        }
        scenario.extra_headers = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(scenario)
    }

    /// Dump directory, defaulting under `.apiconform/`.
    #[must_use]
    pub fn dump_dir(&self) -> PathBuf {
        self.dump_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(".apiconform/dumps"))
    }

    /// Create example config file
    #[must_use]
    pub fn example() -> &'static str {
        r#"# apiconform configuration

# Scenario file (YAML, JSON or TOML)
scenario = "scenario.yaml"

# Service under test (BASE_URL overrides)
base_url = "http://localhost:8282"

# Per-request timeout in seconds
timeout_secs = 10

# Parallel virtual users and iterations per user
vus = 1
iterations = 1

# Fixed RNG seed for reproducible runs
# seed = 42

# Headers sent with every request (not a negative-test axis; must not reuse
# the schema header, identity header or header parameter names)
[headers]
# Authorization = "Bearer your-token-here"

# Session cookies (each becomes a missing-cookie negative case)
[cookies]
# session = "abc123"

# Schema identifier overrides
# schema_header = "X-Schema-ID"
# schema_id = 30
# wrong_schema_id = 999

# Dump all case interactions to JSONL files (default: false)
# dump = true
# dump_dir = ".apiconform/dumps"
"#
    }
}

/// Whether `name` is a header some negative case drops or rewrites.
fn shadows_negative_axis(scenario: &Scenario, name: &str) -> bool {
    let same = |other: &str| other.eq_ignore_ascii_case(name);
    same(&scenario.schema_header)
        || same("cookie")
        || scenario.identity_headers.iter().any(|(k, _)| same(k))
        || scenario
            .groups
            .iter()
            .flat_map(|g| &g.endpoints)
            .flat_map(|e| e.params_in(Location::Header))
            .any(|p| same(&p.name))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
}
