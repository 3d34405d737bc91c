//! Compiled endpoint model
//!
//! [`EndpointSpec`]s are produced from scenario files by
//! [`crate::scenario::ScenarioFile::compile`] and validated before any request
//! is built. Everything here is immutable once compiled.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::schema::{JsonType, Schema};
use crate::serialize::{Escape, Style};
use crate::value::Value;

/// Where a parameter travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Path,
    Query,
    Header,
    Cookie,
}

impl Location {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP method token, upper-cased. Any RFC 9110 token is accepted so
/// uncommon verbs can be exercised.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Method(String);

impl Method {
    pub const GET: &'static str = "GET";
    pub const HEAD: &'static str = "HEAD";

    /// Parse a method token.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let is_tchar = |c: char| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c);
        (!s.is_empty() && s.chars().all(is_tchar)).then(|| Self(s.to_ascii_uppercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request body media type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ContentType {
    #[default]
    #[serde(rename = "application/json")]
    Json,
    #[serde(rename = "application/merge-patch+json")]
    MergePatchJson,
    #[serde(rename = "application/vnd.api+json")]
    ApiJson,
    #[serde(rename = "application/x-www-form-urlencoded")]
    Form,
    #[serde(rename = "text/plain")]
    Text,
}

impl ContentType {
    #[must_use]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::MergePatchJson => "application/merge-patch+json",
            Self::ApiJson => "application/vnd.api+json",
            Self::Form => "application/x-www-form-urlencoded",
            Self::Text => "text/plain",
        }
    }

    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json | Self::MergePatchJson | Self::ApiJson)
    }
}

/// One declared parameter with its defaults applied.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub location: Location,
    pub style: Style,
    pub explode: bool,
    /// Always `true` for path parameters.
    pub required: bool,
    pub allow_reserved: bool,
    pub schema: Schema,
    pub example: Option<Value>,
}

impl Parameter {
    /// Escaping rule for this parameter's location.
    #[must_use]
    pub fn escape(&self) -> Escape {
        match self.location {
            Location::Header => Escape::Raw,
            Location::Query if self.allow_reserved => Escape::AllowReserved,
            _ => Escape::Reserved,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BodySpec {
    pub content_type: ContentType,
    pub required: bool,
    pub schema: Schema,
    pub example: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct EndpointSpec {
    pub method: Method,
    /// Path template with `{name}` placeholders.
    pub path: String,
    pub parameters: Vec<Parameter>,
    pub body: Option<BodySpec>,
    pub follow_redirects: bool,
}

impl EndpointSpec {
    /// Case identity prefix, e.g. `POST /documents/{id}`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    pub fn params_in(&self, location: Location) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter(move |p| p.location == location)
    }

    /// Placeholder names in template order.
    ///
    /// # Errors
    ///
    /// Returns error on an unbalanced or empty `{}`.
    pub fn placeholders(&self) -> Result<Vec<&str>, ScenarioError> {
        let malformed = || ScenarioError::MalformedTemplate(self.label());
        let mut names = Vec::new();
        let mut rest = self.path.as_str();
        while let Some(open) = rest.find(['{', '}']) {
            if rest.as_bytes()[open] == b'}' {
                return Err(malformed());
            }
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(malformed)?;
            let name = &after[..close];
            if name.is_empty() || name.contains('{') {
                return Err(malformed());
            }
            names.push(name);
            rest = &after[close + 1..];
        }
        Ok(names)
    }

    /// Build-time checks: placeholder/parameter correspondence, duplicate
    /// parameters, style legality per location and value shape.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let endpoint = self.label();
        let placeholders = self.placeholders()?;

        for name in &placeholders {
            if !self.params_in(Location::Path).any(|p| p.name == *name) {
                return Err(ScenarioError::UnmatchedPlaceholder {
                    endpoint,
                    name: (*name).to_string(),
                });
            }
        }

        for (i, p) in self.parameters.iter().enumerate() {
            let duplicate = self.parameters[..i].iter().any(|q| {
                q.location == p.location
                    && if p.location == Location::Header {
                        q.name.eq_ignore_ascii_case(&p.name)
                    } else {
                        q.name == p.name
                    }
            });
            if duplicate {
                return Err(ScenarioError::DuplicateParameter {
                    endpoint,
                    name: p.name.clone(),
                    location: p.location,
                });
            }
            if p.location == Location::Path && !placeholders.contains(&p.name.as_str()) {
                return Err(ScenarioError::OrphanPathParameter {
                    endpoint,
                    name: p.name.clone(),
                });
            }
            if !p.style.allowed_in(p.location) {
                return Err(ScenarioError::IllegalStyle {
                    endpoint,
                    name: p.name.clone(),
                    style: p.style,
                    location: p.location,
                });
            }
            let is_object = p.schema.primary_type() == Some(JsonType::Object);
            let shape_error = match p.style {
                Style::DeepObject if !p.explode => Some("deepObject requires explode=true"),
                Style::DeepObject if !is_object => Some("deepObject requires an object schema"),
                Style::SpaceDelimited | Style::PipeDelimited if p.explode && is_object => {
                    Some("delimited styles cannot explode an object")
                }
                _ => None,
            };
            if let Some(reason) = shape_error {
                return Err(ScenarioError::IllegalShape {
                    endpoint,
                    name: p.name.clone(),
                    reason,
                });
            }
        }
        Ok(())
    }
}

/// Schema identifier sent in the schema header and echoed in the stub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SchemaId {
    Int(i64),
    Text(String),
}

impl SchemaId {
    /// An identifier guaranteed to differ from `self`.
    #[must_use]
    pub fn different(&self) -> Self {
        match self {
            Self::Int(n) => Self::Int(n.wrapping_add(1)),
            Self::Text(s) => Self::Text(format!("{s}-mismatch")),
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(n) => Value::from_i64(*n),
            Self::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl std::fmt::Display for SchemaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Default acknowledgement body: `{"summary":[{"schema_id":<id>,"status_code":200}]}`.
#[must_use]
pub fn default_stub(id: &SchemaId) -> Value {
    Value::from(serde_json::json!({
        "summary": [{"schema_id": id.to_value().to_json(), "status_code": 200}]
    }))
}

/// Ordered endpoints whose cases run sequentially and share path bindings.
#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    pub endpoints: Vec<EndpointSpec>,
}

/// Immutable per-run scenario.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub schema_header: String,
    pub schema_id: SchemaId,
    /// Always differs from `schema_id`.
    pub wrong_schema_id: SchemaId,
    /// Required identity headers (tenant, user, ...).
    pub identity_headers: Vec<(String, String)>,
    /// Required session cookies.
    pub cookies: Vec<(String, String)>,
    /// Headers sent with every request that are not a negative axis.
    pub extra_headers: Vec<(String, String)>,
    pub expected_stub: Value,
    pub groups: Vec<Group>,
}

impl Scenario {
    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.groups.iter().map(|g| g.endpoints.len()).sum()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("Cannot read {0}: {1}")]
    Io(std::path::PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),
    #[error("{0}: malformed path template")]
    MalformedTemplate(String),
    #[error("{endpoint}: placeholder '{{{name}}}' has no path parameter")]
    UnmatchedPlaceholder { endpoint: String, name: String },
    #[error("{endpoint}: path parameter '{name}' has no placeholder")]
    OrphanPathParameter { endpoint: String, name: String },
    #[error("{endpoint}: duplicate {location} parameter '{name}'")]
    DuplicateParameter {
        endpoint: String,
        name: String,
        location: Location,
    },
    #[error("{endpoint}: style {style} is not allowed for {location} parameter '{name}'")]
    IllegalStyle {
        endpoint: String,
        name: String,
        style: Style,
        location: Location,
    },
    #[error("{endpoint}: parameter '{name}': {reason}")]
    IllegalShape {
        endpoint: String,
        name: String,
        reason: &'static str,
    },
    #[error("{at}: {source}")]
    Schema {
        at: String,
        source: crate::schema::SchemaError,
    },
    #[error("wrong schema id '{0}' equals the valid schema id")]
    WrongIdNotDifferent(SchemaId),
    #[error("config header '{0}' would override a header that negative cases mutate")]
    ShadowedHeader(String),
    #[error("scenario has no endpoints")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, location: Location) -> Parameter {
        let style = Style::default_for(location);
        Parameter {
            name: name.into(),
            location,
            style,
            explode: style.default_explode(),
            required: true,
            allow_reserved: false,
            schema: Schema::string(),
            example: None,
        }
    }

    fn endpoint(path: &str, parameters: Vec<Parameter>) -> EndpointSpec {
        EndpointSpec {
            method: Method::parse("get").unwrap(),
            path: path.into(),
            parameters,
            body: None,
            follow_redirects: false,
        }
    }

    #[test]
    fn method_tokens() {
        assert_eq!(Method::parse("patch").unwrap().as_str(), "PATCH");
        assert_eq!(Method::parse("PROPFIND").unwrap().as_str(), "PROPFIND");
        assert!(Method::parse("").is_none());
        assert!(Method::parse("GE T").is_none());
    }

    #[test]
    fn placeholders_in_order() {
        let ep = endpoint("/orgs/{org}/docs/{id}", vec![]);
        assert_eq!(ep.placeholders().unwrap(), vec!["org", "id"]);
    }

    #[test]
    fn malformed_templates() {
        for path in ["/a/{id", "/a/}id{", "/a/{}", "/a/{{id}}"] {
            let ep = endpoint(path, vec![]);
            assert!(
                matches!(ep.placeholders(), Err(ScenarioError::MalformedTemplate(_))),
                "{path}"
            );
        }
    }

    #[test]
    fn valid_endpoint_passes() {
        let ep = endpoint(
            "/docs/{id}",
            vec![param("id", Location::Path), param("q", Location::Query)],
        );
        ep.validate().unwrap();
    }

    #[test]
    fn unmatched_placeholder_is_rejected() {
        let ep = endpoint("/docs/{id}", vec![]);
        assert!(matches!(
            ep.validate(),
            Err(ScenarioError::UnmatchedPlaceholder { name, .. }) if name == "id"
        ));
    }

    #[test]
    fn orphan_path_param_is_rejected() {
        let ep = endpoint("/docs", vec![param("id", Location::Path)]);
        assert!(matches!(
            ep.validate(),
            Err(ScenarioError::OrphanPathParameter { .. })
        ));
    }

    #[test]
    fn duplicate_header_names_compare_case_insensitively() {
        let ep = endpoint(
            "/docs",
            vec![param("X-Trace", Location::Header), param("x-trace", Location::Header)],
        );
        assert!(matches!(
            ep.validate(),
            Err(ScenarioError::DuplicateParameter { .. })
        ));
    }

    #[test]
    fn matrix_in_query_is_rejected() {
        let mut p = param("m", Location::Query);
        p.style = Style::Matrix;
        let ep = endpoint("/docs", vec![p]);
        assert!(matches!(ep.validate(), Err(ScenarioError::IllegalStyle { .. })));
    }

    #[test]
    fn deep_object_needs_object_schema() {
        let mut p = param("filter", Location::Query);
        p.style = Style::DeepObject;
        p.explode = true;
        let ep = endpoint("/docs", vec![p]);
        assert!(matches!(ep.validate(), Err(ScenarioError::IllegalShape { .. })));
    }

    #[test]
    fn schema_id_different_never_equal() {
        let int = SchemaId::Int(30);
        assert_ne!(int.different(), int);
        let text = SchemaId::Text("contract-a".into());
        assert_ne!(text.different(), text);
    }

    #[test]
    fn default_stub_shape() {
        let stub = default_stub(&SchemaId::Int(30));
        assert_eq!(stub.to_string(), r#"{"summary":[{"schema_id":30,"status_code":200}]}"#);
    }
}
