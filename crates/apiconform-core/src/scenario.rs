//! Scenario file format (YAML, JSON or TOML) and compilation into a
//! validated [`Scenario`].

use std::collections::BTreeMap;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::endpoint::{
    BodySpec, ContentType, EndpointSpec, Group, Location, Method, Parameter, Scenario,
    ScenarioError, SchemaId, default_stub,
};
use crate::schema::Schema;
use crate::serialize::Style;
use crate::value::Value;

fn default_schema_header() -> String {
    "X-Schema-ID".to_string()
}

/// Top-level scenario document.
///
/// ```yaml
/// name: documents
/// schema_id: 30
/// identity_headers:
///   X-Tenant-ID: acme
/// groups:
///   - name: create
///     endpoints:
///       - method: POST
///         path: /documents
///         body:
///           required: true
///           schema: { $ref: "#/components/schemas/Document" }
/// components:
///   schemas:
///     Document: { type: object, required: [title], properties: { title: { type: string } } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScenarioFile {
    pub name: String,

    /// Identifier sent in the schema header and echoed by the stub
    pub schema_id: SchemaId,

    /// Identifier used by wrong-header-value negatives (default: derived)
    #[serde(default)]
    pub wrong_schema_id: Option<SchemaId>,

    #[serde(default = "default_schema_header")]
    pub schema_header: String,

    /// Required identity headers, each a negative axis
    #[serde(default)]
    pub identity_headers: BTreeMap<String, String>,

    /// Required session cookies, each a negative axis
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,

    /// Expected positive response body (default: schema-id stub)
    #[serde(default)]
    pub expected_stub: Option<serde_json::Value>,

    #[serde(default)]
    pub components: ComponentsDef,

    pub groups: Vec<GroupDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ComponentsDef {
    /// Named schemas addressable as `#/components/schemas/<name>`
    #[serde(default)]
    pub schemas: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GroupDef {
    pub name: String,
    pub endpoints: Vec<EndpointDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EndpointDef {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDef>,
    #[serde(default)]
    pub body: Option<BodyDef>,
    #[serde(default)]
    pub follow_redirects: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ParameterDef {
    pub name: String,
    #[serde(rename = "in")]
    pub location: Location,
    /// Default: `simple` for path/header, `form` for query/cookie
    #[serde(default)]
    pub style: Option<Style>,
    /// Default: `true` for `form`, else `false`
    #[serde(default)]
    pub explode: Option<bool>,
    /// Ignored for path parameters (always required)
    #[serde(default)]
    pub required: bool,
    #[serde(default, alias = "allowReserved")]
    pub allow_reserved: bool,
    /// JSON Schema (default: `{"type": "string"}`)
    #[serde(default)]
    pub schema: Option<serde_json::Value>,
    #[serde(default)]
    pub example: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BodyDef {
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub schema: Option<serde_json::Value>,
    #[serde(default)]
    pub example: Option<serde_json::Value>,
}

/// On-disk encoding of a scenario file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
    Toml,
}

impl Format {
    /// From file extension, `None` when unknown.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    /// JSON if the document starts with `{`, YAML otherwise.
    #[must_use]
    pub fn sniff(content: &str) -> Self {
        if content.trim_start().starts_with('{') {
            Self::Json
        } else {
            Self::Yaml
        }
    }
}

impl ScenarioFile {
    /// Load a scenario file, choosing the format by extension.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScenarioError::Io(path.to_path_buf(), e.to_string()))?;
        let format = Format::from_path(path).unwrap_or_else(|| Format::sniff(&content));
        Self::parse(&content, format)
    }

    /// # Errors
    ///
    /// Returns error if `content` is not a valid scenario document.
    pub fn parse(content: &str, format: Format) -> Result<Self, ScenarioError> {
        let parse = |e: String| ScenarioError::Parse(e);
        match format {
            Format::Yaml => serde_yml::from_str(content).map_err(|e| parse(e.to_string())),
            Format::Json => serde_json::from_str(content).map_err(|e| parse(e.to_string())),
            Format::Toml => toml::from_str(content).map_err(|e| parse(e.to_string())),
        }
    }

    /// Resolve schemas, apply parameter defaults and validate every endpoint.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error; nothing is dispatched for a
    /// scenario that fails to compile.
    pub fn compile(&self) -> Result<Scenario, ScenarioError> {
        let components = serde_json::Value::Object(self.components.schemas.clone());

        let wrong_schema_id = match &self.wrong_schema_id {
            Some(id) if *id == self.schema_id => {
                return Err(ScenarioError::WrongIdNotDifferent(id.clone()));
            }
            Some(id) => id.clone(),
            None => self.schema_id.different(),
        };

        let groups = self
            .groups
            .iter()
            .map(|g| {
                let endpoints = g
                    .endpoints
                    .iter()
                    .map(|e| compile_endpoint(e, &components))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Group {
                    name: g.name.clone(),
                    endpoints,
                })
            })
            .collect::<Result<Vec<_>, ScenarioError>>()?;

        if groups.iter().all(|g| g.endpoints.is_empty()) {
            return Err(ScenarioError::Empty);
        }

        Ok(Scenario {
            name: self.name.clone(),
            schema_header: self.schema_header.clone(),
            schema_id: self.schema_id.clone(),
            wrong_schema_id,
            identity_headers: self.identity_headers.clone().into_iter().collect(),
            cookies: self.cookies.clone().into_iter().collect(),
            extra_headers: Vec::new(),
            expected_stub: self
                .expected_stub
                .clone()
                .map_or_else(|| default_stub(&self.schema_id), Value::from),
            groups,
        })
    }
}

/// JSON Schema of the scenario file format.
#[must_use]
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(ScenarioFile);
    serde_json::to_string_pretty(&schema).expect("schema serialization should not fail")
}

fn compile_schema(
    raw: Option<&serde_json::Value>,
    components: &serde_json::Value,
    at: impl Fn() -> String,
) -> Result<Schema, ScenarioError> {
    match raw {
        Some(raw) => {
            Schema::compile(raw, components).map_err(|source| ScenarioError::Schema { at: at(), source })
        }
        None => Ok(Schema::string()),
    }
}

fn compile_endpoint(
    def: &EndpointDef,
    components: &serde_json::Value,
) -> Result<EndpointSpec, ScenarioError> {
    let method =
        Method::parse(&def.method).ok_or_else(|| ScenarioError::InvalidMethod(def.method.clone()))?;
    let label = format!("{method} {}", def.path);

    let parameters = def
        .parameters
        .iter()
        .map(|p| {
            let style = p.style.unwrap_or(Style::default_for(p.location));
            Ok(Parameter {
                name: p.name.clone(),
                location: p.location,
                style,
                explode: p.explode.unwrap_or(style.default_explode()),
                required: p.required || p.location == Location::Path,
                allow_reserved: p.allow_reserved,
                schema: compile_schema(p.schema.as_ref(), components, || {
                    format!("{label}: {} parameter '{}'", p.location, p.name)
                })?,
                example: p.example.clone().map(Value::from),
            })
        })
        .collect::<Result<Vec<_>, ScenarioError>>()?;

    let body = def
        .body
        .as_ref()
        .map(|b| {
            let schema = match &b.schema {
                Some(_) => compile_schema(b.schema.as_ref(), components, || format!("{label}: body"))?,
                None => Schema::any(),
            };
            Ok::<_, ScenarioError>(BodySpec {
                content_type: b.content_type,
                required: b.required,
                schema,
                example: b.example.clone().map(Value::from),
            })
        })
        .transpose()?;

    let endpoint = EndpointSpec {
        method,
        path: def.path.clone(),
        parameters,
        body,
        follow_redirects: def.follow_redirects,
    };
    endpoint.validate()?;
    Ok(endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENTS: &str = r##"
name: documents
schema_id: 30
identity_headers:
  X-Tenant-ID: acme
groups:
  - name: crud
    endpoints:
      - method: post
        path: /documents
        body:
          required: true
          schema: { $ref: "#/components/schemas/Document" }
      - method: GET
        path: /documents/{id}
        parameters:
          - { name: id, in: path, schema: { type: string, format: uuid } }
          - { name: fields, in: query, style: pipeDelimited, explode: false, schema: { type: array, items: { type: string } } }
components:
  schemas:
    Document:
      type: object
      required: [title]
      properties:
        title: { type: string, minLength: 1 }
"##;

    #[test]
    fn compiles_yaml_scenario() {
        let file = ScenarioFile::parse(DOCUMENTS, Format::Yaml).unwrap();
        let scenario = file.compile().unwrap();

        assert_eq!(scenario.schema_header, "X-Schema-ID");
        assert_eq!(scenario.schema_id, SchemaId::Int(30));
        assert_eq!(scenario.wrong_schema_id, SchemaId::Int(31));
        assert_eq!(scenario.endpoint_count(), 2);

        let create = &scenario.groups[0].endpoints[0];
        assert_eq!(create.label(), "POST /documents");
        let body = create.body.as_ref().unwrap();
        assert_eq!(body.content_type, ContentType::Json);
        assert_eq!(body.schema.required_fields(), vec!["title"]);

        let read = &scenario.groups[0].endpoints[1];
        let id = &read.parameters[0];
        assert!(id.required);
        assert_eq!(id.style, Style::Simple);
        assert_eq!(id.schema.format.as_deref(), Some("uuid"));
        assert_eq!(read.parameters[1].style, Style::PipeDelimited);
        assert!(!read.parameters[1].explode);
    }

    #[test]
    fn default_stub_uses_schema_id() {
        let scenario = ScenarioFile::parse(DOCUMENTS, Format::Yaml)
            .unwrap()
            .compile()
            .unwrap();
        assert_eq!(
            scenario.expected_stub.to_string(),
            r#"{"summary":[{"schema_id":30,"status_code":200}]}"#
        );
    }

    #[test]
    fn wrong_id_equal_to_valid_is_rejected() {
        let mut file = ScenarioFile::parse(DOCUMENTS, Format::Yaml).unwrap();
        file.wrong_schema_id = Some(SchemaId::Int(30));
        assert!(matches!(
            file.compile(),
            Err(ScenarioError::WrongIdNotDifferent(_))
        ));
    }

    #[test]
    fn unresolvable_ref_is_a_build_error() {
        let mut file = ScenarioFile::parse(DOCUMENTS, Format::Yaml).unwrap();
        file.components.schemas.clear();
        let err = file.compile().unwrap_err();
        assert!(err.to_string().contains("POST /documents: body"), "{err}");
    }

    #[test]
    fn json_and_toml_formats() {
        let json = r#"{"name":"n","schema_id":"contract-a","groups":[{"name":"g","endpoints":[{"method":"GET","path":"/ping"}]}]}"#;
        assert_eq!(Format::sniff(json), Format::Json);
        let scenario = ScenarioFile::parse(json, Format::Json).unwrap().compile().unwrap();
        assert_eq!(scenario.schema_id, SchemaId::Text("contract-a".into()));

        let toml = r#"
name = "n"
schema_id = 7
[[groups]]
name = "g"
[[groups.endpoints]]
method = "DELETE"
path = "/items/{id}"
[[groups.endpoints.parameters]]
name = "id"
in = "path"
schema = { type = "integer" }
"#;
        let scenario = ScenarioFile::parse(toml, Format::Toml).unwrap().compile().unwrap();
        assert_eq!(scenario.groups[0].endpoints[0].label(), "DELETE /items/{id}");
    }

    #[test]
    fn load_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.yml");
        std::fs::write(&path, DOCUMENTS).unwrap();
        let file = ScenarioFile::load(&path).unwrap();
        assert_eq!(file.name, "documents");
    }

    #[test]
    fn generated_schema_has_title() {
        let parsed: serde_json::Value = serde_json::from_str(&generate_schema()).unwrap();
        assert_eq!(
            parsed.get("title").and_then(|v| v.as_str()),
            Some("ScenarioFile")
        );
    }

    #[test]
    fn empty_scenario_is_rejected() {
        let json = r#"{"name":"n","schema_id":1,"groups":[]}"#;
        let file = ScenarioFile::parse(json, Format::Json).unwrap();
        assert!(matches!(file.compile(), Err(ScenarioError::Empty)));
    }
}
