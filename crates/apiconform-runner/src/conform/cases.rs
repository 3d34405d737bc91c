//! Case construction: one positive request per endpoint plus single-fault
//! negatives, each derived from the positive inputs by exactly one mutation.

use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::SmallRng;

use apiconform_core::descriptor::RequestDescriptor;
use apiconform_core::endpoint::{ContentType, EndpointSpec, Location, Parameter, Scenario};
use apiconform_core::outcome::{CaseOutcome, FaultDimension, FaultReason};
use apiconform_core::schema::{JsonType, Schema};
use apiconform_core::serialize::{self, Escape, Style};
use apiconform_core::value::{Map, Value};

use crate::datagen;

use super::RunnerError;

/// Nesting depth at which body mutation stops descending.
const MAX_DEPTH: u32 = 20;

/// A classified, fully built request.
#[derive(Debug, Clone)]
pub struct Case {
    pub outcome: CaseOutcome,
    pub request: RequestDescriptor,
}

/// Everything a request is rendered from. Negatives are clones of the
/// positive inputs with one field changed.
#[derive(Debug, Clone)]
struct Inputs {
    /// Per declared parameter, in declaration order; `None` when omitted
    params: Vec<Option<Value>>,
    /// Schema header first, then identity headers
    scenario_headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    body: Option<Value>,
    drop_first_path_segment: bool,
}

impl Inputs {
    fn with(&self, mutate: impl FnOnce(&mut Self)) -> Self {
        let mut next = self.clone();
        mutate(&mut next);
        next
    }
}

/// A body mutation relative to the node it was found at.
struct Mutation {
    reason: FaultReason,
    /// Relative location, e.g. `items[0].sku`; empty for the node itself
    target: String,
    /// Replacement for the whole node
    value: Value,
}

/// Per-virtual-user case factory. Owns its RNG and the path bindings of
/// the group being generated.
pub struct CaseGenerator<'s> {
    scenario: &'s Scenario,
    rng: SmallRng,
    bindings: HashMap<String, Value>,
}

impl<'s> CaseGenerator<'s> {
    /// `seed` makes generation reproducible; `None` seeds from entropy.
    #[must_use]
    pub fn new(scenario: &'s Scenario, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(SmallRng::from_entropy, SmallRng::seed_from_u64);
        Self {
            scenario,
            rng,
            bindings: HashMap::new(),
        }
    }

    /// Forget path bindings; call at the start of every group.
    pub fn start_group(&mut self) {
        self.bindings.clear();
    }

    /// Positive case first, then every applicable negative.
    ///
    /// # Errors
    ///
    /// Returns error if a generated value has no encoding in its
    /// parameter's style.
    pub fn cases(&mut self, endpoint: &EndpointSpec) -> Result<Vec<Case>, RunnerError> {
        let positive = self.positive_inputs(endpoint);
        let negatives = self.negative_inputs(endpoint, &positive);

        let mut cases = Vec::with_capacity(negatives.len() + 1);
        cases.push(Case {
            outcome: CaseOutcome::Positive,
            request: build(self.scenario, endpoint, &positive)?,
        });
        for (outcome, inputs) in negatives {
            cases.push(Case {
                request: build(self.scenario, endpoint, &inputs)?,
                outcome,
            });
        }
        Ok(cases)
    }

    fn param_value(&mut self, param: &Parameter) -> Value {
        match &param.example {
            Some(example) => example.clone(),
            None => datagen::minimal(&param.schema, &mut self.rng),
        }
    }

    fn positive_inputs(&mut self, endpoint: &EndpointSpec) -> Inputs {
        let mut params = Vec::with_capacity(endpoint.parameters.len());
        for param in &endpoint.parameters {
            let value = if param.location == Location::Path {
                if let Some(bound) = self.bindings.get(&param.name) {
                    Some(bound.clone())
                } else {
                    let value = self.param_value(param);
                    self.bindings.insert(param.name.clone(), value.clone());
                    Some(value)
                }
            } else if param.required {
                Some(self.param_value(param))
            } else {
                None
            };
            params.push(value);
        }

        let mut scenario_headers = vec![(
            self.scenario.schema_header.clone(),
            self.scenario.schema_id.to_string(),
        )];
        scenario_headers.extend(self.scenario.identity_headers.iter().cloned());

        let body = endpoint.body.as_ref().map(|spec| match &spec.example {
            Some(example) => example.clone(),
            None => datagen::minimal(&spec.schema, &mut self.rng),
        });

        Inputs {
            params,
            scenario_headers,
            cookies: self.scenario.cookies.clone(),
            body,
            drop_first_path_segment: false,
        }
    }

    fn negative_inputs(
        &mut self,
        endpoint: &EndpointSpec,
        positive: &Inputs,
    ) -> Vec<(CaseOutcome, Inputs)> {
        use FaultDimension::{Body, Headers, Path, Query};
        use FaultReason::{
            ConstViolation, EmptyBody, InvalidPathParam, MalformedId, MissingRequiredHeader,
            MissingRequiredQuery, RangeViolation, WrongHeaderValue,
        };

        let mut out = Vec::new();

        // Headers
        for (idx, (name, _)) in positive.scenario_headers.iter().enumerate() {
            out.push((
                CaseOutcome::negative(MissingRequiredHeader, Headers, name),
                positive.with(|i| {
                    i.scenario_headers.remove(idx);
                }),
            ));
            if idx == 0 {
                let wrong = self.scenario.wrong_schema_id.to_string();
                out.push((
                    CaseOutcome::negative(WrongHeaderValue, Headers, name),
                    positive.with(|i| i.scenario_headers[0].1 = wrong),
                ));
            }
        }
        for (idx, (name, _)) in positive.cookies.iter().enumerate() {
            out.push((
                CaseOutcome::negative(MissingRequiredHeader, Headers, format!("cookie:{name}")),
                positive.with(|i| {
                    i.cookies.remove(idx);
                }),
            ));
        }
        for (idx, param) in endpoint.parameters.iter().enumerate() {
            if !param.required {
                continue;
            }
            let outcome = match param.location {
                Location::Header => CaseOutcome::negative(MissingRequiredHeader, Headers, &param.name),
                Location::Cookie => CaseOutcome::negative(
                    MissingRequiredHeader,
                    Headers,
                    format!("cookie:{}", param.name),
                ),
                Location::Query => CaseOutcome::negative(MissingRequiredQuery, Query, &param.name),
                Location::Path => continue,
            };
            out.push((outcome, positive.with(|i| i.params[idx] = None)));
        }

        // Path
        for (idx, param) in endpoint.parameters.iter().enumerate() {
            if param.location != Location::Path {
                continue;
            }
            let Some(bad) = invalid_path_value(&param.schema) else {
                continue;
            };
            out.push((
                CaseOutcome::negative(InvalidPathParam, Path, &param.name),
                positive.with(|i| i.params[idx] = Some(bad)),
            ));
        }
        if let Some(segment) = endpoint.path.split('/').find(|s| s.contains('{')) {
            out.push((
                CaseOutcome::negative(MalformedId, Path, segment.replace(['{', '}'], "")),
                positive.with(|i| i.drop_first_path_segment = true),
            ));
        }

        // Parameter constraints
        for (idx, param) in endpoint.parameters.iter().enumerate() {
            let dimension = match param.location {
                Location::Path => Path,
                Location::Query => Query,
                Location::Header => Headers,
                Location::Cookie => continue,
            };
            if let Some(c) = param.schema.const_value() {
                let bad = violate_const(c);
                out.push((
                    CaseOutcome::negative(ConstViolation, dimension, &param.name),
                    positive.with(|i| i.params[idx] = Some(bad)),
                ));
            }
            if let Some(n) = param
                .schema
                .numeric_range()
                .and_then(|r| r.outside(param.schema.is_integer()))
            {
                let bad = number(n, param.schema.is_integer());
                out.push((
                    CaseOutcome::negative(RangeViolation, dimension, &param.name),
                    positive.with(|i| i.params[idx] = Some(bad)),
                ));
            }
        }

        // Body
        if let (Some(spec), Some(body)) = (&endpoint.body, &positive.body) {
            if spec.required && !spec.schema.required_fields().is_empty() {
                out.push((
                    CaseOutcome::negative(EmptyBody, Body, "body"),
                    positive.with(|i| i.body = Some(Value::empty_mapping())),
                ));
            }
            for m in body_mutations(&spec.schema, body, &mut self.rng, 0) {
                out.push((
                    CaseOutcome::negative(m.reason, Body, nest("body", &m.target)),
                    positive.with(|i| i.body = Some(m.value)),
                ));
            }
        }

        out
    }
}

fn invalid_path_value(schema: &Schema) -> Option<Value> {
    if let Some(values) = schema.enum_values() {
        return Some(out_of_enum(values));
    }
    if schema.format.as_deref() == Some("uuid") {
        return Some(Value::from("not-a-uuid"));
    }
    match schema.primary_type() {
        Some(JsonType::Integer | JsonType::Number) => Some(Value::from("not-a-number")),
        _ => None,
    }
}

fn out_of_enum(values: &[Value]) -> Value {
    let mut candidate = String::from("not-in-enum");
    while values.iter().any(|v| v.as_str() == Some(candidate.as_str())) {
        candidate.push_str("-x");
    }
    Value::from(candidate)
}

/// A value of the same kind that differs from `c`.
fn violate_const(c: &Value) -> Value {
    match c {
        Value::String(s) => Value::from(format!("{s}-invalid")),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Value::from_i64(i.wrapping_add(1)),
            None => Value::from_f64(n.as_f64().unwrap_or(0.0) + 1.0),
        },
        Value::Bool(b) => Value::Bool(!b),
        Value::Null => Value::from("not-null"),
        Value::Sequence(_) | Value::Mapping(_) => Value::Null,
    }
}

fn number(n: f64, integer: bool) -> Value {
    if integer {
        #[allow(clippy::cast_possible_truncation)]
        Value::from_i64(n as i64)
    } else {
        Value::from_f64(n)
    }
}

/// `body` + `items[0].sku` → `body.items[0].sku`
fn nest(prefix: &str, inner: &str) -> String {
    if inner.is_empty() {
        prefix.to_string()
    } else if inner.starts_with('[') || prefix.is_empty() {
        format!("{prefix}{inner}")
    } else {
        format!("{prefix}.{inner}")
    }
}

/// Every single-site body mutation reachable from `value` under `schema`.
fn body_mutations(
    schema: &Schema,
    value: &Value,
    rng: &mut SmallRng,
    depth: u32,
) -> Vec<Mutation> {
    let mut out = Vec::new();
    if depth > MAX_DEPTH {
        return out;
    }

    if let Some(c) = schema.const_value() {
        out.push(Mutation {
            reason: FaultReason::ConstViolation,
            target: String::new(),
            value: violate_const(c),
        });
    }
    if value.as_f64().is_some() {
        if let Some(n) = schema
            .numeric_range()
            .and_then(|r| r.outside(schema.is_integer()))
        {
            out.push(Mutation {
                reason: FaultReason::RangeViolation,
                target: String::new(),
                value: number(n, schema.is_integer()),
            });
        }
    }

    match value {
        Value::Mapping(map) => {
            for (key, child) in map.iter() {
                let Some(sub) = datagen::property(schema, key) else {
                    continue;
                };
                for m in body_mutations(sub, child, rng, depth + 1) {
                    let mut next = map.clone();
                    next.insert(key, m.value);
                    out.push(Mutation {
                        reason: m.reason,
                        target: nest(key, &m.target),
                        value: Value::Mapping(next),
                    });
                }
            }
            out.extend(if_then_violations(schema, map, rng));
            if schema.is_closed() {
                let mut key = String::from("unexpected_property");
                while map.contains_key(&key) {
                    key.push_str("_x");
                }
                let mut next = map.clone();
                next.insert(key.clone(), Value::from("a"));
                out.push(Mutation {
                    reason: FaultReason::UnevaluatedPropertyViolation,
                    target: key,
                    value: Value::Mapping(next),
                });
            }
        }
        Value::Sequence(seq) => {
            if let Some(items) = &schema.items {
                // Constraints inside an empty array are reached by
                // instantiating one minimal item.
                let (first, instantiated) = match seq.first() {
                    Some(first) => (first.clone(), false),
                    None => (datagen::minimal(items, rng), true),
                };
                for m in body_mutations(items, &first, rng, depth + 1) {
                    let mut next = seq.clone();
                    if instantiated {
                        next.push(m.value);
                    } else {
                        next[0] = m.value;
                    }
                    out.push(Mutation {
                        reason: m.reason,
                        target: nest("[0]", &m.target),
                        value: Value::Sequence(next),
                    });
                }
            }
        }
        _ => {}
    }

    out
}

/// Force each `if` to hold, then drop one field only its `then` requires.
fn if_then_violations(schema: &Schema, map: &Map, rng: &mut SmallRng) -> Vec<Mutation> {
    let base_required = schema.required_fields();
    let mut out = Vec::new();

    for (condition, then, _) in schema.conditionals() {
        let Some(then) = then else {
            continue;
        };
        let mut forced = map.clone();
        for (name, sub) in &condition.properties {
            if let Some(c) = sub.const_value() {
                forced.insert(name.clone(), c.clone());
            } else if let Some(first) = sub.enum_values().and_then(<[Value]>::first) {
                forced.insert(name.clone(), first.clone());
            }
        }
        for field in condition.required_fields().into_iter().chain(then.required_fields()) {
            if forced.contains_key(&field) {
                continue;
            }
            let value = match datagen::property(then, &field).or_else(|| datagen::property(schema, &field)) {
                Some(s) => datagen::minimal(s, rng),
                None => Value::from("a"),
            };
            forced.insert(field, value);
        }

        let Some(victim) = then
            .required_fields()
            .into_iter()
            .find(|f| !base_required.contains(f))
        else {
            continue;
        };
        forced.remove(&victim);

        if !condition.accepts(&Value::Mapping(forced.clone())) {
            continue;
        }
        out.push(Mutation {
            reason: FaultReason::IfThenViolation,
            target: victim,
            value: Value::Mapping(forced),
        });
    }
    out
}

/// Render `inputs` into a frozen descriptor.
fn build(
    scenario: &Scenario,
    endpoint: &EndpointSpec,
    inputs: &Inputs,
) -> Result<RequestDescriptor, RunnerError> {
    let encode = |param: &Parameter, value: &Value| {
        serialize::serialize(&param.name, value, param.style, param.explode, param.escape())
            .map_err(|source| RunnerError::Serialize {
                endpoint: endpoint.label(),
                source,
            })
    };
    let value_of = |name: &str, location: Location| {
        endpoint
            .parameters
            .iter()
            .zip(&inputs.params)
            .find(|(p, _)| p.location == location && p.name == name)
            .and_then(|(p, v)| v.as_ref().map(|v| (p, v)))
    };

    let mut path = Vec::new();
    let mut dropped = !inputs.drop_first_path_segment;
    for segment in endpoint.path.split('/') {
        if !dropped && segment.contains('{') {
            dropped = true;
            continue;
        }
        let mut rendered = String::new();
        let mut rest = segment;
        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').unwrap_or(after.len());
            if let Some((param, value)) = value_of(&after[..close], Location::Path) {
                rendered.push_str(&encode(param, value)?);
            }
            rest = after.get(close + 1..).unwrap_or("");
        }
        rendered.push_str(rest);
        path.push(rendered);
    }
    let mut path = path.join("/");
    if path.is_empty() {
        path.push('/');
    }

    let mut builder = RequestDescriptor::builder(endpoint.method.clone(), path)
        .follow_redirects(endpoint.follow_redirects);

    let mut headers: Vec<(String, String)> = inputs.scenario_headers.clone();
    headers.extend(scenario.extra_headers.iter().cloned());
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    for (name, value) in &inputs.cookies {
        builder = builder.cookie(name, value);
    }

    for (param, value) in endpoint.parameters.iter().zip(&inputs.params) {
        let Some(value) = value else { continue };
        builder = match param.location {
            Location::Path => builder,
            Location::Query => builder.query_fragment(&encode(param, value)?),
            Location::Header => builder.header(&param.name, encode(param, value)?),
            Location::Cookie => builder.cookie(&param.name, serialize::cookie_value(value)),
        };
    }

    if let (Some(spec), Some(value)) = (&endpoint.body, &inputs.body) {
        let bytes = encode_body(spec.content_type, value).map_err(|source| RunnerError::Serialize {
            endpoint: endpoint.label(),
            source,
        })?;
        builder = builder
            .header("Content-Type", spec.content_type.media_type())
            .body(bytes, spec.content_type);
    }

    Ok(builder.build())
}

fn encode_body(content_type: ContentType, value: &Value) -> Result<Vec<u8>, serialize::SerializeError> {
    Ok(match content_type {
        ContentType::Json | ContentType::MergePatchJson | ContentType::ApiJson => {
            value.to_json().to_string().into_bytes()
        }
        ContentType::Form => match value {
            Value::Mapping(map) if map.is_empty() => Vec::new(),
            Value::Mapping(_) => {
                serialize::serialize("", value, Style::Form, true, Escape::Reserved)?.into_bytes()
            }
            other => other.to_param_string().into_bytes(),
        },
        ContentType::Text => value.to_param_string().into_bytes(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiconform_core::scenario::{Format, ScenarioFile};

    const ORDERS: &str = r##"
name: orders
schema_id: 30
identity_headers:
  X-Tenant-ID: acme
cookies:
  session: abc
groups:
  - name: orders
    endpoints:
      - method: POST
        path: /orders
        parameters:
          - { name: X-Request-Mode, in: header, required: true, schema: { type: string, const: strict } }
          - { name: limit, in: query, required: true, schema: { type: integer, minimum: 1, maximum: 100 } }
        body:
          required: true
          schema: { $ref: "#/components/schemas/Order" }
      - method: GET
        path: /orders/{orderId}
        parameters:
          - { name: orderId, in: path, schema: { type: string, format: uuid } }
      - method: DELETE
        path: /orders/{orderId}
        parameters:
          - { name: orderId, in: path, schema: { type: string, format: uuid } }
components:
  schemas:
    Order:
      type: object
      required: [kind, quantity, lines]
      unevaluatedProperties: false
      properties:
        kind: { type: string, enum: [standard, express] }
        quantity: { type: integer, minimum: 1, maximum: 10 }
        currency: { type: string, const: EUR }
        deadline: { type: string, format: date }
        lines:
          type: array
          items:
            type: object
            required: [sku]
            unevaluatedProperties: false
            properties:
              sku: { type: string, pattern: "^[A-Z]{2}[0-9]{2}$" }
      if:
        properties: { kind: { const: express } }
        required: [kind]
      then:
        required: [deadline]
"##;

    fn scenario() -> Scenario {
        ScenarioFile::parse(ORDERS, Format::Yaml)
            .unwrap()
            .compile()
            .unwrap()
    }

    fn labels(cases: &[Case]) -> Vec<String> {
        cases.iter().map(|c| c.outcome.label()).collect()
    }

    #[test]
    fn positive_is_minimal_and_first() {
        let scenario = scenario();
        let mut generator = CaseGenerator::new(&scenario, Some(7));
        let cases = generator.cases(&scenario.groups[0].endpoints[0]).unwrap();

        let positive = &cases[0];
        assert!(positive.outcome.is_positive());
        let request = &positive.request;
        assert_eq!(request.target(), "/orders?limit=1");
        assert_eq!(request.headers().get("x-schema-id"), Some("30"));
        assert_eq!(request.headers().get("X-Tenant-ID"), Some("acme"));
        assert_eq!(request.headers().get("X-Request-Mode"), Some("strict"));
        assert_eq!(request.headers().get("Content-Type"), Some("application/json"));
        assert_eq!(request.cookie_header().as_deref(), Some("session=abc"));
        assert_eq!(
            request.body().unwrap().text(),
            r#"{"kind":"standard","quantity":1,"lines":[]}"#
        );
    }

    #[test]
    fn negatives_cover_every_applicable_reason() {
        let scenario = scenario();
        let mut generator = CaseGenerator::new(&scenario, Some(7));
        let labels = labels(&generator.cases(&scenario.groups[0].endpoints[0]).unwrap());

        for expected in [
            "missing-required-header(X-Schema-ID)",
            "wrong-header-value(X-Schema-ID)",
            "missing-required-header(X-Tenant-ID)",
            "missing-required-header(cookie:session)",
            "missing-required-header(X-Request-Mode)",
            "missing-required-query(limit)",
            "const-violation(X-Request-Mode)",
            "range-violation(limit)",
            "empty-body(body)",
            "range-violation(body.quantity)",
            "if-then-violation(body.deadline)",
            "unevaluated-property-violation(body.unexpected_property)",
            "unevaluated-property-violation(body.lines[0].unexpected_property)",
        ] {
            assert!(labels.iter().any(|l| l == expected), "missing {expected}: {labels:?}");
        }
    }

    #[test]
    fn each_negative_differs_in_exactly_its_dimension() {
        let scenario = scenario();
        let mut generator = CaseGenerator::new(&scenario, Some(11));
        for endpoint in &scenario.groups[0].endpoints {
            let cases = generator.cases(endpoint).unwrap();
            let positive = &cases[0].request;
            for case in &cases[1..] {
                let fault = case.outcome.fault().unwrap();
                assert_eq!(
                    case.request.differing_dimensions(positive),
                    vec![fault.dimension],
                    "{}",
                    case.outcome.label()
                );
            }
        }
    }

    #[test]
    fn config_headers_ride_along_without_touching_negatives() {
        let mut config = apiconform_core::Config::default();
        config.headers.insert("Authorization".into(), "Bearer t".into());
        let applied = config.apply(scenario()).unwrap();

        let mut generator = CaseGenerator::new(&applied, Some(5));
        let cases = generator.cases(&applied.groups[0].endpoints[0]).unwrap();
        let positive = &cases[0].request;
        for case in &cases[1..] {
            assert_eq!(case.request.headers().get("authorization"), Some("Bearer t"));
            assert_eq!(
                case.request.differing_dimensions(positive),
                vec![case.outcome.fault().unwrap().dimension],
                "{}",
                case.outcome.label()
            );
        }

        let mut shadowing = apiconform_core::Config::default();
        shadowing.headers.insert("X-Schema-ID".into(), "30".into());
        assert!(shadowing.apply(scenario()).is_err());
    }

    #[test]
    fn multiple_of_body_field_gets_a_range_violation() {
        let yaml = r#"
name: stock
schema_id: 30
groups:
  - name: stock
    endpoints:
      - method: PUT
        path: /stock
        body:
          required: true
          schema:
            type: object
            required: [qty]
            properties:
              qty: { type: integer, multipleOf: 5 }
"#;
        let scenario = ScenarioFile::parse(yaml, Format::Yaml)
            .unwrap()
            .compile()
            .unwrap();
        let mut generator = CaseGenerator::new(&scenario, Some(2));
        let cases = generator.cases(&scenario.groups[0].endpoints[0]).unwrap();

        assert_eq!(cases[0].request.body().unwrap().text(), r#"{"qty":0}"#);
        let violation = cases
            .iter()
            .find(|c| c.outcome.label() == "range-violation(body.qty)")
            .unwrap();
        assert_eq!(violation.request.body().unwrap().text(), r#"{"qty":1}"#);
    }

    #[test]
    fn wrong_schema_id_differs_from_valid() {
        let scenario = scenario();
        let mut generator = CaseGenerator::new(&scenario, Some(1));
        let cases = generator.cases(&scenario.groups[0].endpoints[0]).unwrap();
        let wrong = cases
            .iter()
            .find(|c| c.outcome.label() == "wrong-header-value(X-Schema-ID)")
            .unwrap();
        assert_eq!(wrong.request.headers().get("X-Schema-ID"), Some("31"));
    }

    #[test]
    fn path_values_are_shared_within_a_group() {
        let scenario = scenario();
        let mut generator = CaseGenerator::new(&scenario, Some(3));
        let read = generator.cases(&scenario.groups[0].endpoints[1]).unwrap();
        let delete = generator.cases(&scenario.groups[0].endpoints[2]).unwrap();
        assert_eq!(read[0].request.path(), delete[0].request.path());

        generator.start_group();
        let fresh = generator.cases(&scenario.groups[0].endpoints[1]).unwrap();
        assert_ne!(read[0].request.path(), fresh[0].request.path());
    }

    #[test]
    fn path_negatives() {
        let scenario = scenario();
        let mut generator = CaseGenerator::new(&scenario, Some(3));
        let cases = generator.cases(&scenario.groups[0].endpoints[1]).unwrap();

        let invalid = cases
            .iter()
            .find(|c| c.outcome.label() == "invalid-path-param(orderId)")
            .unwrap();
        assert_eq!(invalid.request.path(), "/orders/not-a-uuid");

        let malformed = cases
            .iter()
            .find(|c| c.outcome.label() == "malformed-id(orderId)")
            .unwrap();
        assert_eq!(malformed.request.path(), "/orders");
    }

    #[test]
    fn seeded_generation_is_deterministic() {
        let scenario = scenario();
        let endpoint = &scenario.groups[0].endpoints[1];
        let a = CaseGenerator::new(&scenario, Some(99)).cases(endpoint).unwrap();
        let b = CaseGenerator::new(&scenario, Some(99)).cases(endpoint).unwrap();
        assert_eq!(a[0].request, b[0].request);
    }

    #[test]
    fn nest_paths() {
        assert_eq!(nest("body", ""), "body");
        assert_eq!(nest("body", "lines[0].sku"), "body.lines[0].sku");
        assert_eq!(nest("lines", "[0].sku"), "lines[0].sku");
    }

    #[test]
    fn const_violation_keeps_kind() {
        assert_eq!(violate_const(&Value::from("EUR")), Value::from("EUR-invalid"));
        assert_eq!(violate_const(&Value::from_i64(3)), Value::from_i64(4));
        assert_eq!(violate_const(&Value::Bool(true)), Value::Bool(false));
    }

    #[test]
    fn form_body_encoding() {
        let value = Value::from(serde_json::json!({"name": "a b", "qty": 1}));
        let bytes = encode_body(ContentType::Form, &value).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "name=a%20b&qty=1");
        assert!(encode_body(ContentType::Form, &Value::empty_mapping()).unwrap().is_empty());
        assert_eq!(encode_body(ContentType::Text, &Value::from("hi")).unwrap(), b"hi");
    }
}
