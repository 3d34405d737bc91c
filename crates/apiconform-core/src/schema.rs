//! Structural schema model: JSON Schema / OpenAPI subset compiled into
//! [`SchemaConstraint`] nodes.
//!
//! Raw schemas are `$ref`-resolved against `components.schemas` and the root
//! schema's `$defs` first, so a
//! compiled [`Schema`] is self-contained. The resolved JSON is kept alongside
//! the typed tree and used with `jsonschema` when a branch condition has to be
//! evaluated against a concrete value (`if`/`then`/`else`).

use serde_json::json;

use crate::value::Value;

/// Maximum recursion depth for `$ref` resolution (circular refs).
const MAX_DEPTH: u32 = 20;

/// JSON primitive type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "null" => Self::Null,
            "boolean" => Self::Boolean,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "string" => Self::String,
            "array" => Self::Array,
            "object" => Self::Object,
            _ => return None,
        })
    }
}

/// Numeric bounds as declared. Exclusive bounds are stored numerically
/// (OpenAPI 3.0 boolean flags are normalized during resolution).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericRange {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,
}

impl NumericRange {
    #[must_use]
    pub fn contains(&self, n: f64) -> bool {
        self.minimum.is_none_or(|m| n >= m)
            && self.maximum.is_none_or(|m| n <= m)
            && self.exclusive_minimum.is_none_or(|m| n > m)
            && self.exclusive_maximum.is_none_or(|m| n < m)
            && self.multiple_of.is_none_or(|m| is_multiple(n, m))
    }

    fn step(integer: bool) -> f64 {
        if integer { 1.0 } else { 0.5 }
    }

    /// Lowest conforming value: the lower bound when there is one, else zero
    /// (pulled under an upper bound if zero is out of range).
    #[must_use]
    pub fn smallest(&self, integer: bool) -> f64 {
        let step = Self::step(integer);
        let mut start = match (self.minimum, self.exclusive_minimum) {
            (Some(min), Some(ex)) => min.max(next_above(ex, integer, step)),
            (Some(min), None) => min,
            (None, Some(ex)) => next_above(ex, integer, step),
            (None, None) => {
                let upper = match (self.maximum, self.exclusive_maximum) {
                    (Some(max), Some(ex)) => Some(max.min(ex - step)),
                    (Some(max), None) => Some(max),
                    (None, Some(ex)) => Some(ex - step),
                    (None, None) => None,
                };
                upper.map_or(0.0, |u| u.min(0.0))
            }
        };
        if integer {
            start = start.ceil();
        }
        if let Some(m) = self.multiple_of.filter(|m| *m > 0.0) {
            if !is_multiple(start, m) {
                start = (start / m).ceil() * m;
            }
        }
        start
    }

    /// A value of the same numeric kind just outside the declared range.
    /// Lower bounds are tried first, then upper bounds, then `multipleOf`.
    #[must_use]
    pub fn outside(&self, integer: bool) -> Option<f64> {
        let step = Self::step(integer);
        if let Some(ex) = self.exclusive_minimum {
            return Some(if integer && ex.fract() != 0.0 { ex.floor() } else { ex });
        }
        if let Some(min) = self.minimum {
            return Some(if integer { min.ceil() - 1.0 } else { min - step });
        }
        if let Some(ex) = self.exclusive_maximum {
            return Some(if integer && ex.fract() != 0.0 { ex.ceil() } else { ex });
        }
        if let Some(max) = self.maximum {
            return Some(if integer { max.floor() + 1.0 } else { max + step });
        }
        let m = self.multiple_of.filter(|m| *m > 0.0)?;
        let base = self.smallest(integer);
        let candidate = if integer { base + 1.0 } else { base + m / 2.0 };
        (!is_multiple(candidate, m)).then_some(candidate)
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn next_above(ex: f64, integer: bool, step: f64) -> f64 {
    if integer { ex.floor() + 1.0 } else { ex + step }
}

fn is_multiple(n: f64, m: f64) -> bool {
    if m == 0.0 {
        return true;
    }
    let q = n / m;
    (q - q.round()).abs() < 1e-9
}

/// One structural constraint node.
#[derive(Debug, Clone)]
pub enum SchemaConstraint {
    Type(Vec<JsonType>),
    RequiredFields(Vec<String>),
    Const(Value),
    Enum(Vec<Value>),
    AllOf(Vec<Schema>),
    OneOf(Vec<Schema>),
    AnyOf(Vec<Schema>),
    IfThenElse {
        condition: Box<Schema>,
        then: Option<Box<Schema>>,
        otherwise: Option<Box<Schema>>,
    },
    /// `unevaluatedProperties: <bool>`
    UnevaluatedProperties(bool),
    Pattern(String),
    NumericRange(NumericRange),
    StringLength { min: Option<u64>, max: Option<u64> },
}

/// A compiled schema node.
#[derive(Debug, Clone)]
pub struct Schema {
    pub constraints: Vec<SchemaConstraint>,
    /// Declared properties in document order.
    pub properties: Vec<(String, Schema)>,
    pub items: Option<Box<Schema>>,
    pub min_items: Option<u64>,
    pub format: Option<String>,
    /// `example`, first of `examples`, or `default`
    pub example: Option<Value>,
    raw: serde_json::Value,
}

impl Default for Schema {
    fn default() -> Self {
        Self::any()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("unresolvable $ref '{0}'")]
    UnresolvedRef(String),
    #[error("$ref nesting deeper than {MAX_DEPTH} (circular reference?)")]
    RefDepth,
    #[error("invalid schema at {path}: {message}")]
    Invalid { path: String, message: String },
}

impl Schema {
    /// Schema accepting anything.
    #[must_use]
    pub fn any() -> Self {
        Self {
            constraints: Vec::new(),
            properties: Vec::new(),
            items: None,
            min_items: None,
            format: None,
            example: None,
            raw: json!({}),
        }
    }

    /// Plain `{"type": "string"}`, the default for parameters without a schema.
    #[must_use]
    pub fn string() -> Self {
        Self {
            constraints: vec![SchemaConstraint::Type(vec![JsonType::String])],
            raw: json!({"type": "string"}),
            ..Self::any()
        }
    }

    /// Resolve `$ref`s against `components` (name → schema) and the root's
    /// `$defs`, then compile.
    ///
    /// # Errors
    ///
    /// Returns error on unresolvable or circular refs, unknown types, or a
    /// schema `jsonschema` refuses to compile.
    pub fn compile(
        raw: &serde_json::Value,
        components: &serde_json::Value,
    ) -> Result<Self, SchemaError> {
        let empty = json!({});
        let refs = Refs {
            components,
            defs: raw.get("$defs").unwrap_or(&empty),
        };
        let resolved = resolve(raw, &refs, 0)?;
        jsonschema::validator_for(&resolved).map_err(|e| SchemaError::Invalid {
            path: "#".into(),
            message: e.to_string(),
        })?;
        from_resolved(&resolved, "#")
    }

    /// The `$ref`-free JSON form.
    #[must_use]
    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    /// Validate a concrete value against this schema.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        jsonschema::validator_for(&self.raw).is_ok_and(|v| v.is_valid(&value.to_json()))
    }

    /// Declared types, or the type implied by structure.
    #[must_use]
    pub fn primary_type(&self) -> Option<JsonType> {
        for c in &self.constraints {
            if let SchemaConstraint::Type(types) = c {
                if let Some(t) = types.iter().find(|t| **t != JsonType::Null) {
                    return Some(*t);
                }
                return types.first().copied();
            }
        }
        if !self.properties.is_empty() || !self.required_fields().is_empty() {
            return Some(JsonType::Object);
        }
        if self.items.is_some() {
            return Some(JsonType::Array);
        }
        if let Some(c) = self.const_value() {
            return value_type(c);
        }
        self.enum_values().and_then(|e| e.first()).and_then(value_type)
    }

    #[must_use]
    pub fn is_integer(&self) -> bool {
        self.primary_type() == Some(JsonType::Integer)
    }

    /// Required field names of this node and of every `allOf` branch, unioned
    /// in declaration order.
    #[must_use]
    pub fn required_fields(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for c in &self.constraints {
            match c {
                SchemaConstraint::RequiredFields(fields) => {
                    for f in fields {
                        if !out.contains(f) {
                            out.push(f.clone());
                        }
                    }
                }
                SchemaConstraint::AllOf(branches) => {
                    for b in branches {
                        for f in b.required_fields() {
                            if !out.contains(&f) {
                                out.push(f);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// Property schema by name, looking through `allOf` branches.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Schema> {
        if let Some((_, s)) = self.properties.iter().find(|(n, _)| n == name) {
            return Some(s);
        }
        self.all_of().iter().find_map(|b| b.property(name))
    }

    #[must_use]
    pub fn all_of(&self) -> &[Schema] {
        self.branches(|c| match c {
            SchemaConstraint::AllOf(b) => Some(b),
            _ => None,
        })
    }

    /// First `oneOf` / `anyOf` list, whichever is declared first.
    #[must_use]
    pub fn alternatives(&self) -> &[Schema] {
        self.branches(|c| match c {
            SchemaConstraint::OneOf(b) | SchemaConstraint::AnyOf(b) => Some(b),
            _ => None,
        })
    }

    fn branches(&self, pick: impl Fn(&SchemaConstraint) -> Option<&Vec<Schema>>) -> &[Schema] {
        self.constraints
            .iter()
            .find_map(pick)
            .map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn const_value(&self) -> Option<&Value> {
        self.constraints.iter().find_map(|c| match c {
            SchemaConstraint::Const(v) => Some(v),
            _ => None,
        })
    }

    #[must_use]
    pub fn enum_values(&self) -> Option<&[Value]> {
        self.constraints.iter().find_map(|c| match c {
            SchemaConstraint::Enum(v) => Some(v.as_slice()),
            _ => None,
        })
    }

    #[must_use]
    pub fn numeric_range(&self) -> Option<&NumericRange> {
        self.constraints.iter().find_map(|c| match c {
            SchemaConstraint::NumericRange(r) => Some(r),
            _ => None,
        })
    }

    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        self.constraints.iter().find_map(|c| match c {
            SchemaConstraint::Pattern(p) => Some(p.as_str()),
            _ => None,
        })
    }

    #[must_use]
    pub fn string_length(&self) -> (Option<u64>, Option<u64>) {
        self.constraints
            .iter()
            .find_map(|c| match c {
                SchemaConstraint::StringLength { min, max } => Some((*min, *max)),
                _ => None,
            })
            .unwrap_or((None, None))
    }

    /// `(if, then, else)` triples declared on this node.
    pub fn conditionals(
        &self,
    ) -> impl Iterator<Item = (&Schema, Option<&Schema>, Option<&Schema>)> {
        self.constraints.iter().filter_map(|c| match c {
            SchemaConstraint::IfThenElse {
                condition,
                then,
                otherwise,
            } => Some((condition.as_ref(), then.as_deref(), otherwise.as_deref())),
            _ => None,
        })
    }

    /// Whether `unevaluatedProperties: false` closes this node.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c, SchemaConstraint::UnevaluatedProperties(false)))
    }
}

fn value_type(v: &Value) -> Option<JsonType> {
    Some(match v {
        Value::Null => JsonType::Null,
        Value::Bool(_) => JsonType::Boolean,
        Value::Number(n) if n.is_i64() || n.is_u64() => JsonType::Integer,
        Value::Number(_) => JsonType::Number,
        Value::String(_) => JsonType::String,
        Value::Sequence(_) => JsonType::Array,
        Value::Mapping(_) => JsonType::Object,
    })
}

/// Resolve `#/components/schemas/<name>` against `components` and
/// `#/$defs/<name>` against `defs`.
#[must_use]
pub fn resolve_ref(
    ref_str: &str,
    components: &serde_json::Value,
    defs: &serde_json::Value,
) -> Option<serde_json::Value> {
    if let Some(name) = ref_str.strip_prefix("#/components/schemas/") {
        return components.get(name).cloned();
    }
    ref_str
        .strip_prefix("#/$defs/")
        .and_then(|name| defs.get(name).cloned())
}

/// Ref targets visible while compiling one root schema.
struct Refs<'a> {
    components: &'a serde_json::Value,
    defs: &'a serde_json::Value,
}

/// Recursively inline `$ref`s. Siblings of a `$ref` are overlaid on the
/// resolved target. OpenAPI 3.0 boolean `exclusiveMinimum`/`exclusiveMaximum`
/// are rewritten to the numeric form. `$defs` is dropped once inlined.
fn resolve(
    schema: &serde_json::Value,
    refs: &Refs<'_>,
    depth: u32,
) -> Result<serde_json::Value, SchemaError> {
    if depth > MAX_DEPTH {
        return Err(SchemaError::RefDepth);
    }
    match schema {
        serde_json::Value::Object(obj) => {
            if let Some(ref_str) = obj.get("$ref").and_then(|v| v.as_str()) {
                let target = resolve_ref(ref_str, refs.components, refs.defs)
                    .ok_or_else(|| SchemaError::UnresolvedRef(ref_str.to_string()))?;
                let mut merged = match resolve(&target, refs, depth + 1)? {
                    serde_json::Value::Object(m) => m,
                    other => return Ok(other),
                };
                for (k, v) in obj.iter().filter(|(k, _)| *k != "$ref") {
                    merged.insert(k.clone(), resolve(v, refs, depth + 1)?);
                }
                return Ok(normalize_exclusive(serde_json::Value::Object(merged)));
            }
            let mut out = serde_json::Map::new();
            for (k, v) in obj.iter().filter(|(k, _)| *k != "$defs") {
                // `const`/`enum`/`example` hold data, not schemas
                let resolved = if matches!(k.as_str(), "const" | "enum" | "example" | "examples" | "default") {
                    v.clone()
                } else {
                    resolve(v, refs, depth + 1)?
                };
                out.insert(k.clone(), resolved);
            }
            Ok(normalize_exclusive(serde_json::Value::Object(out)))
        }
        serde_json::Value::Array(arr) => Ok(serde_json::Value::Array(
            arr.iter()
                .map(|v| resolve(v, refs, depth + 1))
                .collect::<Result<_, _>>()?,
        )),
        other => Ok(other.clone()),
    }
}

fn normalize_exclusive(mut schema: serde_json::Value) -> serde_json::Value {
    let Some(obj) = schema.as_object_mut() else {
        return schema;
    };
    for (flag, bound) in [
        ("exclusiveMinimum", "minimum"),
        ("exclusiveMaximum", "maximum"),
    ] {
        if let Some(exclusive) = obj.get(flag).and_then(serde_json::Value::as_bool) {
            obj.remove(flag);
            if exclusive {
                if let Some(b) = obj.remove(bound) {
                    obj.insert(flag.to_string(), b);
                }
            }
        }
    }
    schema
}

fn invalid(path: &str, message: impl Into<String>) -> SchemaError {
    SchemaError::Invalid {
        path: path.to_string(),
        message: message.into(),
    }
}

fn from_resolved(raw: &serde_json::Value, path: &str) -> Result<Schema, SchemaError> {
    let obj = match raw {
        serde_json::Value::Bool(_) => {
            return Ok(Schema {
                raw: raw.clone(),
                ..Schema::any()
            });
        }
        serde_json::Value::Object(obj) => obj,
        _ => return Err(invalid(path, "schema must be an object or boolean")),
    };

    let mut constraints = Vec::new();

    if let Some(t) = obj.get("type") {
        let names: Vec<&str> = match t {
            serde_json::Value::String(s) => vec![s.as_str()],
            serde_json::Value::Array(arr) => arr.iter().filter_map(|v| v.as_str()).collect(),
            _ => return Err(invalid(path, "'type' must be a string or array")),
        };
        let types = names
            .iter()
            .map(|n| JsonType::parse(n).ok_or_else(|| invalid(path, format!("unknown type '{n}'"))))
            .collect::<Result<Vec<_>, _>>()?;
        constraints.push(SchemaConstraint::Type(types));
    }

    if let Some(req) = obj.get("required").and_then(|v| v.as_array()) {
        let fields: Vec<String> = req
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();
        if !fields.is_empty() {
            constraints.push(SchemaConstraint::RequiredFields(fields));
        }
    }

    if let Some(c) = obj.get("const") {
        constraints.push(SchemaConstraint::Const(Value::from(c.clone())));
    }

    if let Some(e) = obj.get("enum") {
        let values = e
            .as_array()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| invalid(path, "'enum' must be a non-empty array"))?;
        constraints.push(SchemaConstraint::Enum(
            values.iter().cloned().map(Value::from).collect(),
        ));
    }

    for (key, wrap) in [
        ("allOf", SchemaConstraint::AllOf as fn(Vec<Schema>) -> SchemaConstraint),
        ("oneOf", SchemaConstraint::OneOf),
        ("anyOf", SchemaConstraint::AnyOf),
    ] {
        if let Some(list) = obj.get(key) {
            let arr = list
                .as_array()
                .ok_or_else(|| invalid(path, format!("'{key}' must be an array")))?;
            let branches = arr
                .iter()
                .enumerate()
                .map(|(i, s)| from_resolved(s, &format!("{path}/{key}/{i}")))
                .collect::<Result<Vec<_>, _>>()?;
            constraints.push(wrap(branches));
        }
    }

    if let Some(cond) = obj.get("if") {
        let sub = |k: &str| -> Result<Option<Box<Schema>>, SchemaError> {
            obj.get(k)
                .map(|s| from_resolved(s, &format!("{path}/{k}")).map(Box::new))
                .transpose()
        };
        constraints.push(SchemaConstraint::IfThenElse {
            condition: Box::new(from_resolved(cond, &format!("{path}/if"))?),
            then: sub("then")?,
            otherwise: sub("else")?,
        });
    }

    if let Some(b) = obj.get("unevaluatedProperties").and_then(|v| v.as_bool()) {
        constraints.push(SchemaConstraint::UnevaluatedProperties(b));
    }

    if let Some(p) = obj.get("pattern").and_then(|v| v.as_str()) {
        constraints.push(SchemaConstraint::Pattern(p.to_string()));
    }

    let num = |k: &str| obj.get(k).and_then(serde_json::Value::as_f64);
    let range = NumericRange {
        minimum: num("minimum"),
        maximum: num("maximum"),
        exclusive_minimum: num("exclusiveMinimum"),
        exclusive_maximum: num("exclusiveMaximum"),
        multiple_of: num("multipleOf"),
    };
    if !range.is_empty() {
        constraints.push(SchemaConstraint::NumericRange(range));
    }

    let min_len = obj.get("minLength").and_then(serde_json::Value::as_u64);
    let max_len = obj.get("maxLength").and_then(serde_json::Value::as_u64);
    if min_len.is_some() || max_len.is_some() {
        constraints.push(SchemaConstraint::StringLength {
            min: min_len,
            max: max_len,
        });
    }

    let properties = match obj.get("properties") {
        Some(serde_json::Value::Object(props)) => props
            .iter()
            .map(|(name, s)| {
                from_resolved(s, &format!("{path}/properties/{name}")).map(|c| (name.clone(), c))
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(invalid(path, "'properties' must be an object")),
        None => Vec::new(),
    };

    let items = match obj.get("items") {
        Some(s @ (serde_json::Value::Object(_) | serde_json::Value::Bool(_))) => {
            Some(Box::new(from_resolved(s, &format!("{path}/items"))?))
        }
        _ => None,
    };

    let example = obj
        .get("example")
        .or_else(|| {
            obj.get("examples")
                .and_then(|e| e.as_array())
                .and_then(|a| a.first())
        })
        .or_else(|| obj.get("default"))
        .cloned()
        .map(Value::from);

    Ok(Schema {
        constraints,
        properties,
        items,
        min_items: obj.get("minItems").and_then(serde_json::Value::as_u64),
        format: obj.get("format").and_then(|v| v.as_str()).map(String::from),
        example,
        raw: raw.clone(),
    })
}
