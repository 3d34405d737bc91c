//! Compiled schema → minimal conforming `Value`
//!
//! Produces the smallest value that satisfies every required constraint:
//! required fields only, shortest strings, lowest in-range numbers, the
//! first enum member or the const. `example`/`default` hints win over
//! synthesis. With `oneOf`/`anyOf`, branches are tried in order until the
//! whole schema accepts the value. Randomness is limited to formats that must be unique
//! (`uuid`) and comes from the caller's RNG.

use rand::Rng;

use apiconform_core::schema::{JsonType, Schema};
use apiconform_core::value::{Map, Value};

/// Maximum nesting depth for synthesis.
const MAX_DEPTH: u32 = 20;

/// Cap on `minLength` repetition.
const MAX_STRING_LEN: usize = 10_000;

/// Pattern candidates tried in order; the first one the schema accepts wins.
const PATTERN_CANDIDATES: &[&str] = &[
    "a",
    "A",
    "0",
    "abc",
    "ABC",
    "A_1",
    "a1",
    "abc-123",
    "2024-01-15",
    "2024-01-15T12:00:00Z",
    "12:00:00",
    "user@example.com",
    "https://example.com",
    "+14155550100",
    "AB12",
    "ab_cd",
];

/// Random UUID v4 string (`xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx`).
pub fn uuid_v4(rng: &mut impl Rng) -> String {
    uuid::Builder::from_random_bytes(rng.r#gen())
        .into_uuid()
        .hyphenated()
        .to_string()
}

/// Minimal value satisfying `schema`.
pub fn minimal(schema: &Schema, rng: &mut impl Rng) -> Value {
    minimal_inner(schema, rng, 0)
}

fn minimal_inner(schema: &Schema, rng: &mut impl Rng, depth: u32) -> Value {
    if depth > MAX_DEPTH {
        return Value::Null;
    }
    if let Some(example) = &schema.example {
        return example.clone();
    }
    if let Some(c) = schema.const_value() {
        return c.clone();
    }
    if let Some(values) = schema.enum_values() {
        if let Some(first) = values.iter().find(|v| !matches!(v, Value::Null)) {
            return first.clone();
        }
    }

    let is_object = schema.primary_type() == Some(JsonType::Object)
        || !schema.all_of().is_empty();
    if schema.alternatives().is_empty() {
        return synthesize(schema, None, is_object, rng, depth);
    }

    // `oneOf` must match exactly one branch, so each candidate is checked
    // against the whole schema.
    let mut fallback = None;
    for branch in branches(schema) {
        for candidate in branch_candidates(schema, branch, is_object, rng, depth) {
            if schema.accepts(&candidate) {
                return candidate;
            }
            fallback.get_or_insert(candidate);
        }
    }
    fallback.unwrap_or_else(|| synthesize(schema, None, is_object, rng, depth))
}

/// The branch's minimal value, then that value plus each property only the
/// branch declares.
fn branch_candidates(
    schema: &Schema,
    branch: &Schema,
    is_object: bool,
    rng: &mut impl Rng,
    depth: u32,
) -> Vec<Value> {
    let base = synthesize(schema, Some(branch), is_object, rng, depth);
    let mut out = Vec::new();
    if let Value::Mapping(map) = &base {
        for (name, sub) in &branch.properties {
            if map.contains_key(name) || schema.property(name).is_some() {
                continue;
            }
            let mut next = map.clone();
            next.insert(name.clone(), minimal_inner(sub, rng, depth + 1));
            out.push(Value::Mapping(next));
        }
    }
    out.insert(0, base);
    out
}

fn synthesize(
    schema: &Schema,
    branch: Option<&Schema>,
    is_object: bool,
    rng: &mut impl Rng,
    depth: u32,
) -> Value {
    if !is_object {
        if let Some(branch) = branch {
            return minimal_inner(branch, rng, depth + 1);
        }
    }

    match schema.primary_type() {
        Some(JsonType::String) => Value::from(minimal_string(schema, rng)),
        Some(JsonType::Integer) => {
            let n = schema.numeric_range().map_or(0.0, |r| r.smallest(true));
            #[allow(clippy::cast_possible_truncation)]
            Value::from_i64(n as i64)
        }
        Some(JsonType::Number) => {
            let n = schema.numeric_range().map_or(0.0, |r| r.smallest(false));
            Value::from_f64(n)
        }
        Some(JsonType::Boolean) => Value::Bool(false),
        Some(JsonType::Null) => Value::Null,
        Some(JsonType::Array) => {
            let count = schema.min_items.unwrap_or(0);
            let items = (0..count)
                .map(|_| match &schema.items {
                    Some(items) => minimal_inner(items, rng, depth + 1),
                    None => Value::from("a"),
                })
                .collect();
            Value::Sequence(items)
        }
        Some(JsonType::Object) => Value::Mapping(minimal_object(schema, branch, rng, depth)),
        None if is_object => Value::Mapping(minimal_object(schema, branch, rng, depth)),
        None => Value::from("a"),
    }
}

/// Non-null `oneOf`/`anyOf` branches in declaration order.
fn branches(schema: &Schema) -> impl Iterator<Item = &Schema> {
    schema
        .alternatives()
        .iter()
        .filter(|b| b.primary_type() != Some(JsonType::Null))
}

/// Property schema by name, looking through `allOf` and then every
/// `oneOf`/`anyOf` branch in order.
pub fn property<'a>(schema: &'a Schema, name: &str) -> Option<&'a Schema> {
    schema
        .property(name)
        .or_else(|| branches(schema).find_map(|b| property(b, name)))
}

fn minimal_object(schema: &Schema, branch: Option<&Schema>, rng: &mut impl Rng, depth: u32) -> Map {
    let mut obj = Map::new();
    fill_required(&mut obj, schema, schema, rng, depth);
    if let Some(branch) = branch {
        if let Value::Mapping(extra) = minimal_inner(branch, rng, depth + 1) {
            for (k, v) in extra.iter() {
                if !obj.contains_key(k) {
                    obj.insert(k, v.clone());
                }
            }
        }
    }
    apply_conditionals(&mut obj, schema, rng, depth);
    obj
}

/// Insert every field `required_by` requires, typed from `owner`.
fn fill_required(
    obj: &mut Map,
    owner: &Schema,
    required_by: &Schema,
    rng: &mut impl Rng,
    depth: u32,
) {
    for field in required_by.required_fields() {
        if obj.contains_key(&field) {
            continue;
        }
        let value = match property(required_by, &field).or_else(|| property(owner, &field)) {
            Some(s) => minimal_inner(s, rng, depth + 1),
            None => Value::from("a"),
        };
        obj.insert(field, value);
    }
}

/// Add `then`/`else` requirements for whichever branch the object selects.
fn apply_conditionals(obj: &mut Map, schema: &Schema, rng: &mut impl Rng, depth: u32) {
    let conditionals: Vec<_> = schema.conditionals().collect();
    for (condition, then, otherwise) in conditionals {
        let value = Value::Mapping(obj.clone());
        let branch = if condition.accepts(&value) { then } else { otherwise };
        if let Some(branch) = branch {
            fill_required(obj, schema, branch, rng, depth);
        }
    }
}

fn minimal_string(schema: &Schema, rng: &mut impl Rng) -> String {
    let (min_len, _) = schema.string_length();
    #[allow(clippy::cast_possible_truncation)]
    let min_len = (min_len.unwrap_or(1) as usize).clamp(1, MAX_STRING_LEN);

    if let Some(s) = schema.format.as_deref().and_then(|f| format_default(f, rng)) {
        if schema.pattern().is_none() || schema.accepts(&Value::from(s.as_str())) {
            return s;
        }
    }

    if schema.pattern().is_some() {
        let repeated = "a".repeat(min_len);
        let candidates = std::iter::once(repeated.as_str()).chain(PATTERN_CANDIDATES.iter().copied());
        for candidate in candidates {
            if schema.accepts(&Value::from(candidate)) {
                return candidate.to_string();
            }
        }
    }

    "a".repeat(min_len)
}

fn format_default(format: &str, rng: &mut impl Rng) -> Option<String> {
    Some(match format {
        "uuid" => uuid_v4(rng),
        "email" => "user@example.com".into(),
        "uri" | "url" => "https://example.com".into(),
        "hostname" => "example.com".into(),
        "ipv4" => "127.0.0.1".into(),
        "ipv6" => "::1".into(),
        "date" => "2024-01-15".into(),
        "date-time" => "2024-01-15T12:00:00Z".into(),
        "time" => "12:00:00Z".into(),
        "byte" => "YQ==".into(),
        _ => return None,
    })
}
