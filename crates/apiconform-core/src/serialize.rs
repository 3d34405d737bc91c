//! Parameter value serializer for OpenAPI serialization styles
//!
//! Turns a [`Value`] into the exact fragment spliced into a path segment,
//! query string, header value or cookie. Mapping members are emitted in
//! insertion order. Delimiters produced by the style itself are never
//! escaped; reserved characters inside values are, unless the parameter
//! allows them.

use percent_encoding::{AsciiSet, CONTROLS, NON_ALPHANUMERIC, utf8_percent_encode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::endpoint::Location;
use crate::value::Value;

/// Everything except RFC 3986 unreserved characters.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Unsafe characters only; reserved `:/?#[]@!$&'()*+,;=` pass through.
const ALLOW_RESERVED: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// OpenAPI parameter serialization style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Style {
    Simple,
    Label,
    Matrix,
    Form,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

impl Style {
    /// Default style for a parameter location.
    #[must_use]
    pub const fn default_for(location: Location) -> Self {
        match location {
            Location::Path | Location::Header => Self::Simple,
            Location::Query | Location::Cookie => Self::Form,
        }
    }

    /// `form` explodes by default, everything else does not.
    #[must_use]
    pub const fn default_explode(self) -> bool {
        matches!(self, Self::Form)
    }

    /// Whether the style may be used for `location`.
    #[must_use]
    pub const fn allowed_in(self, location: Location) -> bool {
        match self {
            Self::Simple => matches!(location, Location::Path | Location::Header),
            Self::Label | Self::Matrix => matches!(location, Location::Path),
            Self::Form => matches!(location, Location::Query | Location::Cookie),
            Self::SpaceDelimited | Self::PipeDelimited | Self::DeepObject => {
                matches!(location, Location::Query)
            }
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Label => "label",
            Self::Matrix => "matrix",
            Self::Form => "form",
            Self::SpaceDelimited => "spaceDelimited",
            Self::PipeDelimited => "pipeDelimited",
            Self::DeepObject => "deepObject",
        }
    }
}

impl std::fmt::Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How characters inside names and values are escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    /// Percent-encode reserved and unsafe characters (path/query default).
    Reserved,
    /// Percent-encode unsafe characters only (`allowReserved: true`).
    AllowReserved,
    /// No escaping (header values).
    Raw,
}

impl Escape {
    fn apply(self, s: &str) -> String {
        match self {
            Self::Reserved => utf8_percent_encode(s, COMPONENT).to_string(),
            Self::AllowReserved => utf8_percent_encode(s, ALLOW_RESERVED).to_string(),
            Self::Raw => s.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializeError {
    #[error("deepObject parameter '{0}' requires explode=true")]
    DeepObjectNotExploded(String),
    #[error("deepObject parameter '{name}' requires a mapping, got {kind}")]
    DeepObjectNotMapping { name: String, kind: &'static str },
    #[error("{style} parameter '{name}' cannot explode a mapping")]
    DelimitedMapping { name: String, style: Style },
}

/// Serialize `value` as parameter `name` in `style`.
///
/// # Errors
///
/// Returns error for combinations that have no defined encoding:
/// deepObject without explode or on a non-mapping, and exploded
/// space/pipe-delimited mappings.
pub fn serialize(
    name: &str,
    value: &Value,
    style: Style,
    explode: bool,
    escape: Escape,
) -> Result<String, SerializeError> {
    let enc = |s: &str| escape.apply(s);
    let n = enc(name);

    let shape = Shape::of(value, escape);

    let out = match style {
        Style::Simple => match shape {
            Shape::Scalar(v) => v,
            Shape::Items(items) => items.join(","),
            Shape::Pairs(pairs) => join_pairs(&pairs, explode, ","),
        },
        Style::Label => match shape {
            Shape::Scalar(v) => format!(".{v}"),
            Shape::Items(items) if explode => format!(".{}", items.join(".")),
            Shape::Items(items) => format!(".{}", items.join(",")),
            Shape::Pairs(pairs) if explode => format!(".{}", join_pairs(&pairs, true, ".")),
            Shape::Pairs(pairs) => format!(".{}", join_pairs(&pairs, false, ",")),
        },
        Style::Matrix => match shape {
            Shape::Scalar(v) => format!(";{n}={v}"),
            Shape::Items(items) if items.is_empty() => format!(";{n}"),
            Shape::Pairs(pairs) if pairs.is_empty() => format!(";{n}"),
            Shape::Items(items) if explode => {
                items.iter().map(|v| format!(";{n}={v}")).collect()
            }
            Shape::Items(items) => format!(";{n}={}", items.join(",")),
            Shape::Pairs(pairs) if explode => {
                pairs.iter().map(|(k, v)| format!(";{k}={v}")).collect()
            }
            Shape::Pairs(pairs) => format!(";{n}={}", join_pairs(&pairs, false, ",")),
        },
        Style::Form => match shape {
            Shape::Scalar(v) => format!("{n}={v}"),
            Shape::Items(items) if items.is_empty() => format!("{n}="),
            Shape::Pairs(pairs) if pairs.is_empty() => format!("{n}="),
            Shape::Items(items) if explode => repeat(&n, &items),
            Shape::Items(items) => format!("{n}={}", items.join(",")),
            Shape::Pairs(pairs) if explode => join_pairs(&pairs, true, "&"),
            Shape::Pairs(pairs) => format!("{n}={}", join_pairs(&pairs, false, ",")),
        },
        Style::SpaceDelimited | Style::PipeDelimited => {
            let delim = if style == Style::SpaceDelimited { "%20" } else { "|" };
            match shape {
                Shape::Scalar(v) => format!("{n}={v}"),
                Shape::Items(items) if items.is_empty() => format!("{n}="),
                Shape::Items(items) if explode => repeat(&n, &items),
                Shape::Items(items) => format!("{n}={}", items.join(delim)),
                Shape::Pairs(_) if explode => {
                    return Err(SerializeError::DelimitedMapping {
                        name: name.to_string(),
                        style,
                    });
                }
                Shape::Pairs(pairs) => format!("{n}={}", join_pairs(&pairs, false, delim)),
            }
        }
        Style::DeepObject => {
            if !explode {
                return Err(SerializeError::DeepObjectNotExploded(name.to_string()));
            }
            match shape {
                Shape::Pairs(pairs) if pairs.is_empty() => format!("{n}="),
                Shape::Pairs(pairs) => pairs
                    .iter()
                    .map(|(k, v)| format!("{n}[{k}]={v}"))
                    .collect::<Vec<_>>()
                    .join("&"),
                _ => {
                    return Err(SerializeError::DeepObjectNotMapping {
                        name: name.to_string(),
                        kind: value.kind(),
                    });
                }
            }
        }
    };
    Ok(out)
}

/// Cookie value: `form` rules without the `name=` prefix, members
/// comma-joined.
#[must_use]
pub fn cookie_value(value: &Value) -> String {
    match Shape::of(value, Escape::Reserved) {
        Shape::Scalar(v) => v,
        Shape::Items(items) => items.join(","),
        Shape::Pairs(pairs) => join_pairs(&pairs, false, ","),
    }
}

/// Escaped value decomposed by shape.
enum Shape {
    Scalar(String),
    Items(Vec<String>),
    Pairs(Vec<(String, String)>),
}

impl Shape {
    fn of(value: &Value, escape: Escape) -> Self {
        match value {
            Value::Sequence(items) => Self::Items(
                items
                    .iter()
                    .map(|v| escape.apply(&v.to_param_string()))
                    .collect(),
            ),
            Value::Mapping(map) => Self::Pairs(
                map.iter()
                    .map(|(k, v)| (escape.apply(k), escape.apply(&v.to_param_string())))
                    .collect(),
            ),
            scalar => Self::Scalar(escape.apply(&scalar.to_param_string())),
        }
    }
}

/// `k=v<sep>k2=v2` when exploded, `k<sep>v<sep>k2<sep>v2` otherwise.
fn join_pairs(pairs: &[(String, String)], explode: bool, sep: &str) -> String {
    if explode {
        pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(sep)
    } else {
        pairs
            .iter()
            .flat_map(|(k, v)| [k.as_str(), v.as_str()])
            .collect::<Vec<_>>()
            .join(sep)
    }
}

fn repeat(name: &str, items: &[String]) -> String {
    items
        .iter()
        .map(|v| format!("{name}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> Value {
        Value::from(json!({"role": "admin", "firstName": "Alex"}))
    }

    fn ser(name: &str, value: &Value, style: Style, explode: bool) -> String {
        serialize(name, value, style, explode, Escape::Reserved).unwrap()
    }

    // ── Mappings ──

    #[test]
    fn simple_mapping() {
        insta::assert_snapshot!(ser("id", &user(), Style::Simple, false), @"role,admin,firstName,Alex");
        insta::assert_snapshot!(ser("id", &user(), Style::Simple, true), @"role=admin,firstName=Alex");
    }

    #[test]
    fn label_mapping() {
        insta::assert_snapshot!(ser("id", &user(), Style::Label, false), @".role,admin,firstName,Alex");
        insta::assert_snapshot!(ser("id", &user(), Style::Label, true), @".role=admin.firstName=Alex");
    }

    #[test]
    fn matrix_mapping() {
        insta::assert_snapshot!(ser("explode_false", &user(), Style::Matrix, false), @";explode_false=role,admin,firstName,Alex");
        insta::assert_snapshot!(ser("explode_true", &user(), Style::Matrix, true), @";role=admin;firstName=Alex");
    }

    #[test]
    fn form_mapping() {
        insta::assert_snapshot!(ser("id", &user(), Style::Form, false), @"id=role,admin,firstName,Alex");
        insta::assert_snapshot!(ser("id", &user(), Style::Form, true), @"role=admin&firstName=Alex");
    }

    #[test]
    fn deep_object_mapping() {
        insta::assert_snapshot!(
            ser("explode_true", &user(), Style::DeepObject, true),
            @"explode_true[role]=admin&explode_true[firstName]=Alex"
        );
    }

    #[test]
    fn mapping_member_order_follows_insertion() {
        let value = Value::from(json!({"z": "1", "a": "2"}));
        insta::assert_snapshot!(ser("p", &value, Style::Simple, false), @"z,1,a,2");
    }

    // ── Sequences ──

    #[test]
    fn sequences_per_style() {
        let v = Value::from(json!([3, 4, 5]));
        insta::assert_snapshot!(ser("id", &v, Style::Simple, false), @"3,4,5");
        insta::assert_snapshot!(ser("id", &v, Style::Simple, true), @"3,4,5");
        insta::assert_snapshot!(ser("id", &v, Style::Label, false), @".3,4,5");
        insta::assert_snapshot!(ser("id", &v, Style::Label, true), @".3.4.5");
        insta::assert_snapshot!(ser("id", &v, Style::Matrix, false), @";id=3,4,5");
        insta::assert_snapshot!(ser("id", &v, Style::Matrix, true), @";id=3;id=4;id=5");
        insta::assert_snapshot!(ser("id", &v, Style::Form, false), @"id=3,4,5");
        insta::assert_snapshot!(ser("id", &v, Style::Form, true), @"id=3&id=4&id=5");
        insta::assert_snapshot!(ser("id", &v, Style::SpaceDelimited, false), @"id=3%204%205");
        insta::assert_snapshot!(ser("id", &v, Style::SpaceDelimited, true), @"id=3&id=4&id=5");
        insta::assert_snapshot!(ser("id", &v, Style::PipeDelimited, false), @"id=3|4|5");
        insta::assert_snapshot!(ser("id", &v, Style::PipeDelimited, true), @"id=3&id=4&id=5");
    }

    // ── Primitives and empties ──

    #[test]
    fn primitives_per_style() {
        let v = Value::from("blue");
        assert_eq!(ser("color", &v, Style::Simple, false), "blue");
        assert_eq!(ser("color", &v, Style::Label, false), ".blue");
        assert_eq!(ser("color", &v, Style::Matrix, false), ";color=blue");
        assert_eq!(ser("color", &v, Style::Form, true), "color=blue");
    }

    #[test]
    fn empty_values_are_present_not_omitted() {
        let empty_seq = Value::Sequence(vec![]);
        let empty_map = Value::empty_mapping();
        assert_eq!(ser("p", &empty_seq, Style::Simple, false), "");
        assert_eq!(ser("p", &empty_seq, Style::Label, false), ".");
        assert_eq!(ser("p", &empty_seq, Style::Matrix, true), ";p");
        assert_eq!(ser("p", &empty_seq, Style::Form, true), "p=");
        assert_eq!(ser("p", &empty_seq, Style::PipeDelimited, false), "p=");
        assert_eq!(ser("p", &empty_map, Style::Form, true), "p=");
        assert_eq!(ser("p", &empty_map, Style::DeepObject, true), "p=");
    }

    // ── Escaping ──

    #[test]
    fn reserved_characters_are_encoded_by_default() {
        let v = Value::from("a/b?c=d&e");
        assert_eq!(ser("q", &v, Style::Form, true), "q=a%2Fb%3Fc%3Dd%26e");
    }

    #[test]
    fn allow_reserved_passes_reserved_through() {
        let v = Value::from("a/b?c=d&e");
        let out = serialize("q", &v, Style::Form, true, Escape::AllowReserved).unwrap();
        assert_eq!(out, "q=a/b?c=d&e");
    }

    #[test]
    fn space_and_non_ascii_always_encoded() {
        let v = Value::from("a b\u{e9}");
        let out = serialize("q", &v, Style::Form, true, Escape::AllowReserved).unwrap();
        assert_eq!(out, "q=a%20b%C3%A9");
    }

    #[test]
    fn header_values_are_raw() {
        let out = serialize("X-Ids", &Value::from(json!(["a b", "c/d"])), Style::Simple, false, Escape::Raw)
            .unwrap();
        assert_eq!(out, "a b,c/d");
    }

    #[test]
    fn cookie_value_has_no_name_prefix() {
        assert_eq!(cookie_value(&Value::from("abc")), "abc");
        assert_eq!(cookie_value(&Value::from(json!([1, 2]))), "1,2");
        assert_eq!(cookie_value(&user()), "role,admin,firstName,Alex");
    }

    // ── Errors ──

    #[test]
    fn deep_object_errors() {
        assert_eq!(
            serialize("d", &user(), Style::DeepObject, false, Escape::Reserved),
            Err(SerializeError::DeepObjectNotExploded("d".into()))
        );
        assert_eq!(
            serialize("d", &Value::from("x"), Style::DeepObject, true, Escape::Reserved),
            Err(SerializeError::DeepObjectNotMapping {
                name: "d".into(),
                kind: "string"
            })
        );
    }

    #[test]
    fn exploded_delimited_mapping_is_rejected() {
        let err = serialize("p", &user(), Style::PipeDelimited, true, Escape::Reserved).unwrap_err();
        assert!(matches!(err, SerializeError::DelimitedMapping { .. }));
    }

    #[test]
    fn style_location_legality() {
        assert!(Style::Matrix.allowed_in(Location::Path));
        assert!(!Style::Matrix.allowed_in(Location::Query));
        assert!(Style::DeepObject.allowed_in(Location::Query));
        assert!(!Style::Form.allowed_in(Location::Header));
        assert_eq!(Style::default_for(Location::Cookie), Style::Form);
        assert!(Style::Form.default_explode());
        assert!(!Style::Simple.default_explode());
    }
}
