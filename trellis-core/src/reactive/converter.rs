//! Attribute Converters
//!
//! A converter translates between a property value and the string form of
//! its attribute. [`DefaultConverter`] handles every [`PropertyKind`]; a
//! property can install its own through
//! [`PropertyDeclaration::converter`](super::PropertyDeclaration::converter).
//!
//! # Default conversions
//!
//! | Kind | to attribute | from attribute |
//! |------|--------------|----------------|
//! | `Boolean` | present (empty) when truthy, removed otherwise | presence |
//! | `Number` | decimal text | parsed, `NaN` when unparsable, `Null` when absent |
//! | `String` | text | text, `Null` when absent |
//! | `Object`, `Array` | JSON | parsed JSON, `Null` when invalid |

use crate::value::Value;

use super::PropertyKind;

/// Converts a property to and from its attribute.
pub trait AttributeConverter {
    /// The attribute text for `value`, or `None` to remove the attribute.
    fn to_attribute(&self, value: &Value, kind: PropertyKind) -> Option<String>;

    /// The property value for attribute text (`None` when removed).
    fn from_attribute(&self, value: Option<&str>, kind: PropertyKind) -> Value;
}

/// The converter used when a property declares none.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConverter;

impl AttributeConverter for DefaultConverter {
    fn to_attribute(&self, value: &Value, kind: PropertyKind) -> Option<String> {
        if matches!(value, Value::Nothing | Value::Null) && kind != PropertyKind::Boolean {
            return None;
        }
        match kind {
            PropertyKind::Boolean => value.is_truthy().then(String::new),
            PropertyKind::Object | PropertyKind::Array => Some(match to_json(value) {
                Some(json) => json.to_string(),
                None => value.to_text(),
            }),
            PropertyKind::String | PropertyKind::Number => Some(value.to_text()),
        }
    }

    fn from_attribute(&self, value: Option<&str>, kind: PropertyKind) -> Value {
        match kind {
            PropertyKind::Boolean => Value::Bool(value.is_some()),
            PropertyKind::Number => match value {
                Some(text) => Value::Number(parse_number(text)),
                None => Value::Null,
            },
            PropertyKind::String => value.map_or(Value::Null, Value::str),
            PropertyKind::Object | PropertyKind::Array => value
                .and_then(|text| serde_json::from_str::<serde_json::Value>(text).ok())
                .map_or(Value::Null, Value::from),
        }
    }
}

/// Numeric conversion of attribute text. Blank text is zero.
fn parse_number(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }
    text.parse().unwrap_or(f64::NAN)
}

fn to_json(value: &Value) -> Option<serde_json::Value> {
    Some(match value {
        Value::Null | Value::Nothing => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.to_string()),
        Value::Json(json) => json.as_ref().clone(),
        Value::List(items) => serde_json::Value::Array(
            items
                .iter()
                .map(to_json)
                .collect::<Option<Vec<_>>>()?,
        ),
        _ => return None,
    })
}
