//! JSON rendering of decoded values for human consumption.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Map, Value as JsonValue};

use dubhe_core::hessian::Value;

/// Render a decoded value as JSON.
///
/// Dates become epoch milliseconds, byte blobs become base64 text, objects
/// become `{"class": <name>, <fields>...}`, and a back-reference renders as
/// `{"$ref": <ordinal>}`. A map keeps JSON-object shape while every key is
/// scalar; otherwise it falls back to an array of `[key, value]` pairs.
/// Non-finite doubles have no JSON spelling and render as null.
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => json!(b),
        Value::Int(n) => json!(n),
        Value::Long(n) => json!(n),
        Value::Double(d) if d.is_finite() => json!(d),
        Value::Double(_) => JsonValue::Null,
        Value::Date(millis) => json!(millis),
        Value::String(s) => json!(s),
        Value::Bytes(blob) => json!(STANDARD.encode(blob)),
        Value::List(items) => JsonValue::Array(items.iter().map(value_to_json).collect()),
        Value::Map(pairs) => render_map(pairs),
        Value::Object(object) => {
            let mut members = Map::new();
            members.insert("class".to_owned(), json!(object.class_name()));
            for (name, field) in object.iter() {
                members.insert(name.to_owned(), value_to_json(field));
            }
            JsonValue::Object(members)
        }
        Value::Ref(ordinal) => json!({ "$ref": ordinal }),
    }
}

fn render_map(pairs: &[(Value, Value)]) -> JsonValue {
    let mut members = Map::new();
    for (key, value) in pairs {
        match scalar_key(key) {
            Some(name) => {
                members.insert(name, value_to_json(value));
            }
            None => {
                return JsonValue::Array(
                    pairs
                        .iter()
                        .map(|(k, v)| JsonValue::Array(vec![value_to_json(k), value_to_json(v)]))
                        .collect(),
                );
            }
        }
    }
    JsonValue::Object(members)
}

fn scalar_key(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Int(n) => Some(n.to_string()),
        Value::Long(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
