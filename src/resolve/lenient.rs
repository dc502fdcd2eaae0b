//! Forgiving field decoders for provider responses
//!
//! Providers are loose with types: Amap sends `[]` for empty strings, Tencent
//! sends numeric admin codes, and nested `{name}` / `{title}` objects may be
//! missing or empty. These decoders always produce a `String`, empty when the
//! value carries no text.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Text content of a scalar value
fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Text of `value[key]` when `value` is an object
fn field(value: &Value, key: &str) -> String {
    value.get(key).map(text).unwrap_or_default()
}

/// Decode a string, number, `[]` or null into a string
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text(&Value::deserialize(deserializer)?))
}

/// Decode the `name` of an object such as Amap's `{name, type}`
pub fn name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(field(&Value::deserialize(deserializer)?, "name"))
}

/// Decode the `title` of an object such as Tencent's `{id, title}`
pub fn title<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(field(&Value::deserialize(deserializer)?, "title"))
}
