//! Lenient field deserializers for loosely-typed inbound documents
//!
//! Web forms and the language model both send fields whose JSON type drifts
//! (numbers as strings, strings as numbers, `null` for absent). These
//! helpers never fail: a value of the wrong shape becomes `None`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Text field: strings are trimmed; empty, non-string and `null` become `None`.
/// Numbers and booleans are kept as their JSON text.
pub(crate) fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(text_of(&value))
}

/// Numeric field: JSON numbers, or strings holding a number (`"72,500"`,
/// `"$1,200"` included). Anything else becomes `None`.
pub(crate) fn opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_of(&value))
}

/// List field: anything other than a JSON array becomes `None`.
pub(crate) fn opt_list<'de, D>(deserializer: D) -> Result<Option<Vec<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(Some(items)),
        _ => Ok(None),
    }
}

pub(crate) fn text_of(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

pub(crate) fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, ',' | '$' | ' '))
                .collect();
            cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}
