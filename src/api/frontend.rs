//! Browser-facing request and response shapes

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Chat request as sent by the frontend
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default, deserialize_with = "present_string")]
    pub system_prompt: Option<String>,
    #[serde(default, deserialize_with = "present_string")]
    pub user_prompt: Option<String>,
    #[serde(default, deserialize_with = "present_string")]
    pub model: Option<String>,
}

/// Speech request as sent by the frontend
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SpeechRequest {
    #[serde(default, deserialize_with = "present_string")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "present_string")]
    pub voice: Option<String>,
    #[serde(default, deserialize_with = "present_string")]
    pub model: Option<String>,
}

/// Chat reply returned to the frontend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    pub text: String,
}

/// JSON body returned on every failure path
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Parse a frontend body, treating anything that is not a usable JSON
/// object as an empty request so that field checks report what is missing.
pub fn parse_body<T>(body: &[u8]) -> T
where
    T: for<'de> Deserialize<'de> + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return T::default();
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => serde_json::from_value(value).unwrap_or_default(),
        _ => T::default(),
    }
}

/// Accept any JSON value; only non-empty strings count as present.
/// Numbers, booleans, arrays and objects are rejected on purpose rather
/// than forwarded, so a non-string `userPrompt` or `text` reports the
/// field as missing.
fn present_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    })
}
