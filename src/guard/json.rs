//! Structured (JSON) output checks.

use serde_json::Value;

use crate::{HuginnError, Result};

/// Strip Markdown code fences models like to wrap JSON in.
///
/// Handles a leading ```` ```json ```` or ```` ``` ```` and a trailing
/// ```` ``` ````; anything else is only trimmed.
pub fn clean_json_response(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

/// Parse a model reply as JSON and check that `required_fields` are present.
///
/// Required fields imply a JSON object. Failures are
/// [`HuginnError::MalformedOutput`].
pub fn parse_json_output(text: &str, required_fields: &[String]) -> Result<Value> {
    let value: Value = serde_json::from_str(clean_json_response(text))
        .map_err(|e| HuginnError::MalformedOutput(format!("invalid JSON: {e}")))?;

    if required_fields.is_empty() {
        return Ok(value);
    }
    let Some(object) = value.as_object() else {
        return Err(HuginnError::MalformedOutput(
            "expected a JSON object".to_string(),
        ));
    };
    let missing: Vec<&str> = required_fields
        .iter()
        .map(String::as_str)
        .filter(|field| !object.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(HuginnError::MalformedOutput(format!(
            "missing fields: {}",
            missing.join(", ")
        )));
    }
    Ok(value)
}
