//! Model reply cleanup
//!
//! Gemini is asked for raw JSON but often wraps it in markdown code fences.
//! These helpers strip the fences and enforce the array shape both adapters
//! expect.

use crate::error::AppError;
use serde_json::Value;

/// Remove markdown code-fence markers and surrounding whitespace
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Parse a model reply as a JSON array
///
/// # Errors
/// * `AppError::MalformedResponse` if the cleaned text is not JSON or not an array
pub fn parse_json_array(text: &str) -> Result<Vec<Value>, AppError> {
    let cleaned = strip_code_fences(text);
    let value: Value = serde_json::from_str(&cleaned).map_err(|e| {
        AppError::MalformedResponse(format!(
            "Model reply is not valid JSON: {} - Reply: {}",
            e,
            preview(&cleaned)
        ))
    })?;

    match value {
        Value::Array(items) => Ok(items),
        other => Err(AppError::MalformedResponse(format!(
            "Expected a JSON array from the model, got: {}",
            preview(&other.to_string())
        ))),
    }
}

/// Render an id echoed by the model as a string
///
/// Strings are trimmed; numbers keep their JSON form. Anything else is not
/// an id.
pub fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 200;
    if text.chars().count() <= MAX_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_CHARS).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fences("```\n[]\n```  "), "[]");
        assert_eq!(strip_code_fences("  [\"a\"] "), "[\"a\"]");
    }

    #[test]
    fn test_parse_json_array() {
        let items = parse_json_array("```json\n[\"a\", 2]\n```").unwrap();
        assert_eq!(items, vec![json!("a"), json!(2)]);
    }

    #[test]
    fn test_parse_json_array_rejects_non_json() {
        let result = parse_json_array("Sure! Here is your route.");
        assert!(matches!(result, Err(AppError::MalformedResponse(_))));
    }

    #[test]
    fn test_parse_json_array_rejects_object() {
        let result = parse_json_array(r#"{"order": ["a"]}"#);
        assert!(matches!(result, Err(AppError::MalformedResponse(_))));
    }

    #[test]
    fn test_value_as_id() {
        assert_eq!(value_as_id(&json!(" abc ")), Some("abc".to_string()));
        assert_eq!(value_as_id(&json!(1712345678901u64)), Some("1712345678901".to_string()));
        assert_eq!(value_as_id(&json!(null)), None);
        assert_eq!(value_as_id(&json!({"id": "a"})), None);
    }
}
