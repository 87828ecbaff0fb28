//! Structured Output Handling
//!
//! Declared output schemas and the lenient JSON extraction applied to raw
//! model replies before they are validated against those schemas.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{Result, WeaveError};

/// A type that can be requested from the model as structured output
pub trait OutputSchema: DeserializeOwned {
    /// Schema name used in prompts and error messages
    const NAME: &'static str;

    /// JSON Schema describing the expected value
    fn schema() -> Value;
}

/// Validate a JSON value against `T` and deserialize it
pub fn parse_structured<T: OutputSchema>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| WeaveError::StructuredOutput {
        schema: T::NAME.to_string(),
        message: e.to_string(),
    })
}

/// Extract a JSON value from a model reply.
///
/// Accepts fenced code blocks, a leading BOM, trailing commas and JSON
/// embedded in surrounding prose.
pub fn extract_json(raw: &str) -> Result<Value> {
    let cleaned = preprocess(raw);

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(value);
    }

    debug!("Initial JSON parse failed, attempting repair");

    let repaired = fix_trailing_commas(&cleaned);
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        warn!("JSON repaired (trailing commas)");
        return Ok(value);
    }

    if let Some(extracted) = extract_from_mixed(&repaired)
        && let Ok(value) = serde_json::from_str::<Value>(extracted)
    {
        warn!("JSON extracted from mixed content");
        return Ok(value);
    }

    Err(WeaveError::StructuredOutput {
        schema: "json".to_string(),
        message: format!(
            "reply is not valid JSON. Content preview: {}...",
            cleaned.chars().take(200).collect::<String>()
        ),
    })
}

fn preprocess(raw: &str) -> String {
    let s = raw.trim().trim_start_matches('\u{feff}');
    strip_code_fences(s).trim().to_string()
}

fn strip_code_fences(s: &str) -> &str {
    let mut result = s;

    if result.starts_with("```")
        && let Some(first_newline) = result.find('\n')
    {
        result = &result[first_newline + 1..];
    }

    if let Some(stripped) = result.trim_end().strip_suffix("```") {
        result = stripped.trim_end();
    }

    result
}

/// Remove commas directly before `]` or `}` outside string literals
fn fix_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escape = false;

    for (i, &ch) in chars.iter().enumerate() {
        if escape {
            escape = false;
            result.push(ch);
            continue;
        }

        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            ',' if !in_string => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if matches!(next, Some(']') | Some('}')) {
                    continue;
                }
            }
            _ => {}
        }

        result.push(ch);
    }

    result
}

fn extract_from_mixed(s: &str) -> Option<&str> {
    let start = s.find(['{', '['])?;
    let closer = if s[start..].starts_with('{') { '}' } else { ']' };
    let end = s.rfind(closer)?;
    (end > start).then(|| &s[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
    }

    impl OutputSchema for Sample {
        const NAME: &'static str = "Sample";

        fn schema() -> Value {
            json!({"type": "object", "properties": {"name": {"type": "string"}}})
        }
    }

    #[test]
    fn test_extract_plain_json() {
        let value = extract_json(r#"{"name": "x"}"#).unwrap();
        assert_eq!(value["name"], "x");
    }

    #[test]
    fn test_extract_fenced_json() {
        let value = extract_json("```json\n{\"name\": \"x\"}\n```").unwrap();
        assert_eq!(value["name"], "x");
    }

    #[test]
    fn test_extract_with_trailing_comma() {
        let value = extract_json(r#"{"items": [1, 2,], "name": "a,}",}"#).unwrap();
        assert_eq!(value["items"], json!([1, 2]));
        assert_eq!(value["name"], "a,}");
    }

    #[test]
    fn test_extract_from_prose() {
        let value = extract_json("Here is the result:\n{\"name\": \"x\"}\nDone.").unwrap();
        assert_eq!(value["name"], "x");
    }

    #[test]
    fn test_extract_rejects_garbage() {
        assert!(matches!(
            extract_json("no json here"),
            Err(WeaveError::StructuredOutput { .. })
        ));
    }

    #[test]
    fn test_parse_structured_reports_schema_name() {
        let err = parse_structured::<Sample>(json!({"other": 1})).unwrap_err();
        match err {
            WeaveError::StructuredOutput { schema, .. } => assert_eq!(schema, "Sample"),
            other => panic!("unexpected error: {other}"),
        }

        let sample = parse_structured::<Sample>(json!({"name": "ok"})).unwrap();
        assert_eq!(sample.name, "ok");
    }
}
