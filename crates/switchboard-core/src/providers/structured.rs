//! Client-side validation of structured (JSON) output

use crate::error::{ClientError, ClientResult};
use serde_json::Value;

/// At most this many schema violations are quoted in an error message
const MAX_REPORTED_VIOLATIONS: usize = 3;

/// A compiled response schema.
///
/// Compiled before the request is sent, so a malformed schema is rejected
/// without any network call.
pub struct StructuredOutput {
    validator: jsonschema::Validator,
}

impl StructuredOutput {
    pub fn compile(provider: &str, schema: &Value) -> ClientResult<Self> {
        let validator = jsonschema::validator_for(schema).map_err(|e| {
            ClientError::invalid_request(provider, format!("invalid response schema: {e}"))
        })?;
        Ok(Self { validator })
    }

    /// Parse `content` as JSON and check it against the schema.
    ///
    /// Both failures are permanent `ProviderResponse` errors: sending the
    /// same request again is not expected to fix the payload.
    pub fn parse(&self, provider: &str, content: &str) -> ClientResult<Value> {
        let value = parse_json_content(provider, content)?;
        let violations: Vec<String> = self
            .validator
            .iter_errors(&value)
            .take(MAX_REPORTED_VIOLATIONS)
            .map(|err| format!("{} at '{}'", err, err.instance_path))
            .collect();
        if !violations.is_empty() {
            return Err(ClientError::response(
                provider,
                format!("structured output violates schema: {}", violations.join("; ")),
            ));
        }
        Ok(value)
    }
}

/// Parse model output as JSON, tolerating a surrounding Markdown code fence
pub fn parse_json_content(provider: &str, content: &str) -> ClientResult<Value> {
    let trimmed = strip_code_fence(content.trim());
    serde_json::from_str(trimmed).map_err(|e| {
        ClientError::response(provider, format!("structured output is not valid JSON: {e}"))
    })
}

fn strip_code_fence(content: &str) -> &str {
    let Some(inner) = content.strip_prefix("```") else {
        return content;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn person_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "integer", "minimum": 0}
            },
            "required": ["name", "age"]
        })
    }

    #[test]
    fn test_valid_output_is_returned() {
        let output = StructuredOutput::compile("groq", &person_schema()).unwrap();
        let value = output.parse("groq", r#"{"name": "Ada", "age": 36}"#).unwrap();
        assert_eq!(value["name"], "Ada");
    }

    #[test]
    fn test_fenced_output_is_accepted() {
        let output = StructuredOutput::compile("groq", &person_schema()).unwrap();
        let value = output
            .parse("groq", "```json\n{\"name\": \"Ada\", \"age\": 36}\n```")
            .unwrap();
        assert_eq!(value["age"], 36);
    }

    #[test]
    fn test_schema_violation_is_provider_response() {
        let output = StructuredOutput::compile("groq", &person_schema()).unwrap();
        let err = output.parse("groq", r#"{"name": "Ada", "age": -1}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderResponse);
        assert!(err.to_string().contains("violates schema"));
    }

    #[test]
    fn test_non_json_output_is_provider_response() {
        let output = StructuredOutput::compile("groq", &person_schema()).unwrap();
        let err = output.parse("groq", "Sure! Here is the JSON you asked for").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderResponse);
    }

    #[test]
    fn test_malformed_schema_is_invalid_request() {
        let err = StructuredOutput::compile("groq", &json!({"type": "no-such-type"}))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }
}
