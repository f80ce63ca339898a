//! Parse model output into records

use crate::error::ExtractorError;
use tenderfold_domain::ExtractedRecord;

/// Parse a model response into a record
///
/// Accepts bare JSON, JSON inside a markdown code fence, or JSON surrounded
/// by prose. The top level must be an object.
pub fn parse_record(response: &str) -> Result<ExtractedRecord, ExtractorError> {
    let json_str = extract_json(response)?;
    ExtractedRecord::from_json_str(json_str).map_err(ExtractorError::InvalidFormat)
}

/// Locate the JSON object in a response
fn extract_json(response: &str) -> Result<&str, ExtractorError> {
    let trimmed = response.trim();

    let body = if trimmed.starts_with("```") {
        let after_fence = trimmed
            .find('\n')
            .map(|idx| &trimmed[idx + 1..])
            .ok_or_else(|| ExtractorError::InvalidFormat("Empty code block".to_string()))?;
        after_fence
            .rfind("```")
            .map_or(after_fence, |idx| &after_fence[..idx])
            .trim()
    } else {
        trimmed
    };

    if body.starts_with('{') {
        return Ok(body);
    }

    match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&body[start..=end]),
        _ => Err(ExtractorError::InvalidFormat(
            "No JSON object in response".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenderfold_domain::Value;

    #[test]
    fn test_parse_bare_object() {
        let record = parse_record(r#"{"legal": {"penalties": "0.5% per week"}}"#).unwrap();
        assert!(record.get("legal").is_some());
    }

    #[test]
    fn test_parse_fenced_object() {
        let response = "```json\n{\"projectOverview\": {\"emd\": \"₹50,000\"}}\n```";
        let record = parse_record(response).unwrap();
        assert_eq!(
            record.get("projectOverview").and_then(|v| v.as_map()).unwrap()["emd"],
            Value::string("₹50,000")
        );
    }

    #[test]
    fn test_parse_object_in_prose() {
        let response = "Here is the analysis:\n{\"scm\": {}}\nLet me know if you need more.";
        assert!(parse_record(response).unwrap().get("scm").is_some());
    }

    #[test]
    fn test_rejects_non_objects() {
        assert!(matches!(
            parse_record("[1, 2, 3]"),
            Err(ExtractorError::InvalidFormat(_))
        ));
        assert!(parse_record("no json here").is_err());
        assert!(parse_record("```").is_err());
        assert!(parse_record("{\"truncated\": ").is_err());
    }
}
