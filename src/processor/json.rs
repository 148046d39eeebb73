use crate::error::TagError;
use serde_json::Value;

/// Drop markdown fence lines (```` ``` ```` / ```` ```json ````) when the text
/// opens with one; otherwise return the trimmed text unchanged.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    trimmed
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Parse an LLM reply as JSON, tolerating a surrounding code fence.
pub fn extract_json_payload(text: &str) -> Result<Value, TagError> {
    let payload = strip_code_fences(text);
    serde_json::from_str(&payload).map_err(|e| {
        TagError::UnparsableResponse(format!(
            "Failed to parse LLM response as JSON: {}. Response was: {}",
            e, text
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json() {
        assert_eq!(extract_json_payload(" [\"a\"] \n").unwrap(), json!(["a"]));
    }

    #[test]
    fn test_fenced_json_matches_unfenced() {
        let fenced = "```json\n[{\"name_en\": \"solo\"}]\n```";
        let plain = "[{\"name_en\": \"solo\"}]";
        assert_eq!(
            extract_json_payload(fenced).unwrap(),
            extract_json_payload(plain).unwrap()
        );
    }

    #[test]
    fn test_bare_fence() {
        assert_eq!(
            extract_json_payload("```\n{\"ok\": true}\n```").unwrap(),
            json!({"ok": true})
        );
    }

    #[test]
    fn test_invalid_json_is_unparsable() {
        let result = extract_json_payload("Sure! Here are your tags: solo, smile");
        assert!(matches!(result, Err(TagError::UnparsableResponse(_))));
    }

    #[test]
    fn test_strip_code_fences_leaves_prose() {
        assert_eq!(strip_code_fences("  A girl in a forest.  "), "A girl in a forest.");
        assert_eq!(
            strip_code_fences("```\nA girl in a forest.\n```"),
            "A girl in a forest."
        );
    }
}
