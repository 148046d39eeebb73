use super::{
    split_system, ChatMessage, ProviderAdapter, ProviderRequest, RequestParams, MAX_TOKENS,
    TEMPERATURE,
};
use serde_json::{json, Value};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude messages API
pub struct AnthropicProvider;

impl ProviderAdapter for AnthropicProvider {
    fn name(&self) -> &'static str {
        "claude"
    }

    fn build_request(
        &self,
        params: &RequestParams<'_>,
        messages: &[ChatMessage],
    ) -> ProviderRequest {
        let (system, rest) = split_system(messages);

        let mut body = json!({
            "model": params.model,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "messages": rest
        });
        if let Some(system) = system.filter(|s| !s.is_empty()) {
            body["system"] = Value::String(system.to_string());
        }

        ProviderRequest::post_json(format!("{}/messages", params.base()), body)
            .with_header("x-api-key", params.api_key.to_string())
            .with_header("anthropic-version", ANTHROPIC_VERSION.to_string())
    }

    fn extract_text<'a>(&self, body: &'a Value) -> Option<&'a str> {
        body["content"][0]["text"].as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_moves_to_top_level() {
        let params = RequestParams {
            model: "claude-3-5-sonnet-latest",
            api_key: "sk-ant",
            base_url: "https://api.anthropic.com/v1",
        };
        let messages = vec![ChatMessage::system("json only"), ChatMessage::user("tags")];
        let request = AnthropicProvider.build_request(&params, &messages);

        assert_eq!(request.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(request.body["system"], "json only");
        assert_eq!(request.body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(request.body["messages"][0]["role"], "user");
        assert_eq!(request.body["max_tokens"], 4000);
        assert!(request
            .headers
            .contains(&("x-api-key", "sk-ant".to_string())));
        assert!(request
            .headers
            .contains(&("anthropic-version", "2023-06-01".to_string())));
        assert!(!request.headers.iter().any(|(name, _)| *name == "Authorization"));
    }

    #[test]
    fn test_no_system_field_without_system_message() {
        let params = RequestParams {
            model: "claude",
            api_key: "k",
            base_url: "http://localhost",
        };
        let request = AnthropicProvider.build_request(&params, &[ChatMessage::user("hi")]);
        assert!(request.body.get("system").is_none());
    }

    #[test]
    fn test_parse_response_and_error() {
        let text = AnthropicProvider
            .parse_response(r#"{"content": [{"type": "text", "text": "杰作"}]}"#)
            .unwrap();
        assert_eq!(text, "杰作");

        let message = AnthropicProvider.parse_error(
            r#"{"type": "error", "error": {"type": "authentication_error", "message": "invalid x-api-key"}}"#,
        );
        assert_eq!(message, "invalid x-api-key");
    }
}
