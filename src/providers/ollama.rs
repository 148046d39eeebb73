use super::{ChatMessage, ProviderAdapter, ProviderRequest, RequestParams, MAX_TOKENS, TEMPERATURE};
use serde_json::{json, Value};

/// Ollama native chat API (non-streaming)
pub struct OllamaProvider;

impl ProviderAdapter for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn build_request(
        &self,
        params: &RequestParams<'_>,
        messages: &[ChatMessage],
    ) -> ProviderRequest {
        let request = ProviderRequest::post_json(
            format!("{}/api/chat", params.base()),
            json!({
                "model": params.model,
                "messages": messages,
                "stream": false,
                "options": {
                    "temperature": TEMPERATURE,
                    "num_predict": MAX_TOKENS
                }
            }),
        );

        // Local servers usually run without auth; proxies may want a bearer token
        if params.api_key.trim().is_empty() {
            request
        } else {
            request.with_header("Authorization", format!("Bearer {}", params.api_key))
        }
    }

    fn extract_text<'a>(&self, body: &'a Value) -> Option<&'a str> {
        body["message"]["content"].as_str()
    }

    fn parse_error(&self, raw_body: &str) -> String {
        raw_body.trim().to_string()
    }
}
