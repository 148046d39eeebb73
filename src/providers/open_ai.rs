use super::{ChatMessage, ProviderAdapter, ProviderRequest, RequestParams, MAX_TOKENS, TEMPERATURE};
use serde_json::{json, Value};

/// OpenAI-compatible chat completions; also the default for unknown gateways
pub struct OpenAIProvider;

impl ProviderAdapter for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn build_request(
        &self,
        params: &RequestParams<'_>,
        messages: &[ChatMessage],
    ) -> ProviderRequest {
        // System prompt stays inline in the messages array
        ProviderRequest::post_json(
            format!("{}/chat/completions", params.base()),
            json!({
                "model": params.model,
                "messages": messages,
                "temperature": TEMPERATURE,
                "max_tokens": MAX_TOKENS
            }),
        )
        .with_header("Authorization", format!("Bearer {}", params.api_key))
    }

    fn extract_text<'a>(&self, body: &'a Value) -> Option<&'a str> {
        body["choices"][0]["message"]["content"].as_str()
    }
}
