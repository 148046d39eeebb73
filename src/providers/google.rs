use super::{
    split_system, ChatMessage, ProviderAdapter, ProviderRequest, RequestParams, Role, MAX_TOKENS,
    TEMPERATURE,
};
use serde_json::{json, Value};

/// Gemini generateContent API; the key travels as a query parameter
pub struct GoogleProvider;

impl ProviderAdapter for GoogleProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn build_request(
        &self,
        params: &RequestParams<'_>,
        messages: &[ChatMessage],
    ) -> ProviderRequest {
        let (system, rest) = split_system(messages);

        let contents: Vec<Value> = rest
            .iter()
            .map(|message| {
                let role = match message.role {
                    Role::Assistant => "model",
                    _ => "user",
                };
                json!({
                    "role": role,
                    "parts": [{ "text": message.content }]
                })
            })
            .collect();

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": MAX_TOKENS
            }
        });
        if let Some(system) = system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        ProviderRequest::post_json(
            format!(
                "{}/models/{}:generateContent?key={}",
                params.base(),
                params.model,
                params.api_key
            ),
            body,
        )
    }

    fn extract_text<'a>(&self, body: &'a Value) -> Option<&'a str> {
        body["candidates"][0]["content"]["parts"][0]["text"].as_str()
    }
}
