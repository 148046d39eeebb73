use crate::config::LlmConfig;
use crate::error::TagError;
use crate::providers::{ChatMessage, RequestParams};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use std::time::Duration;

/// Default timeout for a chat request
pub const LLM_TIMEOUT: Duration = Duration::from_secs(60);

const CONNECTION_TEST_PROMPT: &str = "Say 'OK' if you can receive this message.";

/// Something that can answer a chat exchange with plain text
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage], config: &LlmConfig)
        -> Result<String, TagError>;
}

/// HTTP client that speaks whichever wire format `config.provider` names
pub struct LlmClient {
    client: Client,
}

impl Default for LlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmClient {
    pub fn new() -> Self {
        Self::with_timeout(LLM_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        LlmClient {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Send `messages` and return the reply text.
    ///
    /// Transport problems, non-2xx statuses and unexpected bodies all come
    /// back as `Err`; nothing here panics on provider output.
    pub async fn call(
        &self,
        messages: &[ChatMessage],
        config: &LlmConfig,
    ) -> Result<String, TagError> {
        let adapter = config.provider.adapter();
        let request = adapter.build_request(&RequestParams::from(config), messages);

        debug!(
            "LLM request to {} ({}): headers={:?}",
            request.redacted_url(),
            adapter.name(),
            request.redacted_headers()
        );

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .body(request.body_bytes());
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        // Gemini keys live in the URL, so it is stripped before logging
        let response = builder.send().await.map_err(|e| {
            let e = e.without_url();
            warn!("LLM transport error ({}): {}", adapter.name(), e);
            TagError::from(e)
        })?;

        let status = response.status();
        let raw_body = response.text().await.map_err(TagError::from)?;
        debug!("LLM response ({}): {}", status, raw_body);

        if !status.is_success() {
            let mut message = adapter.parse_error(&raw_body);
            if message.is_empty() {
                message = status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string();
            }
            warn!("LLM API HTTP error {}: {}", status.as_u16(), message);
            return Err(TagError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        adapter.parse_response(&raw_body)
    }

    /// Round-trip a trivial prompt with a possibly unsaved config and return
    /// the first 100 characters of the reply.
    pub async fn test_connection(&self, config: &LlmConfig) -> Result<String, TagError> {
        if config.api_key.trim().is_empty() {
            return Err(TagError::NotConfigured("no API key provided".to_string()));
        }

        let reply = self
            .call(&[ChatMessage::user(CONNECTION_TEST_PROMPT)], config)
            .await?;
        Ok(reply.chars().take(100).collect())
    }
}

#[async_trait]
impl ChatBackend for LlmClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        config: &LlmConfig,
    ) -> Result<String, TagError> {
        self.call(messages, config).await
    }
}
