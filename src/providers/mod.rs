//! Wire-format adapters for the supported LLM providers.
//!
//! Each adapter turns a provider-agnostic chat request into the URL, headers
//! and JSON body its API expects, and pulls the reply text (or the error
//! message) back out of the response body. Adapters do no I/O; the
//! [`LlmClient`](crate::llm::LlmClient) sends what they build.

mod anthropic;
mod google;
mod ollama;
mod open_ai;

pub use anthropic::AnthropicProvider;
pub use google::GoogleProvider;
pub use ollama::OllamaProvider;
pub use open_ai::OpenAIProvider;

use crate::config::{LlmConfig, Provider};
use crate::error::TagError;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sampling temperature sent to every provider
pub const TEMPERATURE: f64 = 0.3;
/// Output token limit sent to every provider
pub const MAX_TOKENS: u32 = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Connection parameters an adapter needs to build a request
#[derive(Debug, Clone, Copy)]
pub struct RequestParams<'a> {
    pub model: &'a str,
    pub api_key: &'a str,
    pub base_url: &'a str,
}

impl<'a> From<&'a LlmConfig> for RequestParams<'a> {
    fn from(config: &'a LlmConfig) -> Self {
        RequestParams {
            model: &config.model,
            api_key: &config.api_key,
            base_url: &config.base_url,
        }
    }
}

impl RequestParams<'_> {
    pub(crate) fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// A fully prepared HTTP call
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
}

impl ProviderRequest {
    pub(crate) fn post_json(url: String, body: Value) -> Self {
        ProviderRequest {
            url,
            method: Method::POST,
            headers: vec![
                ("Content-Type", "application/json".to_string()),
                ("Accept", "application/json".to_string()),
            ],
            body,
        }
    }

    pub(crate) fn with_header(mut self, name: &'static str, value: String) -> Self {
        self.headers.push((name, value));
        self
    }

    /// Serialized request body
    pub fn body_bytes(&self) -> Vec<u8> {
        self.body.to_string().into_bytes()
    }

    /// Headers safe to log: credentials are replaced with `***`
    pub fn redacted_headers(&self) -> Vec<(&'static str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| {
                let lower = name.to_lowercase();
                if lower.contains("key") || lower.contains("authorization") {
                    (*name, "***")
                } else {
                    (*name, value.as_str())
                }
            })
            .collect()
    }

    /// URL safe to log: a `key=` query parameter is replaced with `***`
    pub fn redacted_url(&self) -> String {
        match self.url.find("key=") {
            Some(pos) => format!("{}key=***", &self.url[..pos]),
            None => self.url.clone(),
        }
    }
}

/// One LLM wire protocol
pub trait ProviderAdapter: Send + Sync {
    /// Provider name used in logs and error messages
    fn name(&self) -> &'static str;

    /// Build the HTTP call for a chat exchange
    fn build_request(&self, params: &RequestParams<'_>, messages: &[ChatMessage])
        -> ProviderRequest;

    /// Locate the reply text in a successful response body
    fn extract_text<'a>(&self, body: &'a Value) -> Option<&'a str>;

    /// Parse a 2xx body into the reply text
    fn parse_response(&self, raw_body: &str) -> Result<String, TagError> {
        let body: Value = serde_json::from_str(raw_body).map_err(|e| {
            TagError::UnparsableResponse(format!("{} response is not JSON: {}", self.name(), e))
        })?;

        self.extract_text(&body)
            .map(str::to_string)
            .ok_or_else(|| {
                TagError::UnparsableResponse(format!(
                    "Failed to extract content from {} response. Response: {}",
                    self.name(),
                    body
                ))
            })
    }

    /// Pull a human-readable message out of a non-2xx body
    fn parse_error(&self, raw_body: &str) -> String {
        serde_json::from_str::<Value>(raw_body)
            .ok()
            .and_then(|body| body["error"]["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| raw_body.trim().to_string())
    }
}

static OPENAI: OpenAIProvider = OpenAIProvider;
static CLAUDE: AnthropicProvider = AnthropicProvider;
static GEMINI: GoogleProvider = GoogleProvider;
static OLLAMA: OllamaProvider = OllamaProvider;

impl Provider {
    /// The adapter implementing this provider's wire format
    pub fn adapter(self) -> &'static dyn ProviderAdapter {
        match self {
            Provider::OpenAI => &OPENAI,
            Provider::Claude => &CLAUDE,
            Provider::Gemini => &GEMINI,
            Provider::Ollama => &OLLAMA,
        }
    }
}

/// Split out the system prompt; when several are present the last one wins.
pub(crate) fn split_system(messages: &[ChatMessage]) -> (Option<&str>, Vec<&ChatMessage>) {
    let mut system = None;
    let mut rest = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role {
            Role::System => system = Some(message.content.as_str()),
            _ => rest.push(message),
        }
    }
    (system, rest)
}
