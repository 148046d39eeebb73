use thiserror::Error;

/// Errors that can occur while ingesting, transforming or storing tags
#[derive(Error, Debug)]
pub enum TagError {
    /// Empty or missing required input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network, DNS or timeout failure reaching an external service
    #[error("Connection failed: {0}")]
    Transport(String),

    /// Provider answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    Provider { status: u16, message: String },

    /// Provider answered 2xx but the body did not have the expected shape
    #[error("Unparsable response: {0}")]
    UnparsableResponse(String),

    /// LLM-only operation invoked while the integration is disabled or keyless
    #[error("LLM service is not configured: {0}")]
    NotConfigured(String),

    /// Reading or writing a document store or image file failed
    #[error("Storage error: {0}")]
    Store(#[from] std::io::Error),

    /// A document could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl TagError {
    /// True for the failures produced by the LLM layer, which ingestion
    /// recovers from by switching to the traditional path.
    pub fn is_llm_failure(&self) -> bool {
        matches!(
            self,
            TagError::Transport(_)
                | TagError::Provider { .. }
                | TagError::UnparsableResponse(_)
                | TagError::NotConfigured(_)
        )
    }
}

impl From<reqwest::Error> for TagError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TagError::Transport(format!("request timed out: {}", err))
        } else if err.is_decode() {
            TagError::UnparsableResponse(err.to_string())
        } else {
            TagError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_failures_are_recoverable() {
        assert!(TagError::Transport("dns".into()).is_llm_failure());
        assert!(TagError::Provider {
            status: 401,
            message: "bad key".into()
        }
        .is_llm_failure());
        assert!(TagError::UnparsableResponse("not json".into()).is_llm_failure());
        assert!(TagError::NotConfigured("disabled".into()).is_llm_failure());
        assert!(!TagError::InvalidInput("empty".into()).is_llm_failure());
    }

    #[test]
    fn test_provider_error_message() {
        let err = TagError::Provider {
            status: 429,
            message: "Rate limit exceeded".into(),
        };
        assert_eq!(err.to_string(), "HTTP 429: Rate limit exceeded");
    }
}
