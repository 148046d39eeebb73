use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::{AppSettings, LlmConfig},
    ingest::{IngestOutcome, Ingestor},
    llm::{ChatBackend, LlmClient, LLM_TIMEOUT},
    model::{Category, Tag},
    processor::{TagProcessor, WishMode},
    tags::translator::{Translator, DEFAULT_TRANSLATE_ENDPOINT, TRANSLATE_TIMEOUT},
    TagError,
};

/// Builder for a configured [`TagPipeline`]
#[derive(Default)]
pub struct TagPipelineBuilder {
    llm_config: Option<LlmConfig>,
    llm_timeout: Option<Duration>,
    translate_timeout: Option<Duration>,
    translate_endpoint: Option<String>,
    backend: Option<Arc<dyn ChatBackend>>,
}

impl TagPipelineBuilder {
    /// Set the LLM connection used by every operation
    ///
    /// # Example
    /// ```
    /// use tag_studio::{LlmConfig, Provider, TagPipeline};
    ///
    /// let pipeline = TagPipeline::builder()
    ///     .llm_config(LlmConfig {
    ///         enabled: true,
    ///         provider: Provider::Claude,
    ///         api_key: "sk-ant-...".to_string(),
    ///         base_url: "https://api.anthropic.com/v1".to_string(),
    ///         model: "claude-3-5-sonnet-20241022".to_string(),
    ///     })
    ///     .build();
    /// assert!(pipeline.llm_config().is_configured());
    /// ```
    pub fn llm_config(mut self, config: LlmConfig) -> Self {
        self.llm_config = Some(config);
        self
    }

    /// Take timeouts and the translation endpoint from process settings
    pub fn settings(mut self, settings: &AppSettings) -> Self {
        self.llm_timeout = Some(Duration::from_secs(settings.llm_timeout_secs));
        self.translate_timeout = Some(Duration::from_secs(settings.translate_timeout_secs));
        self.translate_endpoint = Some(settings.translate_endpoint.clone());
        self
    }

    /// Set the timeout for LLM requests (60 seconds by default)
    pub fn llm_timeout(mut self, duration: Duration) -> Self {
        self.llm_timeout = Some(duration);
        self
    }

    /// Set the timeout for free translation requests (5 seconds by default)
    pub fn translate_timeout(mut self, duration: Duration) -> Self {
        self.translate_timeout = Some(duration);
        self
    }

    /// Point the traditional translator at another endpoint
    ///
    /// # Example
    /// ```
    /// use tag_studio::TagPipeline;
    ///
    /// let pipeline = TagPipeline::builder()
    ///     .translate_endpoint("http://localhost:8080/translate_a/single")
    ///     .build();
    /// ```
    pub fn translate_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.translate_endpoint = Some(endpoint.into());
        self
    }

    /// Answer chat exchanges with `backend` instead of the HTTP client
    ///
    /// The connection test always goes over HTTP.
    pub fn backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn build(self) -> TagPipeline {
        let client = Arc::new(LlmClient::with_timeout(
            self.llm_timeout.unwrap_or(LLM_TIMEOUT),
        ));
        let backend = self
            .backend
            .unwrap_or_else(|| client.clone() as Arc<dyn ChatBackend>);

        TagPipeline {
            config: self.llm_config.unwrap_or_default(),
            client,
            processor: TagProcessor::new(backend),
            translator: Translator::with_endpoint(
                self.translate_endpoint
                    .unwrap_or_else(|| DEFAULT_TRANSLATE_ENDPOINT.to_string()),
                self.translate_timeout.unwrap_or(TRANSLATE_TIMEOUT),
            ),
        }
    }
}

/// Tag ingestion and LLM tag operations bound to one LLM configuration
pub struct TagPipeline {
    config: LlmConfig,
    client: Arc<LlmClient>,
    processor: TagProcessor,
    translator: Translator,
}

impl TagPipeline {
    /// Creates a new builder
    ///
    /// # Example
    /// ```
    /// use tag_studio::TagPipeline;
    ///
    /// let pipeline = TagPipeline::builder().build();
    /// assert!(!pipeline.llm_config().is_configured());
    /// ```
    pub fn builder() -> TagPipelineBuilder {
        TagPipelineBuilder::default()
    }

    pub fn llm_config(&self) -> &LlmConfig {
        &self.config
    }

    pub fn set_llm_config(&mut self, config: LlmConfig) {
        self.config = config;
    }

    pub fn processor(&self) -> &TagProcessor {
        &self.processor
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Parse and enrich pasted prompt text
    ///
    /// # Example
    /// ```no_run
    /// # use tag_studio::TagPipeline;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let pipeline = TagPipeline::builder().build();
    /// let outcome = pipeline
    ///     .ingest("masterpiece, (long hair:1.2), <lora:x:1>", &[], &[])
    ///     .await?;
    /// println!("{} new of {}", outcome.new_count, outcome.total);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn ingest(
        &self,
        raw_text: &str,
        categories: &[Category],
        existing_tags: &[Tag],
    ) -> Result<IngestOutcome, TagError> {
        Ingestor::new(&self.processor, &self.translator)
            .ingest(raw_text, categories, existing_tags, &self.config)
            .await
    }

    /// English names of the tags that belong to `category`
    pub async fn filter_relevant(
        &self,
        tags: &[Tag],
        category: &Category,
    ) -> Result<Vec<String>, TagError> {
        self.processor
            .filter_relevant(tags, category, &self.config)
            .await
    }

    /// Same tags in generation-priority order
    pub async fn reorder(&self, tags: &[String]) -> Result<Vec<String>, TagError> {
        self.processor.reorder(tags, &self.config).await
    }

    /// Tags rewritten as a short prose description
    pub async fn to_natural_language(&self, tags: &[String]) -> Result<String, TagError> {
        self.processor
            .to_natural_language(tags, &self.config)
            .await
    }

    /// Tags fulfilling a natural-language wish
    ///
    /// Returned tags either come from `library` or carry a placeholder id
    /// (see [`Tag::is_placeholder`]).
    pub async fn wish(
        &self,
        instruction: &str,
        mode: WishMode<'_>,
        library: &[Tag],
        categories: &[Category],
    ) -> Result<Vec<Tag>, TagError> {
        self.processor
            .wish(instruction, mode, library, categories, &self.config)
            .await
    }

    /// Check `config` (not necessarily the active one) with a tiny request
    pub async fn test_connection(&self, config: &LlmConfig) -> Result<String, TagError> {
        self.client.test_connection(config).await
    }
}
