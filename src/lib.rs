pub mod builder;
pub mod config;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod model;
pub mod processor;
pub mod providers;
pub mod store;
pub mod tags;

// Re-export commonly used types
pub use builder::{TagPipeline, TagPipelineBuilder};
pub use config::{mask_api_key, AppSettings, LlmConfig, LlmConfigUpdate, MaskedLlmConfig, Provider};
pub use error::TagError;
pub use ingest::{import_parsed, ImportSummary, IngestMethod, IngestOutcome, Ingestor};
pub use llm::{ChatBackend, LlmClient};
pub use model::{
    Category, GalleryItem, NewCategory, NewTag, ParsedTagResult, Tag, TranslationSource,
};
pub use processor::{LlmTagMatch, TagProcessor, WishMode};
pub use providers::{ChatMessage, ProviderAdapter, Role};
pub use store::{
    ConfigDocument, ConfigStore, DocumentStore, Gallery, GalleryStore, ImageFiles, JsonFileStore,
    TagLibrary, TagStore,
};
pub use tags::{detect_language, match_category, parse_tags_input, Language, Translator};
