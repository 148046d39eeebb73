//! Turn pasted prompt text into reviewable tag candidates, then import the
//! accepted ones into the library.

use crate::config::LlmConfig;
use crate::error::TagError;
use crate::model::{find_existing, Category, NewTag, ParsedTagResult, Tag, TranslationSource};
use crate::processor::{LlmTagMatch, TagProcessor};
use crate::store::TagLibrary;
use crate::tags::{detect_language, match_category, parse_tags_input, Language, Translator};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Which path produced an ingest outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMethod {
    Llm,
    Traditional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub results: Vec<ParsedTagResult>,
    pub method: IngestMethod,
    pub total: usize,
    pub new_count: usize,
}

impl IngestOutcome {
    fn new(results: Vec<ParsedTagResult>, method: IngestMethod) -> Self {
        let new_count = results.iter().filter(|r| !r.exists).count();
        IngestOutcome {
            total: results.len(),
            new_count,
            results,
            method,
        }
    }
}

/// Result of a batch import
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub imported: Vec<Tag>,
    /// English names of candidates that were not imported
    pub skipped: Vec<String>,
}

pub struct Ingestor<'a> {
    processor: &'a TagProcessor,
    translator: &'a Translator,
}

impl<'a> Ingestor<'a> {
    pub fn new(processor: &'a TagProcessor, translator: &'a Translator) -> Self {
        Ingestor {
            processor,
            translator,
        }
    }

    /// Parse `raw_text` and enrich every candidate with both names, a
    /// category and whether it is already stored.
    ///
    /// The LLM path is tried first when it is configured and there is at
    /// least one category. Any failure there falls back to dictionary plus
    /// web translation and keyword matching, so only empty input is an error.
    pub async fn ingest(
        &self,
        raw_text: &str,
        categories: &[Category],
        existing_tags: &[Tag],
        config: &LlmConfig,
    ) -> Result<IngestOutcome, TagError> {
        if raw_text.trim().is_empty() {
            return Err(TagError::InvalidInput("Input text is required".to_string()));
        }

        let candidates = parse_tags_input(raw_text);
        if candidates.is_empty() {
            return Ok(IngestOutcome::new(Vec::new(), IngestMethod::Traditional));
        }

        if config.is_configured() && !categories.is_empty() {
            match self
                .processor
                .translate_and_match(&candidates, categories, config)
                .await
            {
                Ok(matches) => {
                    info!("Processed {} tags with LLM", matches.len());
                    let results = matches
                        .into_iter()
                        .map(|m| llm_result(m, categories, existing_tags))
                        .collect();
                    return Ok(IngestOutcome::new(results, IngestMethod::Llm));
                }
                Err(e) => warn!("LLM processing failed, falling back to traditional: {}", e),
            }
        }

        let mut results = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            results.push(self.traditional_result(candidate, categories, existing_tags).await);
        }
        Ok(IngestOutcome::new(results, IngestMethod::Traditional))
    }

    async fn traditional_result(
        &self,
        original: String,
        categories: &[Category],
        existing_tags: &[Tag],
    ) -> ParsedTagResult {
        let (name_en, name_zh) = match detect_language(&original) {
            Language::Zh => {
                let english = self
                    .translator
                    .translate(&original, Language::Zh, Language::En)
                    .await;
                (english, original.clone())
            }
            Language::En => {
                let chinese = self
                    .translator
                    .translate(&original, Language::En, Language::Zh)
                    .await;
                (original.clone(), chinese)
            }
        };

        let existing = find_existing(existing_tags, &name_en, &name_zh);
        let category = match_category(&name_en, categories)
            .and_then(|id| categories.iter().find(|c| c.id == id));

        ParsedTagResult::new(
            original,
            name_en,
            name_zh,
            category,
            existing,
            TranslationSource::Traditional,
        )
    }
}

fn llm_result(m: LlmTagMatch, categories: &[Category], existing_tags: &[Tag]) -> ParsedTagResult {
    let existing = find_existing(existing_tags, &m.name_en, &m.name_zh);
    let category = categories.iter().find(|c| c.id == m.category_id);
    ParsedTagResult::new(
        m.original,
        m.name_en,
        m.name_zh,
        category,
        existing,
        TranslationSource::Llm,
    )
}

/// Add reviewed candidates to the library.
///
/// A candidate is skipped when it already exists (unless `force`) or when it
/// has no category. Existence is re-checked against the library as it grows,
/// so a batch holding the same tag twice imports it once.
pub fn import_parsed(
    library: &mut TagLibrary,
    results: &[ParsedTagResult],
    force: bool,
) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for result in results {
        let already_stored = result.exists
            || find_existing(&library.tags, &result.name_en, &result.name_zh).is_some();
        let Some(category_id) = result.category_id.clone() else {
            summary.skipped.push(result.name_en.clone());
            continue;
        };
        if already_stored && !force {
            summary.skipped.push(result.name_en.clone());
            continue;
        }

        let tag = library.add_tag(NewTag {
            name_en: result.name_en.clone(),
            name_zh: result.name_zh.clone(),
            category_id: Some(category_id),
            weight: result.weight,
        });
        summary.imported.push(tag);
    }

    info!(
        "Imported {} tags, skipped {}",
        summary.imported.len(),
        summary.skipped.len()
    );
    summary
}
