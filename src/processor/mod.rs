//! LLM-backed tag operations.
//!
//! Every operation builds an instruction prompt, sends it through a
//! [`ChatBackend`] and parses the reply. None of them has a non-LLM
//! fallback; callers get `NotConfigured` or the underlying LLM error.

pub mod json;
pub mod prompt;

use crate::config::LlmConfig;
use crate::error::TagError;
use crate::llm::ChatBackend;
use crate::model::{generate_id, now, Category, Tag};
use crate::providers::ChatMessage;
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

pub use json::{extract_json_payload, strip_code_fences};

/// One tag as translated and categorized by the LLM
#[derive(Debug, Clone, PartialEq)]
pub struct LlmTagMatch {
    pub original: String,
    pub name_en: String,
    pub name_zh: String,
    pub category_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawTagMatch {
    #[serde(default)]
    original: Option<String>,
    #[serde(default)]
    name_en: Option<String>,
    #[serde(default)]
    name_zh: Option<String>,
    #[serde(default)]
    category_id: Option<String>,
}

/// What a wish should do
#[derive(Debug, Clone, Copy)]
pub enum WishMode<'a> {
    /// Revise the currently selected tags
    Modify(&'a [Tag]),
    /// Produce a fresh set grounded on the library
    Generate,
}

pub struct TagProcessor {
    backend: Arc<dyn ChatBackend>,
}

impl TagProcessor {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        TagProcessor { backend }
    }

    async fn ask(
        &self,
        system: &str,
        prompt: String,
        config: &LlmConfig,
    ) -> Result<String, TagError> {
        if !config.is_configured() {
            return Err(TagError::NotConfigured(
                "enable the LLM service and set an API key first".to_string(),
            ));
        }

        let messages = [ChatMessage::system(system), ChatMessage::user(prompt)];
        let reply = self.backend.chat(&messages, config).await?;
        debug!("LLM reply: {}", reply);
        Ok(reply)
    }

    /// Translate raw tags and assign each a category id from `categories`.
    ///
    /// Unknown category ids in the reply are replaced by the first category.
    /// An unparsable or empty reply is an error, never a partial result.
    pub async fn translate_and_match(
        &self,
        tags: &[String],
        categories: &[Category],
        config: &LlmConfig,
    ) -> Result<Vec<LlmTagMatch>, TagError> {
        let first_category = categories
            .first()
            .ok_or_else(|| TagError::InvalidInput("no categories to match against".to_string()))?;
        if tags.is_empty() {
            return Err(TagError::InvalidInput("no tags to translate".to_string()));
        }

        let prompt = prompt::render(
            prompt::TRANSLATE_MATCH_PROMPT,
            &[
                ("CATEGORIES", prompt::category_lines(categories).as_str()),
                ("TAGS", prompt::bullet_list(tags).as_str()),
            ],
        );
        let reply = self.ask(prompt::JSON_SYSTEM_PROMPT, prompt, config).await?;

        let raw: Vec<RawTagMatch> = serde_json::from_value(extract_json_payload(&reply)?)
            .map_err(|e| {
                TagError::UnparsableResponse(format!("expected an array of tag objects: {}", e))
            })?;
        if raw.is_empty() {
            return Err(TagError::UnparsableResponse(
                "LLM returned no tags".to_string(),
            ));
        }

        Ok(raw
            .into_iter()
            .map(|item| {
                let name_en = item
                    .name_en
                    .or_else(|| item.original.clone())
                    .unwrap_or_default();
                let category_id = match item.category_id {
                    Some(id) if categories.iter().any(|c| c.id == id) => id,
                    other => {
                        warn!(
                            "LLM returned unknown category {:?} for '{}', using '{}'",
                            other, name_en, first_category.id
                        );
                        first_category.id.clone()
                    }
                };
                LlmTagMatch {
                    original: item.original.unwrap_or_else(|| name_en.clone()),
                    name_zh: item.name_zh.unwrap_or_default(),
                    name_en,
                    category_id,
                }
            })
            .collect())
    }

    /// English names of the tags the LLM judges relevant to `category`.
    /// A reply that is valid JSON but not a list counts as "none relevant".
    pub async fn filter_relevant(
        &self,
        tags: &[Tag],
        category: &Category,
        config: &LlmConfig,
    ) -> Result<Vec<String>, TagError> {
        if tags.is_empty() {
            return Err(TagError::InvalidInput("no tags to analyze".to_string()));
        }

        let prompt = prompt::render(
            prompt::RELEVANCE_PROMPT,
            &[
                ("CATEGORY_EN", category.name_en.as_str()),
                ("CATEGORY_ZH", category.name_zh.as_str()),
                ("TAGS", prompt::tag_lines(tags).as_str()),
            ],
        );
        let reply = self.ask(prompt::JSON_SYSTEM_PROMPT, prompt, config).await?;

        let relevant = match extract_json_payload(&reply)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };
        info!(
            "{} of {} tags relevant to '{}'",
            relevant.len(),
            tags.len(),
            category.name_en
        );
        Ok(relevant)
    }

    /// Reorder `tags` quality → style → subject → scene → details.
    ///
    /// The reply is used only as an ordering hint: the result always holds
    /// exactly the input tags. Tags the model skipped keep their relative
    /// order at the end; names it invented are ignored.
    pub async fn reorder(
        &self,
        tags: &[String],
        config: &LlmConfig,
    ) -> Result<Vec<String>, TagError> {
        if tags.is_empty() {
            return Err(TagError::InvalidInput("no tags to reorder".to_string()));
        }

        let prompt = prompt::render(
            prompt::REORDER_PROMPT,
            &[("TAGS", prompt::bullet_list(tags).as_str())],
        );
        let reply = self.ask(prompt::JSON_SYSTEM_PROMPT, prompt, config).await?;

        let hints = match extract_json_payload(&reply)? {
            Value::Array(items) => items,
            other => {
                return Err(TagError::UnparsableResponse(format!(
                    "expected a JSON array of tags, got: {}",
                    other
                )))
            }
        };

        Ok(apply_order_hints(tags, &hints))
    }

    /// Rewrite tags as a 2-4 sentence description.
    pub async fn to_natural_language(
        &self,
        tags: &[String],
        config: &LlmConfig,
    ) -> Result<String, TagError> {
        if tags.is_empty() {
            return Err(TagError::InvalidInput("no tags to describe".to_string()));
        }

        let prompt = prompt::render(
            prompt::NATURAL_LANGUAGE_PROMPT,
            &[("TAGS", tags.join(", ").as_str())],
        );
        let reply = self.ask(prompt::PROSE_SYSTEM_PROMPT, prompt, config).await?;

        let text = strip_surrounding_quotes(&strip_code_fences(&reply)).to_string();
        if text.is_empty() {
            return Err(TagError::UnparsableResponse(
                "LLM returned an empty description".to_string(),
            ));
        }
        Ok(text)
    }

    /// Turn a free-text instruction into tags.
    ///
    /// Returned names are matched case-insensitively against `library`;
    /// names with no match become placeholder tags (id prefixed with
    /// [`Tag::PLACEHOLDER_PREFIX`]) filed under the first category.
    pub async fn wish(
        &self,
        instruction: &str,
        mode: WishMode<'_>,
        library: &[Tag],
        categories: &[Category],
        config: &LlmConfig,
    ) -> Result<Vec<Tag>, TagError> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(TagError::InvalidInput("no instruction given".to_string()));
        }

        let prompt = match mode {
            WishMode::Modify(current) => prompt::render(
                prompt::WISH_MODIFY_PROMPT,
                &[
                    ("CURRENT", prompt::tag_lines(current).as_str()),
                    ("INSTRUCTION", instruction),
                ],
            ),
            WishMode::Generate => {
                let sample = &library[..library.len().min(prompt::LIBRARY_SAMPLE_SIZE)];
                prompt::render(
                    prompt::WISH_GENERATE_PROMPT,
                    &[
                        ("INSTRUCTION", instruction),
                        ("LIBRARY", prompt::tag_lines(sample).as_str()),
                    ],
                )
            }
        };
        let reply = self.ask(prompt::JSON_SYSTEM_PROMPT, prompt, config).await?;

        let names = match extract_json_payload(&reply)? {
            Value::Array(items) => items,
            Value::Object(mut object) => match object.remove("tags") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(TagError::UnparsableResponse(
                        "expected a JSON array of tag names".to_string(),
                    ))
                }
            },
            _ => {
                return Err(TagError::UnparsableResponse(
                    "expected a JSON array of tag names".to_string(),
                ))
            }
        };

        let default_category = categories.first().map(|c| c.id.clone());
        let mut seen = HashSet::new();
        let mut result = Vec::new();

        for (index, item) in names.iter().enumerate() {
            let (name_en, name_zh) = match item {
                Value::String(name) => (name.trim().to_string(), String::new()),
                Value::Object(_) => (
                    item["name_en"].as_str().unwrap_or_default().trim().to_string(),
                    item["name_zh"].as_str().unwrap_or_default().to_string(),
                ),
                _ => continue,
            };
            if name_en.is_empty() || !seen.insert(name_en.to_lowercase()) {
                continue;
            }

            let lower = name_en.to_lowercase();
            match library.iter().find(|t| t.name_en.to_lowercase() == lower) {
                Some(existing) => result.push(existing.clone()),
                None => result.push(Tag {
                    id: format!("{}{}_{}", Tag::PLACEHOLDER_PREFIX, index, generate_id()),
                    name_en,
                    name_zh,
                    category_id: default_category.clone(),
                    weight: 1.0,
                    created_at: now(),
                }),
            }
        }

        info!(
            "Wish produced {} tags ({} new)",
            result.len(),
            result.iter().filter(|t| t.is_placeholder()).count()
        );
        Ok(result)
    }
}

/// Order `tags` by the model's suggestion without adding or losing any.
fn apply_order_hints(tags: &[String], hints: &[Value]) -> Vec<String> {
    let mut remaining: Vec<Option<&String>> = tags.iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(tags.len());

    for hint in hints.iter().filter_map(Value::as_str) {
        let hint = hint.trim().to_lowercase();
        let slot = remaining
            .iter_mut()
            .find(|slot| slot.is_some_and(|tag| tag.trim().to_lowercase() == hint));
        if let Some(slot) = slot {
            if let Some(tag) = slot.take() {
                ordered.push(tag.clone());
            }
        }
    }

    ordered.extend(remaining.into_iter().flatten().cloned());
    ordered
}

fn strip_surrounding_quotes(text: &str) -> &str {
    let text = text.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”'), ('「', '」')] {
        if text.chars().count() >= 2 && text.starts_with(open) && text.ends_with(close) {
            return text[open.len_utf8()..text.len() - close.len_utf8()].trim();
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a canned answer and remembers the prompts it saw
    struct ScriptedBackend {
        reply: Result<String, String>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedBackend {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(ScriptedBackend {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(error: &str) -> Arc<Self> {
            Arc::new(ScriptedBackend {
                reply: Err(error.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last_prompt(&self) -> String {
            let seen = self.seen.lock().unwrap();
            seen.last().unwrap().last().unwrap().content.clone()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn chat(
            &self,
            messages: &[ChatMessage],
            _config: &LlmConfig,
        ) -> Result<String, TagError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.reply.clone().map_err(TagError::Transport)
        }
    }

    fn config() -> LlmConfig {
        LlmConfig {
            enabled: true,
            api_key: "sk-test".to_string(),
            ..Default::default()
        }
    }

    fn category(id: &str, name_en: &str, name_zh: &str) -> Category {
        Category {
            id: id.to_string(),
            name_en: name_en.to_string(),
            name_zh: name_zh.to_string(),
            color: "#22c55e".to_string(),
        }
    }

    fn tag(id: &str, name_en: &str, name_zh: &str) -> Tag {
        Tag {
            id: id.to_string(),
            name_en: name_en.to_string(),
            name_zh: name_zh.to_string(),
            category_id: Some("c1".to_string()),
            weight: 1.0,
            created_at: now(),
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    const TRANSLATED: &str = r#"[
        {"original": "masterpiece", "name_en": "masterpiece", "name_zh": "杰作", "category_id": "c1"},
        {"original": "长发", "name_en": "long hair", "name_zh": "长发", "category_id": "bogus"}
    ]"#;

    #[tokio::test]
    async fn test_translate_and_match() {
        let backend = ScriptedBackend::ok(TRANSLATED);
        let processor = TagProcessor::new(backend.clone());
        let categories = vec![category("c1", "Quality", "质量"), category("c2", "Hair", "头发")];

        let result = processor
            .translate_and_match(&strings(&["masterpiece", "长发"]), &categories, &config())
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].name_zh, "杰作");
        assert_eq!(result[0].category_id, "c1");
        // Unknown id falls back to the first category
        assert_eq!(result[1].category_id, "c1");
        assert_eq!(result[1].original, "长发");

        let prompt = backend.last_prompt();
        assert!(prompt.contains("- ID: c2, English: Hair, Chinese: 头发"));
        assert!(prompt.contains("- 长发"));
    }

    #[tokio::test]
    async fn test_translate_and_match_fenced_equals_plain() {
        let categories = vec![category("c1", "Quality", "质量")];
        let tags = strings(&["masterpiece", "长发"]);

        let plain = TagProcessor::new(ScriptedBackend::ok(TRANSLATED))
            .translate_and_match(&tags, &categories, &config())
            .await
            .unwrap();
        let fenced = TagProcessor::new(ScriptedBackend::ok(&format!("```json\n{}\n```", TRANSLATED)))
            .translate_and_match(&tags, &categories, &config())
            .await
            .unwrap();

        assert_eq!(plain, fenced);
    }

    #[tokio::test]
    async fn test_translate_and_match_missing_fields() {
        let processor = TagProcessor::new(ScriptedBackend::ok(r#"[{"original": "solo"}]"#));
        let result = processor
            .translate_and_match(&strings(&["solo"]), &[category("c1", "Character", "角色")], &config())
            .await
            .unwrap();

        assert_eq!(result[0].name_en, "solo");
        assert_eq!(result[0].name_zh, "");
        assert_eq!(result[0].category_id, "c1");
    }

    #[tokio::test]
    async fn test_translate_and_match_rejects_prose_and_empty() {
        let categories = vec![category("c1", "Quality", "质量")];
        for reply in ["Here you go: masterpiece = 杰作", "[]", r#"{"name_en": "solo"}"#] {
            let result = TagProcessor::new(ScriptedBackend::ok(reply))
                .translate_and_match(&strings(&["masterpiece"]), &categories, &config())
                .await;
            assert!(
                matches!(result, Err(TagError::UnparsableResponse(_))),
                "reply {:?} gave {:?}",
                reply,
                result
            );
        }
    }

    #[tokio::test]
    async fn test_translate_and_match_requires_categories() {
        let backend = ScriptedBackend::ok(TRANSLATED);
        let result = TagProcessor::new(backend.clone())
            .translate_and_match(&strings(&["masterpiece"]), &[], &config())
            .await;
        assert!(matches!(result, Err(TagError::InvalidInput(_))));
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_not_configured() {
        let backend = ScriptedBackend::ok("[]");
        let processor = TagProcessor::new(backend.clone());
        let disabled = LlmConfig {
            enabled: false,
            api_key: "sk-test".to_string(),
            ..Default::default()
        };

        let result = processor.reorder(&strings(&["solo"]), &disabled).await;
        assert!(matches!(result, Err(TagError::NotConfigured(_))));
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filter_relevant() {
        let backend = ScriptedBackend::ok("```json\n[\"long hair\", 42, \"ponytail\"]\n```");
        let processor = TagProcessor::new(backend.clone());
        let tags = vec![
            tag("1", "long hair", "长发"),
            tag("2", "ponytail", "马尾"),
            tag("3", "beach", "海滩"),
        ];

        let relevant = processor
            .filter_relevant(&tags, &category("h", "Hair", "头发"), &config())
            .await
            .unwrap();

        assert_eq!(relevant, strings(&["long hair", "ponytail"]));
        assert!(backend.last_prompt().contains("- beach (海滩)"));
    }

    #[tokio::test]
    async fn test_filter_relevant_non_list_is_empty() {
        let processor = TagProcessor::new(ScriptedBackend::ok(r#"{"relevant": ["long hair"]}"#));
        let relevant = processor
            .filter_relevant(&[tag("1", "long hair", "长发")], &category("h", "Hair", "头发"), &config())
            .await
            .unwrap();
        assert!(relevant.is_empty());
    }

    #[tokio::test]
    async fn test_reorder_uses_hints_only() {
        let processor = TagProcessor::new(ScriptedBackend::ok(
            r#"["Masterpiece", "anime", "1girl", "invented tag", "forest"]"#,
        ));
        let tags = strings(&["forest", "1girl", "masterpiece", "soft lighting", "anime"]);

        let reordered = processor.reorder(&tags, &config()).await.unwrap();

        assert_eq!(
            reordered,
            strings(&["masterpiece", "anime", "1girl", "forest", "soft lighting"])
        );
    }

    #[tokio::test]
    async fn test_reorder_failure_is_explicit() {
        let tags = strings(&["forest", "1girl"]);

        let prose = TagProcessor::new(ScriptedBackend::ok("1girl, forest"))
            .reorder(&tags, &config())
            .await;
        assert!(matches!(prose, Err(TagError::UnparsableResponse(_))));

        let transport = TagProcessor::new(ScriptedBackend::failing("timed out"))
            .reorder(&tags, &config())
            .await;
        assert!(matches!(transport, Err(TagError::Transport(_))));
    }

    #[tokio::test]
    async fn test_reorder_fenced_equals_plain() {
        let tags = strings(&["forest", "masterpiece"]);
        let plain = TagProcessor::new(ScriptedBackend::ok(r#"["masterpiece", "forest"]"#))
            .reorder(&tags, &config())
            .await
            .unwrap();
        let fenced = TagProcessor::new(ScriptedBackend::ok("```json\n[\"masterpiece\", \"forest\"]\n```"))
            .reorder(&tags, &config())
            .await
            .unwrap();
        assert_eq!(plain, fenced);
    }

    #[tokio::test]
    async fn test_natural_language_strips_quotes() {
        let backend = ScriptedBackend::ok("\"A girl with long hair stands in a sunlit forest.\"");
        let text = TagProcessor::new(backend.clone())
            .to_natural_language(&strings(&["1girl", "long hair", "forest"]), &config())
            .await
            .unwrap();

        assert_eq!(text, "A girl with long hair stands in a sunlit forest.");
        assert!(backend.last_prompt().contains("1girl, long hair, forest"));
    }

    #[tokio::test]
    async fn test_natural_language_fenced_equals_plain() {
        let tags = strings(&["1girl"]);
        let plain = TagProcessor::new(ScriptedBackend::ok("A lone girl."))
            .to_natural_language(&tags, &config())
            .await
            .unwrap();
        let fenced = TagProcessor::new(ScriptedBackend::ok("```\nA lone girl.\n```"))
            .to_natural_language(&tags, &config())
            .await
            .unwrap();
        assert_eq!(plain, fenced);
    }

    #[tokio::test]
    async fn test_wish_modify_matches_library() {
        let backend = ScriptedBackend::ok(r#"["Long Hair", "cat ears", "long hair", "smile"]"#);
        let processor = TagProcessor::new(backend.clone());
        let library = vec![tag("10", "long hair", "长发"), tag("11", "smile", "微笑")];
        let categories = vec![category("c1", "Character", "角色")];
        let current = vec![tag("10", "long hair", "长发")];

        let result = processor
            .wish(
                "add cat ears and make her smile",
                WishMode::Modify(&current),
                &library,
                &categories,
                &config(),
            )
            .await
            .unwrap();

        let names: Vec<&str> = result.iter().map(|t| t.name_en.as_str()).collect();
        assert_eq!(names, vec!["long hair", "cat ears", "smile"]);
        assert_eq!(result[0].id, "10");
        assert!(result[1].is_placeholder());
        assert_eq!(result[1].category_id.as_deref(), Some("c1"));
        assert!(!result[2].is_placeholder());

        let prompt = backend.last_prompt();
        assert!(prompt.contains("- long hair (长发)"));
        assert!(prompt.contains("add cat ears"));
    }

    #[tokio::test]
    async fn test_wish_generate_accepts_tags_object_and_fence() {
        let backend = ScriptedBackend::ok("```json\n{\"tags\": [\"masterpiece\", \"night sky\"]}\n```");
        let library = vec![tag("1", "masterpiece", "杰作")];

        let result = TagProcessor::new(backend.clone())
            .wish("a starry night", WishMode::Generate, &library, &[], &config())
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "1");
        assert!(result[1].is_placeholder());
        assert_eq!(result[1].category_id, None);
        assert!(backend.last_prompt().contains("- masterpiece (杰作)"));
    }

    #[tokio::test]
    async fn test_wish_requires_instruction() {
        let result = TagProcessor::new(ScriptedBackend::ok("[]"))
            .wish("   ", WishMode::Generate, &[], &[], &config())
            .await;
        assert!(matches!(result, Err(TagError::InvalidInput(_))));
    }

    #[test]
    fn test_strip_surrounding_quotes() {
        assert_eq!(strip_surrounding_quotes("'hi'"), "hi");
        assert_eq!(strip_surrounding_quotes("“你好”"), "你好");
        assert_eq!(strip_surrounding_quotes("\"unbalanced"), "\"unbalanced");
        assert_eq!(strip_surrounding_quotes("\""), "\"");
    }
}
