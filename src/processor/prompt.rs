//! Prompt templates for the LLM tag operations.
//!
//! Templates are loaded from the `prompts/` directory at compile time using
//! `include_str!`, which keeps them editable without Rust string escaping.
//! Placeholders look like `{{TAGS}}` and are filled by [`render`].

use crate::model::{Category, Tag};

/// System message for every operation that expects JSON back
pub const JSON_SYSTEM_PROMPT: &str = "You are a helpful assistant that specializes in AI art generation terminology. You always respond with valid JSON only.";

/// System message for the prose rewrite
pub const PROSE_SYSTEM_PROMPT: &str = "You are a helpful assistant that specializes in AI art generation prompts. You write vivid, concise image descriptions.";

pub const TRANSLATE_MATCH_PROMPT: &str = include_str!("prompts/translate_match.txt");
pub const RELEVANCE_PROMPT: &str = include_str!("prompts/relevance.txt");
pub const REORDER_PROMPT: &str = include_str!("prompts/reorder.txt");
pub const NATURAL_LANGUAGE_PROMPT: &str = include_str!("prompts/natural_language.txt");
pub const WISH_MODIFY_PROMPT: &str = include_str!("prompts/wish_modify.txt");
pub const WISH_GENERATE_PROMPT: &str = include_str!("prompts/wish_generate.txt");

/// Library entries shown to the model when generating from scratch
pub const LIBRARY_SAMPLE_SIZE: usize = 150;

/// Replace each `{{KEY}}` in `template` with its value
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |prompt, (key, value)| {
            prompt.replace(&format!("{{{{{}}}}}", key), value)
        })
}

/// `- tag` per line
pub fn bullet_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn category_lines(categories: &[Category]) -> String {
    categories
        .iter()
        .map(|c| format!("- ID: {}, English: {}, Chinese: {}", c.id, c.name_en, c.name_zh))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `- english (中文)` per line
pub fn tag_lines(tags: &[Tag]) -> String {
    tags.iter()
        .map(|t| format!("- {} ({})", t.name_en, t.name_zh))
        .collect::<Vec<_>>()
        .join("\n")
}
