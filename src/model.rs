use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Color used when a parsed tag has no category to borrow one from
pub const DEFAULT_CATEGORY_COLOR: &str = "#6366f1";

/// A user-defined grouping bucket for tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    #[serde(default)]
    pub name_en: String,
    #[serde(default)]
    pub name_zh: String,
    #[serde(default = "default_color")]
    pub color: String,
}

impl Category {
    /// "中文 / English" label used in parse results
    pub fn display_name(&self) -> String {
        format!("{} / {}", self.name_zh, self.name_en)
    }
}

/// A bilingual prompt term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    #[serde(default)]
    pub name_en: String,
    #[serde(default)]
    pub name_zh: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "now")]
    pub created_at: NaiveDateTime,
}

impl Tag {
    /// Tags proposed by the LLM that are not in the library yet carry this id prefix
    pub const PLACEHOLDER_PREFIX: &'static str = "new_";

    pub fn is_placeholder(&self) -> bool {
        self.id.starts_with(Self::PLACEHOLDER_PREFIX)
    }
}

/// Fields a caller supplies when creating or replacing a tag
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewTag {
    pub name_en: String,
    pub name_zh: String,
    pub category_id: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

/// Fields a caller supplies when creating or replacing a category
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCategory {
    pub name_en: String,
    pub name_zh: String,
    #[serde(default = "default_color")]
    pub color: String,
}

/// An example image with the prompts that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryItem {
    pub id: String,
    pub image: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub positive_prompt: String,
    #[serde(default)]
    pub negative_prompt: String,
    #[serde(default = "now")]
    pub created_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
}

/// Which path produced a parsed tag's translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationSource {
    Llm,
    Traditional,
}

/// A candidate tag enriched for review before import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTagResult {
    pub original: String,
    pub name_en: String,
    pub name_zh: String,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub category_color: String,
    pub exists: bool,
    pub existing_id: Option<String>,
    pub weight: f64,
    pub translation_source: TranslationSource,
}

impl ParsedTagResult {
    pub fn new(
        original: String,
        name_en: String,
        name_zh: String,
        category: Option<&Category>,
        existing: Option<&Tag>,
        translation_source: TranslationSource,
    ) -> Self {
        ParsedTagResult {
            original,
            name_en,
            name_zh,
            category_id: category.map(|c| c.id.clone()),
            category_name: category.map(Category::display_name),
            category_color: category
                .map(|c| c.color.clone())
                .unwrap_or_else(default_color),
            exists: existing.is_some(),
            existing_id: existing.map(|t| t.id.clone()),
            weight: default_weight(),
            translation_source,
        }
    }
}

/// First stored tag whose English name matches case-insensitively or whose
/// Chinese name matches exactly.
pub fn find_existing<'a>(tags: &'a [Tag], name_en: &str, name_zh: &str) -> Option<&'a Tag> {
    let name_en = name_en.to_lowercase();
    tags.iter()
        .find(|t| {
            (!name_en.is_empty() && t.name_en.to_lowercase() == name_en)
                || (!name_zh.is_empty() && t.name_zh == name_zh)
        })
}

/// Timestamp id such as `20240501123045123456`
pub fn generate_id() -> String {
    Local::now().format("%Y%m%d%H%M%S%6f").to_string()
}

pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn default_color() -> String {
    DEFAULT_CATEGORY_COLOR.to_string()
}

fn default_weight() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(id: &str, en: &str, zh: &str) -> Tag {
        Tag {
            id: id.to_string(),
            name_en: en.to_string(),
            name_zh: zh.to_string(),
            category_id: None,
            weight: 1.0,
            created_at: now(),
        }
    }

    #[test]
    fn test_find_existing_case_insensitive_english() {
        let tags = vec![tag("1", "Masterpiece", "杰作")];
        let found = find_existing(&tags, "masterpiece", "其他").unwrap();
        assert_eq!(found.id, "1");
    }

    #[test]
    fn test_find_existing_exact_chinese() {
        let tags = vec![tag("1", "long hair", "长发")];
        assert!(find_existing(&tags, "long-hair", "长发").is_some());
        assert!(find_existing(&tags, "short hair", "短发").is_none());
    }

    #[test]
    fn test_generate_id_is_timestamp() {
        let id = generate_id();
        assert_eq!(id.len(), 20);
        assert!(id.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_tag_reads_python_isoformat() {
        let tag: Tag = serde_json::from_str(
            r#"{"id": "20240101120000000001", "name_en": "solo", "name_zh": "单人",
                "category_id": "c1", "weight": 1.2, "created_at": "2024-01-01T12:00:00.123456"}"#,
        )
        .unwrap();
        assert_eq!(tag.weight, 1.2);
        assert_eq!(tag.category_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_parsed_result_without_category() {
        let result = ParsedTagResult::new(
            "solo".into(),
            "solo".into(),
            "单人".into(),
            None,
            None,
            TranslationSource::Traditional,
        );
        assert_eq!(result.category_color, DEFAULT_CATEGORY_COLOR);
        assert!(result.category_name.is_none());
        assert!(!result.exists);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["translation_source"], "traditional");
    }

    #[test]
    fn test_placeholder_prefix() {
        assert!(tag("new_0_cat ears", "cat ears", "").is_placeholder());
        assert!(!tag("20240101", "cat ears", "").is_placeholder());
    }
}
