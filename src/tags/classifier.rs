use crate::model::Category;

/// Keyword groups keyed by a word expected in a category's name.
/// Iteration order matters: the first group that matches wins.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "quality",
        &["quality", "detailed", "resolution", "res", "8k", "4k", "hd", "masterpiece", "wallpaper"],
    ),
    (
        "style",
        &["style", "anime", "realistic", "art", "painting", "illustration", "sketch", "manga", "watercolor", "oil"],
    ),
    (
        "character",
        &["girl", "boy", "man", "woman", "person", "solo", "couple", "group", "people"],
    ),
    (
        "face",
        &["face", "eyes", "mouth", "smile", "expression", "blush", "looking", "gaze"],
    ),
    ("hair", &["hair", "bangs", "ponytail", "braid", "twintails", "bun"]),
    (
        "dress",
        &["dress", "uniform", "clothes", "outfit", "wear", "shirt", "pants", "skirt", "suit", "armor", "swimsuit", "bikini", "maid", "kimono"],
    ),
    (
        "scene",
        &["scene", "background", "outdoors", "indoors", "nature", "city", "forest", "beach", "sky", "room", "street"],
    ),
    (
        "lighting",
        &["lighting", "light", "shadow", "glow", "sun", "moon", "dark", "bright"],
    ),
    (
        "composition",
        &["body", "portrait", "view", "angle", "close", "shot", "full", "upper", "lower"],
    ),
    (
        "action",
        &["standing", "sitting", "lying", "walking", "running", "jumping", "pose", "action", "dancing", "fighting"],
    ),
    (
        "view",
        &["view", "pov", "perspective", "from above", "from below", "from side"],
    ),
    (
        "negative",
        &["bad", "worst", "low", "error", "wrong", "ugly", "deformed", "blurry", "missing", "extra", "watermark"],
    ),
];

/// Pick a category for `tag_text` by keyword.
///
/// A category qualifies when one of the group keys appears in its English
/// (case-insensitive) or Chinese name and one of that group's keywords
/// appears in the lower-cased tag. Categories are scanned in storage order
/// and the first qualifying one wins; with no match the first category is
/// returned, or `None` when there are no categories.
pub fn match_category(tag_text: &str, categories: &[Category]) -> Option<String> {
    let tag_lower = tag_text.to_lowercase();

    categories
        .iter()
        .find(|category| {
            let name_en = category.name_en.to_lowercase();
            CATEGORY_KEYWORDS.iter().any(|(group, keywords)| {
                (name_en.contains(group) || category.name_zh.contains(group))
                    && keywords.iter().any(|keyword| tag_lower.contains(keyword))
            })
        })
        .or_else(|| categories.first())
        .map(|category| category.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: &str, name_en: &str, name_zh: &str) -> Category {
        Category {
            id: id.to_string(),
            name_en: name_en.to_string(),
            name_zh: name_zh.to_string(),
            color: "#ffffff".to_string(),
        }
    }

    fn library() -> Vec<Category> {
        vec![
            category("quality", "Quality", "质量"),
            category("hair", "Hair", "头发"),
            category("scene", "Scene/Background", "场景"),
            category("light", "Lighting", "光照"),
        ]
    }

    #[test]
    fn test_scene_keyword() {
        let categories = vec![category("c1", "Scene", "场景")];
        assert_eq!(
            match_category("outdoor forest scene", &categories),
            Some("c1".to_string())
        );
    }

    #[test]
    fn test_matches_by_group() {
        let categories = library();
        assert_eq!(match_category("long hair", &categories).as_deref(), Some("hair"));
        assert_eq!(match_category("beach", &categories).as_deref(), Some("scene"));
        assert_eq!(
            match_category("Cinematic Lighting", &categories).as_deref(),
            Some("light")
        );
    }

    #[test]
    fn test_first_category_wins_in_storage_order() {
        let categories = library();
        assert_eq!(match_category("highres, shiny hair", &categories).as_deref(), Some("quality"));
    }

    #[test]
    fn test_falls_back_to_first_category() {
        let categories = library();
        assert_eq!(
            match_category("xyzzy", &categories).as_deref(),
            Some("quality")
        );
    }

    #[test]
    fn test_no_categories() {
        assert_eq!(match_category("long hair", &[]), None);
    }

    #[test]
    fn test_chinese_only_names_never_match_groups() {
        // Group keys are English, so a Chinese-only category qualifies only by fallback
        let categories = vec![category("zh", "", "发型"), category("en", "Hair", "")];
        assert_eq!(match_category("ponytail", &categories).as_deref(), Some("en"));
    }
}
