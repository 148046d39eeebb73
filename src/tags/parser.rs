use regex::Regex;
use std::sync::LazyLock;

static ANGLE_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static WEIGHTED_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]*):[\d.]+\)").unwrap());
static BRACKETS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[{}\[\]]").unwrap());
static WEIGHT_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":[\d.]+").unwrap());
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,;\n]+").unwrap());

/// Shortest piece kept as a tag, in characters
const MIN_TAG_CHARS: usize = 2;

/// Split prompt text into candidate tags.
///
/// Strips `<lora:...>` style annotations, unwraps `(phrase:1.2)` weights,
/// drops `{}`/`[]` emphasis brackets and any leftover `:weight` suffixes,
/// then splits on commas, semicolons and newlines. Order is preserved and
/// duplicates are kept.
pub fn parse_tags_input(text: &str) -> Vec<String> {
    let text = ANGLE_ANNOTATION.replace_all(text, "");
    let text = WEIGHTED_GROUP.replace_all(&text, "${1}");
    let text = BRACKETS.replace_all(&text, "");
    let text = WEIGHT_SUFFIX.replace_all(&text, "");

    SEPARATORS
        .split(&text)
        .map(str::trim)
        .filter(|tag| tag.chars().count() >= MIN_TAG_CHARS)
        .map(str::to_string)
        .collect()
}
