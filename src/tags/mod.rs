//! Non-LLM tag handling: prompt text parsing, dictionary/remote translation
//! and keyword-based category matching.

pub mod classifier;
pub mod parser;
pub mod translator;

pub use classifier::match_category;
pub use parser::parse_tags_input;
pub use translator::{detect_language, Language, Translator};
