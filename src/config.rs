use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Process settings for the tag studio
#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    /// Directory holding tags.json, gallery.json and config.json
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory holding uploaded gallery images
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// LLM request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub llm_timeout_secs: u64,
    /// Free translation request timeout in seconds
    #[serde(default = "default_translate_timeout")]
    pub translate_timeout_secs: u64,
    /// Free translation endpoint (query-string GET)
    #[serde(default = "default_translate_endpoint")]
    pub translate_endpoint: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            upload_dir: default_upload_dir(),
            llm_timeout_secs: default_llm_timeout(),
            translate_timeout_secs: default_translate_timeout(),
            translate_endpoint: default_translate_endpoint(),
        }
    }
}

impl AppSettings {
    /// Load settings from file and environment variables
    ///
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables with TAG_STUDIO__ prefix
    /// 2. tag_studio.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: TAG_STUDIO__LLM_TIMEOUT_SECS
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            // Optional settings file (can be missing)
            .add_source(File::with_name("tag_studio").required(false))
            .add_source(
                Environment::with_prefix("TAG_STUDIO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn tags_path(&self) -> PathBuf {
        self.data_dir.join("tags.json")
    }

    pub fn gallery_path(&self) -> PathBuf {
        self.data_dir.join("gallery.json")
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }
}

/// Supported LLM wire protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAI,
    Claude,
    Gemini,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Claude => "claude",
            Provider::Gemini => "gemini",
            Provider::Ollama => "ollama",
        }
    }

    /// List all provider names
    pub fn all() -> [Provider; 4] {
        [
            Provider::OpenAI,
            Provider::Claude,
            Provider::Gemini,
            Provider::Ollama,
        ]
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "claude" | "anthropic" => Ok(Provider::Claude),
            "gemini" | "google" => Ok(Provider::Gemini),
            "ollama" => Ok(Provider::Ollama),
            other => Err(format!("Unknown provider: {}", other)),
        }
    }
}

/// Persisted LLM integration settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: Provider::default(),
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
        }
    }
}

// Keeps the key out of debug logs.
impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("enabled", &self.enabled)
            .field("provider", &self.provider)
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl LlmConfig {
    /// Enabled and carrying a non-blank key
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.api_key.trim().is_empty()
    }

    /// Display view that never contains the full key
    pub fn masked(&self) -> MaskedLlmConfig {
        MaskedLlmConfig {
            enabled: self.enabled,
            provider: self.provider,
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key_masked: mask_api_key(&self.api_key),
            has_api_key: !self.api_key.is_empty(),
        }
    }

    pub fn apply(&mut self, update: LlmConfigUpdate) {
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(provider) = update.provider {
            self.provider = provider;
        }
        // A blank key in an update means "keep the stored one"
        if let Some(api_key) = update.api_key.filter(|k| !k.is_empty()) {
            self.api_key = api_key;
        }
        if let Some(base_url) = update.base_url {
            self.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(model) = update.model {
            self.model = model;
        }
    }
}

/// LLM settings as shown to a user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaskedLlmConfig {
    pub enabled: bool,
    pub provider: Provider,
    pub base_url: String,
    pub model: String,
    pub api_key_masked: String,
    pub has_api_key: bool,
}

/// Partial update of [`LlmConfig`]; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmConfigUpdate {
    pub enabled: Option<bool>,
    pub provider: Option<Provider>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

/// Show the first and last four characters of keys longer than 8,
/// fully mask anything shorter.
pub fn mask_api_key(api_key: &str) -> String {
    if api_key.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = api_key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
    } else {
        "****".to_string()
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("static").join("uploads")
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_translate_timeout() -> u64 {
    5
}

fn default_translate_endpoint() -> String {
    "https://translate.googleapis.com/translate_a/single".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
