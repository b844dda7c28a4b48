use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{EchoLeafError, Result};

/// Main configuration structure loaded from echoleaf.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub generation: GenerationConfig,
    pub classifier: ClassifierConfig,
    pub limits: LimitsConfig,
    pub storage: StorageConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Upstream model selection and transport settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    /// Default model for study analysis
    pub fast_model: String,
    /// Higher-capability model used when thinking mode is on
    pub thinking_model: String,
    pub chat_model: String,
    pub research_model: String,
    pub thinking_budget: u32,
    /// Transport timeout for a single request; 0 disables it
    pub timeout_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            fast_model: "gemini-2.5-flash".to_string(),
            thinking_model: "gemini-2.5-pro".to_string(),
            chat_model: "gemini-2.5-flash-lite".to_string(),
            research_model: "gemini-2.5-pro".to_string(),
            thinking_budget: 32_768,
            timeout_ms: 300_000,
        }
    }
}

/// Provisional thresholds for telling a topic list apart from study prose.
///
/// Text shorter than `topic_max_chars`, or averaging fewer than
/// `topic_max_words_per_line` words per line, is treated as a list of topics.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub topic_max_chars: usize,
    pub topic_max_words_per_line: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            topic_max_chars: 500,
            topic_max_words_per_line: 15.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_urls: usize,
    /// Characters of main content forwarded to the chat model as context
    pub chat_context_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_urls: 5,
            chat_context_chars: 2000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the platform data directory
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolved data directory: configured path, else `<platform data dir>/echoleaf`.
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("echoleaf")
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub api_key: Option<String>,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            log_level: "echoleaf=info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("API_KEY"))
                .ok()
                .filter(|k| !k.trim().is_empty()),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "echoleaf=info".to_string()),
        }
    }
}

/// Loads `.env` (or the file named by `ECHOLEAF_ENV_FILE`) into the process
/// environment. Variables already set are left alone, so calling this more
/// than once is harmless.
pub fn load_env_file() {
    match std::env::var("ECHOLEAF_ENV_FILE") {
        Ok(path) => {
            load_env_from(Path::new(&path));
        }
        Err(_) => {
            let _ = dotenvy::dotenv();
        }
    }
}

/// Returns whether the file was found and parsed.
pub fn load_env_from(path: &Path) -> bool {
    dotenvy::from_path(path).is_ok()
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    /// Uses ECHOLEAF_CONFIG or defaults to "echoleaf.toml".
    pub fn load() -> Result<Self> {
        load_env_file();

        let explicit = std::env::var("ECHOLEAF_CONFIG").ok();
        let config_path = explicit
            .clone()
            .unwrap_or_else(|| "echoleaf.toml".to_string());

        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(content) => Self::from_toml(&content)?,
            Err(e) if explicit.is_some() => {
                tracing::warn!("Failed to read {}: {}, using defaults", config_path, e);
                Self::default()
            }
            Err(_) => {
                tracing::debug!("Config file {} not found, using defaults", config_path);
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("ECHOLEAF_BASE_URL") {
            self.generation.base_url = v;
        }
        if let Ok(v) = std::env::var("ECHOLEAF_FAST_MODEL") {
            self.generation.fast_model = v;
        }
        if let Ok(v) = std::env::var("ECHOLEAF_THINKING_MODEL") {
            self.generation.thinking_model = v;
        }
        if let Ok(v) = std::env::var("ECHOLEAF_CHAT_MODEL") {
            self.generation.chat_model = v;
        }
        if let Ok(v) = std::env::var("ECHOLEAF_RESEARCH_MODEL") {
            self.generation.research_model = v;
        }
        if let Some(v) = std::env::var("ECHOLEAF_THINKING_BUDGET")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
        {
            self.generation.thinking_budget = v;
        }
        if let Some(v) = std::env::var("ECHOLEAF_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.generation.timeout_ms = v;
        }
        if let Some(v) = std::env::var("ECHOLEAF_TOPIC_MAX_CHARS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            self.classifier.topic_max_chars = v;
        }
        if let Some(v) = std::env::var("ECHOLEAF_TOPIC_MAX_WORDS_PER_LINE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
        {
            self.classifier.topic_max_words_per_line = v;
        }
        if let Some(v) = std::env::var("ECHOLEAF_MAX_URLS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            self.limits.max_urls = v;
        }
        if let Ok(v) = std::env::var("ECHOLEAF_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(v));
        }
    }

    /// Validate and clamp values that would otherwise break the pipeline
    pub fn validate(&mut self) -> Result<()> {
        if !self.generation.base_url.starts_with("http://")
            && !self.generation.base_url.starts_with("https://")
        {
            return Err(EchoLeafError::Config {
                message: format!(
                    "generation.base_url '{}' must start with http:// or https://",
                    self.generation.base_url
                ),
            });
        }
        for (name, model) in [
            ("fast_model", &self.generation.fast_model),
            ("thinking_model", &self.generation.thinking_model),
            ("chat_model", &self.generation.chat_model),
            ("research_model", &self.generation.research_model),
        ] {
            if model.trim().is_empty() {
                return Err(EchoLeafError::Config {
                    message: format!("generation.{name} must not be empty"),
                });
            }
        }
        if self.limits.max_urls == 0 {
            tracing::warn!("limits.max_urls of 0 would reject every URL, using 1");
            self.limits.max_urls = 1;
        }
        if !self.classifier.topic_max_words_per_line.is_finite()
            || self.classifier.topic_max_words_per_line < 0.0
        {
            tracing::warn!(
                "classifier.topic_max_words_per_line {} is invalid, using default",
                self.classifier.topic_max_words_per_line
            );
            self.classifier.topic_max_words_per_line =
                ClassifierConfig::default().topic_max_words_per_line;
        }
        Ok(())
    }

    /// API key for the generation service, required only by commands that call it
    pub fn require_api_key(&self) -> Result<&str> {
        self.runtime
            .api_key
            .as_deref()
            .ok_or_else(|| EchoLeafError::Config {
                message: "GEMINI_API_KEY (or API_KEY) environment variable not set".to_string(),
            })
    }
}
