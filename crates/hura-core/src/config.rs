//! Configuration management
//!
//! Settings are resolved in this order:
//! 1. environment variables
//! 2. `hura.toml` in the working directory
//! 3. defaults
//!
//! `${VAR_NAME}` inside the TOML file is expanded from the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default configuration file name
pub const CONFIG_FILE: &str = "hura.toml";

/// LLM provider type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Anthropic Claude Messages API
    #[default]
    Claude,
    /// OpenAI-compatible chat completions
    OpenAi,
    /// Google Gemini through its OpenAI-compatible endpoint
    Gemini,
}

impl LlmProvider {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "openai" | "glm" | "ollama" => LlmProvider::OpenAi,
            "gemini" | "google" => LlmProvider::Gemini,
            _ => LlmProvider::Claude,
        }
    }

    /// Base URL used when none is configured
    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::Claude => "https://api.anthropic.com/v1",
            LlmProvider::OpenAi => "https://api.openai.com/v1",
            LlmProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    /// Model used when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Claude => "claude-3-5-haiku-latest",
            LlmProvider::OpenAi => "gpt-4o-mini",
            LlmProvider::Gemini => "gemini-1.5-flash",
        }
    }
}

/// Embedding backend type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// In-process feature hashing, no external service
    #[default]
    Local,
    /// OpenAI-compatible `/embeddings` endpoint
    OpenAi,
}

/// Retrieval strategy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Maximal marginal relevance
    #[default]
    Mmr,
    /// Plain cosine similarity
    Similarity,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Requests allowed per client per minute
    pub rate_limit_per_minute: u32,
    /// Allowed CORS origins. `None` allows any origin.
    pub allowed_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7860,
            rate_limit_per_minute: 60,
            allowed_origins: None,
        }
    }
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub persistent_dir: String,
    pub model_cache: String,
    pub vector_db_path: String,
    /// Directory holding the Q&A JSON corpus
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            persistent_dir: "/data".to_string(),
            model_cache: "/data/models".to_string(),
            vector_db_path: "/data/vector_db".to_string(),
            data_dir: "data".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn persistent_path(&self) -> PathBuf {
        PathBuf::from(&self.persistent_dir)
    }

    pub fn model_cache_path(&self) -> PathBuf {
        PathBuf::from(&self.model_cache)
    }

    pub fn vector_db_path(&self) -> PathBuf {
        PathBuf::from(&self.vector_db_path)
    }

    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: String,
    /// Model name. Empty means the provider default.
    pub model: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Claude,
            api_key: String::new(),
            model: String::new(),
            base_url: None,
            max_tokens: 256,
            temperature: 0.3,
        }
    }
}

impl LlmConfig {
    pub fn effective_model(&self) -> &str {
        if self.model.is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }

    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: String,
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Local,
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            base_url: None,
            api_key: String::new(),
            dimension: 384,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub search_k: usize,
    pub search_type: SearchType,
    /// Candidates considered by MMR before re-ranking
    pub fetch_k: usize,
    /// MMR trade-off: 1.0 is pure relevance, 0.0 pure diversity
    pub lambda_mult: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            search_k: 2,
            search_type: SearchType::Mmr,
            fetch_k: 20,
            lambda_mult: 0.5,
        }
    }
}

/// Translation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub google_api_key: String,
    /// Translate through the configured LLM
    pub use_llm: bool,
    pub google_base_url: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            google_api_key: String::new(),
            use_llm: true,
            google_base_url: "https://translation.googleapis.com".to_string(),
        }
    }
}

/// Google Maps configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapsConfig {
    pub api_key: String,
    pub default_location: String,
    pub base_url: String,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            default_location: "Kigali, Rwanda".to_string(),
            base_url: "https://maps.googleapis.com".to_string(),
        }
    }
}

/// OpenWeather configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_key: String,
    pub default_city: String,
    pub default_country: String,
    pub base_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            default_city: "Kigali".to_string(),
            default_country: "RW".to_string(),
            base_url: "http://api.openweathermap.org".to_string(),
        }
    }
}

/// WhatsApp (Twilio) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    pub enabled: bool,
    pub account_sid: String,
    #[serde(skip_serializing)]
    pub auth_token: String,
    pub phone_number: String,
    /// Public base URL Twilio calls; used to rebuild the signed webhook URL
    pub public_base_url: String,
    pub validate_signature: bool,
    /// Idle sessions older than this are dropped. 0 keeps them forever.
    pub session_idle_timeout_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            account_sid: String::new(),
            auth_token: String::new(),
            phone_number: String::new(),
            public_base_url: "https://lola97-hura-chatbot.hf.space".to_string(),
            validate_signature: false,
            session_idle_timeout_secs: 0,
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub translation: TranslationConfig,
    pub maps: MapsConfig,
    pub weather: WeatherConfig,
    pub whatsapp: WhatsAppConfig,
}

impl Config {
    /// Expand `${VAR_NAME}` references from the environment.
    ///
    /// Unknown variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Parse a TOML document (after environment expansion)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let expanded = Self::expand_env_vars(content);
        toml::from_str(&expanded).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&content)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    /// Load `hura.toml` when present, otherwise the environment only
    pub fn load() -> Result<Self> {
        if Path::new(CONFIG_FILE).exists() {
            return Self::from_toml_file(CONFIG_FILE);
        }
        Ok(Self::from_env())
    }

    fn apply_env_overrides(&mut self) {
        // Server
        if let Some(host) = env_string("HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse("PORT") {
            self.server.port = port;
        }
        if let Some(limit) = env_parse("RATE_LIMIT_PER_MINUTE") {
            self.server.rate_limit_per_minute = limit;
        }
        if let Some(origins) = env_string("API_ALLOWED_ORIGINS") {
            self.server.allowed_origins = Some(split_list(&origins));
        }

        // Storage
        if let Some(dir) = env_string("PERSISTENT_DIR") {
            self.storage.persistent_dir = dir;
        }
        if let Some(dir) = env_string("MODEL_CACHE") {
            self.storage.model_cache = dir;
        }
        if let Some(dir) = env_string("VECTOR_DB_PATH") {
            self.storage.vector_db_path = dir;
        }
        if let Some(dir) = env_string("DATA_DIR") {
            self.storage.data_dir = dir;
        }

        // LLM
        if let Some(provider) = env_string("LLM_PROVIDER") {
            self.llm.provider = LlmProvider::parse(&provider);
        }
        if let Some(key) = env_string("LLM_API_KEY") {
            self.llm.api_key = key;
        }
        if let Some(model) = env_string("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = env_string("LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Some(key) = env_string("GEMINI_API_KEY") {
            if self.llm.api_key.is_empty() {
                self.llm.provider = LlmProvider::Gemini;
                self.llm.api_key = key;
            }
        }

        // Embedding
        if let Some(provider) = env_string("EMBEDDING_PROVIDER") {
            self.embedding.provider = match provider.to_lowercase().as_str() {
                "openai" | "http" => EmbeddingProvider::OpenAi,
                _ => EmbeddingProvider::Local,
            };
        }
        if let Some(model) = env_string("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(url) = env_string("EMBEDDING_BASE_URL") {
            self.embedding.base_url = Some(url);
        }
        if let Some(key) = env_string("EMBEDDING_API_KEY") {
            self.embedding.api_key = key;
        }

        // Retrieval
        if let Some(k) = env_parse("SEARCH_K") {
            self.retrieval.search_k = k;
        }
        if let Some(search_type) = env_string("SEARCH_TYPE") {
            self.retrieval.search_type = match search_type.to_lowercase().as_str() {
                "similarity" => SearchType::Similarity,
                _ => SearchType::Mmr,
            };
        }

        // External APIs
        if let Some(key) = env_string("GOOGLE_TRANSLATE_API_KEY") {
            self.translation.google_api_key = key;
        }
        if let Some(key) = env_string("GOOGLE_MAPS_API_KEY") {
            self.maps.api_key = key;
        }
        if let Some(key) = env_string("OPENWEATHER_API_KEY") {
            self.weather.api_key = key;
        }

        // WhatsApp
        if let Some(enabled) = env_string("WHATSAPP_ENABLED") {
            self.whatsapp.enabled = enabled.to_lowercase() != "false";
        }
        if let Some(sid) = env_string("TWILIO_ACCOUNT_SID") {
            self.whatsapp.account_sid = sid;
        }
        if let Some(token) = env_string("TWILIO_AUTH_TOKEN") {
            self.whatsapp.auth_token = token;
        }
        if let Some(number) = env_string("TWILIO_PHONE_NUMBER") {
            self.whatsapp.phone_number = number;
        }
        if let Some(url) = env_string("WHATSAPP_API_BASE_URL") {
            self.whatsapp.public_base_url = url;
        }
        if let Some(validate) = env_string("TWILIO_VALIDATE_SIGNATURE") {
            self.whatsapp.validate_signature = validate.to_lowercase() == "true";
        }
        if let Some(secs) = env_parse("SESSION_IDLE_TIMEOUT_SECS") {
            self.whatsapp.session_idle_timeout_secs = secs;
        }
    }

    pub fn llm_configured(&self) -> bool {
        !self.llm.api_key.is_empty()
    }

    pub fn maps_enabled(&self) -> bool {
        !self.maps.api_key.is_empty()
    }

    pub fn weather_enabled(&self) -> bool {
        !self.weather.api_key.is_empty()
    }

    pub fn twilio_configured(&self) -> bool {
        !self.whatsapp.account_sid.is_empty()
            && !self.whatsapp.auth_token.is_empty()
            && !self.whatsapp.phone_number.is_empty()
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|v| v.parse().ok())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
