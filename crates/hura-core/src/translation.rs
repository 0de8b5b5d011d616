//! English ↔ Kinyarwanda translation

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::backend::Translator;
use crate::config::{Config, LlmProvider, TranslationConfig};
use crate::error::{Error, Result};
use crate::llm::LlmClient;

/// Translation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "en2rw")]
    EnToRw,
    #[serde(rename = "rw2en")]
    RwToEn,
}

impl Direction {
    pub fn source_language(&self) -> &'static str {
        match self {
            Direction::EnToRw => "English",
            Direction::RwToEn => "Kinyarwanda",
        }
    }

    pub fn target_language(&self) -> &'static str {
        match self {
            Direction::EnToRw => "Kinyarwanda",
            Direction::RwToEn => "English",
        }
    }

    /// ISO codes (source, target)
    pub fn codes(&self) -> (&'static str, &'static str) {
        match self {
            Direction::EnToRw => ("en", "rw"),
            Direction::RwToEn => ("rw", "en"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::EnToRw => "en2rw",
            Direction::RwToEn => "rw2en",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "en2rw" => Some(Direction::EnToRw),
            "rw2en" => Some(Direction::RwToEn),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collapse runs of whitespace and trim
pub fn post_process(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// LLM backend
// ============================================================================

/// Translation through a chat model
pub struct LlmTranslator {
    client: LlmClient,
    name: String,
}

impl LlmTranslator {
    pub fn new(client: LlmClient) -> Self {
        let vendor = match client.provider() {
            LlmProvider::Claude => "Claude",
            LlmProvider::OpenAi => "OpenAI",
            LlmProvider::Gemini => "Gemini",
        };
        let name = format!("{} ({})", vendor, client.model());
        Self { client, name }
    }

    fn system_prompt(direction: Direction) -> String {
        format!(
            "You are a professional translator. Translate the user's text from {} to {}. \
             Reply with the translation only, without quotes, notes or explanations.",
            direction.source_language(),
            direction.target_language()
        )
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn translate(&self, text: &str, direction: Direction) -> Result<String> {
        let output = self
            .client
            .complete(&Self::system_prompt(direction), text)
            .await
            .map_err(|e| Error::Translation(e.to_string()))?;

        if output.trim().is_empty() {
            return Err(Error::Translation("model returned an empty translation".to_string()));
        }
        Ok(output)
    }
}

// ============================================================================
// Google Translate v2
// ============================================================================

#[derive(Debug, Serialize)]
struct GoogleRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    data: GoogleData,
}

#[derive(Debug, Deserialize)]
struct GoogleData {
    translations: Vec<GoogleTranslation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTranslation {
    translated_text: String,
}

/// Google Cloud Translation (v2 REST)
pub struct GoogleTranslator {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GoogleTranslator {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key: config.google_api_key.clone(),
            base_url: config.google_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn name(&self) -> &str {
        "Google Translate"
    }

    async fn translate(&self, text: &str, direction: Direction) -> Result<String> {
        let (source, target) = direction.codes();
        let url = format!("{}/language/translate/v2", self.base_url);
        debug!("Requesting Google translation {} -> {}", source, target);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&GoogleRequest {
                q: text,
                source,
                target,
                format: "text",
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Translation(format!("Google Translate {}: {}", status, body)));
        }

        let parsed: GoogleResponse = response.json().await?;
        parsed
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| Error::Translation("Google Translate returned no translations".to_string()))
    }
}

// ============================================================================
// Service
// ============================================================================

/// A produced translation and the backend that made it
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub text: String,
    pub service: String,
}

/// Ordered chain of translation backends
pub struct TranslationService {
    backends: Vec<Arc<dyn Translator>>,
}

impl TranslationService {
    pub fn new(primary: Arc<dyn Translator>, fallback: Option<Arc<dyn Translator>>) -> Self {
        let mut backends = vec![primary];
        backends.extend(fallback);
        Self { backends }
    }

    /// Build the chain from configuration. `None` when no backend is usable.
    pub fn from_config(config: &Config, llm: Option<LlmClient>) -> Result<Option<Self>> {
        let mut backends: Vec<Arc<dyn Translator>> = Vec::new();

        if config.translation.use_llm {
            if let Some(client) = llm {
                backends.push(Arc::new(LlmTranslator::new(client)));
            }
        }
        if !config.translation.google_api_key.is_empty() {
            backends.push(Arc::new(GoogleTranslator::new(&config.translation)?));
        }

        if backends.is_empty() {
            warn!("No translation backend configured");
            return Ok(None);
        }

        info!(
            "Translation backends: {}",
            backends.iter().map(|b| b.name()).collect::<Vec<_>>().join(", ")
        );
        Ok(Some(Self { backends }))
    }

    /// Name of the primary backend
    pub fn name(&self) -> &str {
        self.backends.first().map(|b| b.name()).unwrap_or("none")
    }

    /// Translate, falling through the chain until a backend succeeds
    pub async fn translate(&self, text: &str, direction: Direction) -> Result<Translation> {
        let mut last_error = None;

        for backend in &self.backends {
            match backend.translate(text, direction).await {
                Ok(output) => {
                    let translated = post_process(&output);
                    info!("Translation ({}): '{}' -> '{}'", direction, text, translated);
                    return Ok(Translation {
                        text: translated,
                        service: backend.name().to_string(),
                    });
                }
                Err(e) => {
                    error!("Translation error ({}) via {}: {}", direction, backend.name(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Translation("no translation backend".to_string())))
    }
}
