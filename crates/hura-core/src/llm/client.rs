//! LLM API HTTP client

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::{LlmConfig, LlmProvider};
use crate::error::{Error, Result};

use super::types::*;

/// LLM API client (Claude, OpenAI-compatible, Gemini)
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    provider: LlmProvider,
    max_tokens: u32,
    temperature: f32,
}

impl LlmClient {
    /// Create a new LLM client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.effective_model().to_string(),
            base_url: config.effective_base_url().trim_end_matches('/').to_string(),
            provider: config.provider.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Create with custom base URL (for testing or self-hosted endpoints)
    pub fn with_base_url(config: &LlmConfig, base_url: impl Into<String>) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(client)
    }

    /// Single-turn completion with the configured sampling settings
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = CompletionRequest {
            system: Some(system.to_string()),
            messages: vec![Message::user(user)],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        self.send(request).await
    }

    /// Send a completion request and return the generated text
    pub async fn send(&self, request: CompletionRequest) -> Result<String> {
        let text = match self.provider {
            LlmProvider::Claude => self.send_claude_request(request).await?,
            LlmProvider::OpenAi | LlmProvider::Gemini => self.send_openai_request(request).await?,
        };
        Ok(text.trim().to_string())
    }

    async fn send_claude_request(&self, request: CompletionRequest) -> Result<String> {
        let url = format!("{}/messages", self.base_url);
        debug!("Sending request to Claude API: {}", url);

        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system,
            messages: request.messages,
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!("Claude API error: {} - {}", status, text);
            return Err(Error::LlmApi(format!("{}: {}", status, text)));
        }

        let parsed: MessagesResponse = serde_json::from_str(&text)
            .map_err(|e| Error::LlmApi(format!("Failed to parse response: {} - {}", e, text)))?;

        info!(
            "Claude API response: stop_reason={:?}, tokens={}",
            parsed.stop_reason,
            parsed.usage.as_ref().map(|u| u.output_tokens).unwrap_or(0)
        );

        Ok(parsed.text())
    }

    async fn send_openai_request(&self, request: CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("Sending request to OpenAI-compatible API: {}", url);

        let body = ChatCompletionRequest::from_completion(&self.model, &request);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!("OpenAI-compatible API error: {} - {}", status, text);
            return Err(Error::LlmApi(format!("{}: {}", status, text)));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| Error::LlmApi(format!("Failed to parse response: {} - {}", e, text)))?;

        info!(
            "OpenAI-compatible API response: finish_reason={:?}, tokens={}",
            parsed.choices.first().and_then(|c| c.finish_reason.clone()),
            parsed.usage.as_ref().map(|u| u.completion_tokens).unwrap_or(0)
        );

        Ok(parsed.text())
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the provider type
    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }
}
