use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use smartcrm_core::config::{LlmConfig, LlmProvider};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("llm api error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("llm returned an unusable response: {0}")]
    InvalidResponse(String),
    #[error("llm client misconfigured: {0}")]
    Configuration(String),
}

/// A single-turn text completion backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// Builds the client selected by `llm.provider`.
pub fn build_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    match config.provider {
        LlmProvider::Anthropic => Ok(Arc::new(AnthropicClient::new(config)?)),
        LlmProvider::Ollama => Ok(Arc::new(OllamaClient::new(config)?)),
    }
}

/// Anthropic Messages API client.
#[derive(Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .as_ref()
            .ok_or_else(|| LlmError::Configuration("anthropic api key is not set".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let key_header = HeaderValue::from_str(api_key.expose_secret()).map_err(|_| {
            LlmError::Configuration("api key contains invalid header characters".to_string())
        })?;
        headers.insert("x-api-key", key_header);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/messages", config.effective_base_url()),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
            messages: vec![Message { role: "user", content: &request.prompt }],
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status: status.as_u16(), body });
        }

        let response: MessagesResponse = response.json().await?;
        let text = response
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .ok_or_else(|| LlmError::InvalidResponse("no text content in response".to_string()))?;

        debug!(model = %self.model, response_len = text.len(), "anthropic completion received");
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Local model served by Ollama's `/api/generate` endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", config.effective_base_url()),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_output_tokens,
            },
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status: status.as_u16(), body });
        }

        let response: GenerateResponse = response.json().await?;
        if response.response.trim().is_empty() {
            return Err(LlmError::InvalidResponse("empty completion".to_string()));
        }
        Ok(response.response)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
