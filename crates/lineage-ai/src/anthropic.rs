use crate::generator::{EnrichmentRequest, GenerationError, TextGenerator};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const SYSTEM_PROMPT: &str = "You are an expert in data governance and data lineage.";

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout: Duration,
}

impl AnthropicConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            max_tokens: 2000,
            temperature: 0.1,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<Message>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    output_tokens: usize,
}

/// Generator backed by the Anthropic Messages API.
pub struct AnthropicGenerator {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicGenerator {
    pub fn new(config: AnthropicConfig) -> Result<Self, GenerationError> {
        if config.api_key.expose_secret().trim().is_empty() {
            return Err(GenerationError::MissingApiKey("anthropic".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                GenerationError::Network(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &AnthropicConfig {
        &self.config
    }

    fn request_body(&self, prompt: String, max_tokens: usize) -> MessagesRequest<'_> {
        MessagesRequest {
            model: &self.config.model,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature: self.config.temperature,
        }
    }

    async fn send(&self, body: &MessagesRequest<'_>) -> Result<MessagesResponse, GenerationError> {
        let url = format!("{}/messages", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .header("x-api-key", self.config.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(format!(
                        "Anthropic request timeout after {:?}",
                        self.config.timeout
                    ))
                } else {
                    GenerationError::Network(format!("Anthropic request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))
    }
}

/// Concatenated text blocks of a response; other block types are ignored.
fn response_text(response: &MessagesResponse) -> String {
    response
        .content
        .iter()
        .filter(|block| block.block_type == "text")
        .filter_map(|block| block.text.as_deref())
        .collect::<Vec<_>>()
        .join("")
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    async fn enhance_description(
        &self,
        request: &EnrichmentRequest,
    ) -> Result<String, GenerationError> {
        let start = Instant::now();
        debug!("Enriching {} with {}", request.asset_name, self.config.model);

        let body = self.request_body(request.prompt(), self.config.max_tokens);
        let response = self.send(&body).await?;

        let text = response_text(&response);
        let text = text.trim();
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        info!(
            "Description for {} generated in {}ms ({} tokens)",
            request.asset_name,
            start.elapsed().as_millis(),
            response.usage.map(|u| u.output_tokens).unwrap_or(0)
        );
        Ok(text.to_string())
    }

    async fn is_available(&self) -> bool {
        let body = self.request_body("ping".to_string(), 1);
        self.send(&body).await.is_ok()
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
