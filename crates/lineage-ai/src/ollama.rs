use crate::generator::{EnrichmentRequest, GenerationError, TextGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info};

const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub model: String,
    pub base_url: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            base_url: "http://localhost:11434".to_string(),
            max_tokens: 2000,
            temperature: 0.1,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    eval_count: Option<usize>,
}

/// Generator backed by a local Ollama server (`/api/generate`).
pub struct OllamaGenerator {
    client: Client,
    config: OllamaConfig,
}

impl OllamaGenerator {
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request_body(&self, request: &EnrichmentRequest) -> GenerateRequest<'_> {
        GenerateRequest {
            model: &self.config.model,
            prompt: request.prompt(),
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn enhance_description(
        &self,
        request: &EnrichmentRequest,
    ) -> Result<String, GenerationError> {
        let start = Instant::now();
        let body = self.request_body(request);
        debug!("Enriching {} with {}", request.asset_name, self.config.model);

        let response = timeout(
            self.config.timeout,
            self.client.post(self.url("api/generate")).json(&body).send(),
        )
        .await
        .map_err(|_| {
            GenerationError::Timeout(format!(
                "Ollama request timeout after {:?}",
                self.config.timeout
            ))
        })?
        .map_err(|e| GenerationError::Network(format!("Ollama request failed: {}", e)))?;

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

        let data: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        let text = data.response.trim();
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        info!(
            "Description for {} generated in {}ms ({} tokens)",
            request.asset_name,
            start.elapsed().as_millis(),
            data.eval_count.unwrap_or(0)
        );
        Ok(text.to_string())
    }

    async fn is_available(&self) -> bool {
        let response = match timeout(
            AVAILABILITY_TIMEOUT,
            self.client.get(self.url("api/tags")).send(),
        )
        .await
        {
            Ok(Ok(response)) if response.status().is_success() => response,
            _ => return false,
        };

        let tags: serde_json::Value = match response.json().await {
            Ok(tags) => tags,
            Err(_) => return false,
        };

        let model = self.config.model.as_str();
        tags["models"]
            .as_array()
            .map(|models| {
                models.iter().any(|m| {
                    m["name"]
                        .as_str()
                        .map(|name| name == model || name.starts_with(&format!("{}:", model)))
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
