use crate::anthropic::{AnthropicConfig, AnthropicGenerator};
use crate::generator::{GenerationError, TextGenerator};
use crate::ollama::{OllamaConfig, OllamaGenerator};
use lineage_core::LLMConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Builds the configured [`TextGenerator`].
pub struct GeneratorFactory;

impl GeneratorFactory {
    pub fn from_config(config: &LLMConfig) -> Result<Arc<dyn TextGenerator>, GenerationError> {
        if !config.enabled {
            return Err(GenerationError::Disabled);
        }

        match config.provider.to_lowercase().as_str() {
            "ollama" => Ok(Self::create_ollama(config)),
            "anthropic" | "claude" => Self::create_anthropic(config),
            other => Err(GenerationError::UnsupportedProvider(other.to_string())),
        }
    }

    pub fn available_providers() -> &'static [&'static str] {
        &["ollama", "anthropic"]
    }

    fn create_ollama(config: &LLMConfig) -> Arc<dyn TextGenerator> {
        let defaults = OllamaConfig::default();
        let ollama = OllamaConfig {
            model: config.model.clone().unwrap_or(defaults.model),
            base_url: config.ollama_url.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
        };
        info!("Using Ollama model {} at {}", ollama.model, ollama.base_url);
        Arc::new(OllamaGenerator::new(ollama))
    }

    fn create_anthropic(config: &LLMConfig) -> Result<Arc<dyn TextGenerator>, GenerationError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| GenerationError::MissingApiKey("anthropic".to_string()))?;

        let mut anthropic = AnthropicConfig::new(api_key);
        if let Some(model) = &config.model {
            anthropic.model = model.clone();
        }
        anthropic.base_url = config.anthropic_url.clone();
        anthropic.max_tokens = config.max_tokens;
        anthropic.temperature = config.temperature;
        anthropic.timeout = Duration::from_secs(config.timeout_secs);

        info!("Using Anthropic model {}", anthropic.model);
        Ok(Arc::new(AnthropicGenerator::new(anthropic)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_config() {
        let result = GeneratorFactory::from_config(&LLMConfig::default());
        assert!(matches!(result, Err(GenerationError::Disabled)));
    }

    #[test]
    fn test_unsupported_provider() {
        let config = LLMConfig {
            enabled: true,
            provider: "tinyllama".into(),
            ..Default::default()
        };
        assert!(matches!(
            GeneratorFactory::from_config(&config),
            Err(GenerationError::UnsupportedProvider(p)) if p == "tinyllama"
        ));
    }

    #[test]
    fn test_ollama_provider() {
        let config = LLMConfig {
            enabled: true,
            provider: "Ollama".into(),
            model: Some("mistral".into()),
            ..Default::default()
        };
        let generator = GeneratorFactory::from_config(&config).unwrap();
        assert_eq!(generator.name(), "ollama");
    }

    #[test]
    fn test_anthropic_provider() {
        let mut config = LLMConfig {
            enabled: true,
            provider: "claude".into(),
            ..Default::default()
        };
        assert!(matches!(
            GeneratorFactory::from_config(&config),
            Err(GenerationError::MissingApiKey(_))
        ));

        config.api_key = Some("sk-test".to_string().into());
        let generator = GeneratorFactory::from_config(&config).unwrap();
        assert_eq!(generator.name(), "anthropic");
    }
}
