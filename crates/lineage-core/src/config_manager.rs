use crate::types::LineageDirection;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for LineageGraph
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LineageConfig {
    /// Remote catalog connection and query parameters
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Default traversal limits
    #[serde(default)]
    pub traversal: TraversalConfig,

    /// Text-generation collaborator
    #[serde(default)]
    pub llm: LLMConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Catalog connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog service (e.g. "https://catalog.example.com/access")
    #[serde(default)]
    pub base_url: String,

    /// API version path segment
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default)]
    pub username: Option<String>,

    // Never serialized; only read from config files or env.
    #[serde(default, skip_serializing)]
    pub password: Option<SecretString>,

    /// Associations requested with every query
    #[serde(default = "default_associations")]
    pub associations: Vec<String>,

    #[serde(default = "default_true")]
    pub include_src_links: bool,

    #[serde(default = "default_true")]
    pub include_dst_links: bool,

    #[serde(default)]
    pub include_ref_objects: bool,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default)]
    pub offset: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Additional attempts for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Accept self-signed certificates
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_version: default_api_version(),
            username: None,
            password: None,
            associations: default_associations(),
            include_src_links: true,
            include_dst_links: true,
            include_ref_objects: false,
            page_size: default_page_size(),
            offset: 0,
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            accept_invalid_certs: false,
        }
    }
}

impl CatalogConfig {
    /// Full URL of the object query endpoint.
    pub fn browse_url(&self) -> String {
        format!(
            "{}/{}/catalog/data/objects",
            self.base_url.trim_end_matches('/'),
            self.api_version
        )
    }

    /// Query parameters sent with every request, before the query expression.
    pub fn static_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .associations
            .iter()
            .map(|a| ("associations".to_string(), a.clone()))
            .collect();

        params.extend([
            (
                "includeDstLinks".to_string(),
                self.include_dst_links.to_string(),
            ),
            (
                "includeRefObjects".to_string(),
                self.include_ref_objects.to_string(),
            ),
            (
                "includeSrcLinks".to_string(),
                self.include_src_links.to_string(),
            ),
            ("offset".to_string(), self.offset.to_string()),
            ("pageSize".to_string(), self.page_size.to_string()),
        ]);

        params
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Default traversal limits applied when a caller does not override them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_max_total_nodes")]
    pub max_total_nodes: usize,

    #[serde(default)]
    pub default_direction: LineageDirection,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_total_nodes: default_max_total_nodes(),
            default_direction: LineageDirection::Upstream,
        }
    }
}

/// LLM configuration for description enrichment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Enable enrichment (false = catalog data only)
    #[serde(default)]
    pub enabled: bool,

    /// Provider: "ollama" or "anthropic" ("claude" is accepted as an alias)
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    #[serde(default = "default_anthropic_url")]
    pub anthropic_url: String,

    // Never serialized; only read from config files or env.
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_llm_provider(),
            model: None,
            ollama_url: default_ollama_url(),
            anthropic_url: default_anthropic_url(),
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_api_version() -> String {
    "2".to_string()
}
fn default_associations() -> Vec<String> {
    vec![
        "core.DataSetDataElement".to_string(),
        "core.DirectionalDataFlow".to_string(),
        "core.DataFlowDataElement".to_string(),
    ]
}
fn default_page_size() -> usize {
    500
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    500
}
fn default_max_depth() -> usize {
    100
}
fn default_max_total_nodes() -> usize {
    10_000
}
fn default_llm_provider() -> String {
    "ollama".to_string()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_anthropic_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}
fn default_max_tokens() -> usize {
    2000
}
fn default_temperature() -> f32 {
    0.1
}
fn default_llm_timeout_secs() -> u64 {
    60
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Configuration manager
pub struct ConfigManager {
    config: LineageConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.lineage.toml)
    /// 3. Sensible defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_dotenv();
        let (config, config_path) = Self::load_config_file()?;
        Self::finish(config, config_path)
    }

    /// Load from an explicit config file; env overrides still apply.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        Self::load_dotenv();
        let config = Self::read_toml_file(path)?;
        Self::finish(config, Some(path.to_path_buf()))
    }

    fn finish(config: LineageConfig, config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Log where the configuration came from and its main limits. Call once
    /// a subscriber is installed; loading happens before logging is set up.
    pub fn log_summary(&self) {
        info!("Configuration loaded");
        match self.config_path {
            Some(ref path) => info!("   Config file: {}", path.display()),
            None => info!("   Config file: NONE (using defaults)"),
        }
        info!("   Catalog endpoint: {}", self.config.catalog.browse_url());
        info!(
            "   Traversal limits: depth={}, nodes={}",
            self.config.traversal.max_depth, self.config.traversal.max_total_nodes
        );
    }

    /// Load .env file if it exists
    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            } else {
                info!("Loaded .env file from current directory");
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".lineage.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .lineage.env: {}", e);
                } else {
                    info!("Loaded .lineage.env from home directory");
                }
            }
        }
    }

    /// Search order:
    /// 1. ./.lineage.toml
    /// 2. ~/.lineage/config.toml
    /// 3. defaults
    fn load_config_file() -> Result<(LineageConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".lineage.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".lineage").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        info!("No config file found, using defaults");
        Ok((LineageConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<LineageConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(config: LineageConfig) -> LineageConfig {
        Self::apply_overrides_from(config, |key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides_from<F>(mut config: LineageConfig, var: F) -> LineageConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        // Catalog
        if let Some(url) = var("LINEAGE_CATALOG_URL") {
            config.catalog.base_url = url;
        }
        if let Some(user) = var("LINEAGE_CATALOG_USERNAME") {
            config.catalog.username = Some(user);
        }
        if let Some(password) = var("LINEAGE_CATALOG_PASSWORD") {
            config.catalog.password = Some(SecretString::from(password));
        }
        if let Some(version) = var("LINEAGE_API_VERSION") {
            config.catalog.api_version = version;
        }
        if let Some(associations) = var("LINEAGE_ASSOCIATIONS") {
            config.catalog.associations = associations
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(flag) = var("LINEAGE_INCLUDE_SRC_LINKS") {
            config.catalog.include_src_links = parse_bool(&flag);
        }
        if let Some(flag) = var("LINEAGE_INCLUDE_DST_LINKS") {
            config.catalog.include_dst_links = parse_bool(&flag);
        }
        if let Some(flag) = var("LINEAGE_INCLUDE_REF_OBJECTS") {
            config.catalog.include_ref_objects = parse_bool(&flag);
        }
        if let Some(size) = var("LINEAGE_PAGE_SIZE").and_then(|v| v.parse().ok()) {
            config.catalog.page_size = size;
        }
        if let Some(secs) = var("LINEAGE_REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.catalog.request_timeout_secs = secs;
        }
        if let Some(retries) = var("LINEAGE_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            config.catalog.max_retries = retries;
        }

        // Traversal
        if let Some(depth) = var("LINEAGE_MAX_TREE_DEPTH").and_then(|v| v.parse().ok()) {
            config.traversal.max_depth = depth;
        }
        if let Some(nodes) = var("LINEAGE_MAX_TOTAL_NODES").and_then(|v| v.parse().ok()) {
            config.traversal.max_total_nodes = nodes;
        }

        // LLM
        if let Some(provider) = var("LINEAGE_LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Some(model) = var("LINEAGE_LLM_MODEL") {
            config.llm.model = Some(model);
            config.llm.enabled = true; // Enable if model specified
        }
        if let Some(url) = var("LINEAGE_OLLAMA_URL") {
            config.llm.ollama_url = url;
        }
        if let Some(key) = var("LINEAGE_LLM_API_KEY").or_else(|| var("ANTHROPIC_API_KEY")) {
            config.llm.api_key = Some(SecretString::from(key));
        }

        // Logging
        // Directive lists ("lineage_graph=debug,info") are left to EnvFilter.
        if let Some(level) = var("RUST_LOG") {
            let level = level.trim().to_lowercase();
            if matches!(
                level.as_str(),
                "trace" | "debug" | "info" | "warn" | "error"
            ) {
                config.logging.level = level;
            }
        }
        if let Some(format) = var("LINEAGE_LOG_FORMAT") {
            config.logging.format = format;
        }

        config
    }

    pub fn validate_config(config: &LineageConfig) -> Result<(), ConfigError> {
        if !config.catalog.base_url.is_empty() {
            let parsed = url::Url::parse(&config.catalog.base_url).map_err(|e| {
                ConfigError::ValidationError(format!(
                    "Invalid catalog base URL '{}': {}",
                    config.catalog.base_url, e
                ))
            })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(ConfigError::ValidationError(format!(
                    "Catalog base URL must use http or https, got: {}",
                    parsed.scheme()
                )));
            }
        }

        if config.catalog.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "catalog.page_size must be greater than 0".to_string(),
            ));
        }
        if config.traversal.max_depth == 0 {
            return Err(ConfigError::ValidationError(
                "traversal.max_depth must be greater than 0".to_string(),
            ));
        }
        if config.traversal.max_total_nodes == 0 {
            return Err(ConfigError::ValidationError(
                "traversal.max_total_nodes must be greater than 0".to_string(),
            ));
        }

        match config.llm.provider.to_lowercase().as_str() {
            "ollama" | "anthropic" | "claude" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid LLM provider: {}. Must be one of: ollama, anthropic",
                    other
                )))
            }
        }

        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    other
                )))
            }
        }

        match config.logging.format.as_str() {
            "pretty" | "json" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, json, compact",
                    other
                )))
            }
        }

        Ok(())
    }

    pub fn config(&self) -> &LineageConfig {
        &self.config
    }

    pub fn into_config(self) -> LineageConfig {
        self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = LineageConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = LineageConfig::default();
        assert_eq!(config.catalog.page_size, 500);
        assert_eq!(config.catalog.max_retries, 3);
        assert_eq!(config.traversal.max_depth, 100);
        assert_eq!(config.traversal.max_total_nodes, 10_000);
        assert!(!config.llm.enabled);
    }

    #[test]
    fn test_config_validation() {
        let config = LineageConfig::default();
        assert!(ConfigManager::validate_config(&config).is_ok());

        let mut bad_config = config.clone();
        bad_config.logging.level = "loud".to_string();
        assert!(ConfigManager::validate_config(&bad_config).is_err());

        let mut bad_url = config.clone();
        bad_url.catalog.base_url = "ftp://catalog".to_string();
        assert!(ConfigManager::validate_config(&bad_url).is_err());

        let mut zero_depth = config;
        zero_depth.traversal.max_depth = 0;
        assert!(ConfigManager::validate_config(&zero_depth).is_err());
    }

    #[test]
    fn test_static_params_order() {
        let config = CatalogConfig::default();
        let params = config.static_params();
        let keys: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "associations",
                "associations",
                "associations",
                "includeDstLinks",
                "includeRefObjects",
                "includeSrcLinks",
                "offset",
                "pageSize"
            ]
        );
        assert!(params.contains(&("includeSrcLinks".to_string(), "true".to_string())));
        assert!(params.contains(&("includeDstLinks".to_string(), "true".to_string())));
        assert!(params.contains(&("pageSize".to_string(), "500".to_string())));
    }

    #[test]
    fn test_browse_url_trims_trailing_slash() {
        let config = CatalogConfig {
            base_url: "https://catalog.example.com/access/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.browse_url(),
            "https://catalog.example.com/access/2/catalog/data/objects"
        );
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("LINEAGE_CATALOG_URL", "https://edc.local/access"),
            ("LINEAGE_ASSOCIATIONS", "core.DirectionalDataFlow, ,core.Other"),
            ("LINEAGE_INCLUDE_DST_LINKS", "FALSE"),
            ("LINEAGE_MAX_TREE_DEPTH", "7"),
            ("LINEAGE_MAX_TOTAL_NODES", "not-a-number"),
            ("LINEAGE_LLM_MODEL", "tinyllama"),
        ]);

        let config = ConfigManager::apply_overrides_from(LineageConfig::default(), |key| {
            vars.get(key).map(|v| v.to_string())
        });

        assert_eq!(config.catalog.base_url, "https://edc.local/access");
        assert_eq!(
            config.catalog.associations,
            vec!["core.DirectionalDataFlow", "core.Other"]
        );
        assert!(!config.catalog.include_dst_links);
        assert_eq!(config.traversal.max_depth, 7);
        assert_eq!(config.traversal.max_total_nodes, 10_000);
        assert!(config.llm.enabled);
        assert_eq!(config.llm.model.as_deref(), Some("tinyllama"));
    }

    #[test]
    fn test_anthropic_provider_settings() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("LINEAGE_LLM_PROVIDER", "claude"),
            ("ANTHROPIC_API_KEY", "sk-test"),
        ]);
        let config = ConfigManager::apply_overrides_from(LineageConfig::default(), |key| {
            vars.get(key).map(|v| v.to_string())
        });

        assert_eq!(
            config.llm.api_key.as_ref().map(|k| k.expose_secret()),
            Some("sk-test")
        );
        assert!(ConfigManager::validate_config(&config).is_ok());

        let serialized = serde_json::to_string(&config.llm).unwrap();
        assert!(!serialized.contains("sk-test"));
    }
}
