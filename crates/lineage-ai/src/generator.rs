use async_trait::async_trait;
use lineage_catalog::AssetRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Text generation is disabled in configuration")]
    Disabled,

    #[error("Unsupported text generation provider: {0}")]
    UnsupportedProvider(String),

    #[error("{0} requires an API key; set LINEAGE_LLM_API_KEY or ANTHROPIC_API_KEY")]
    MissingApiKey(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Generator returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse generator response: {0}")]
    Parse(String),

    #[error("Generator returned an empty description")]
    EmptyResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub class_type: String,
    #[serde(default)]
    pub description: String,
}

/// Input of [`TextGenerator::enhance_description`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentRequest {
    pub asset_name: String,
    pub technical_description: String,
    pub schema_context: String,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
}

impl EnrichmentRequest {
    pub fn new(asset_name: impl Into<String>) -> Self {
        Self {
            asset_name: asset_name.into(),
            ..Default::default()
        }
    }

    pub fn from_record(record: &AssetRecord, schema_context: impl Into<String>) -> Self {
        Self {
            asset_name: record.name.clone(),
            technical_description: record.description.clone(),
            schema_context: schema_context.into(),
            columns: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.technical_description = description.into();
        self
    }

    pub fn with_column(mut self, column: ColumnInfo) -> Self {
        self.columns.push(column);
        self
    }

    pub fn prompt(&self) -> String {
        let mut prompt = format!(
            "Enrich the following technical description with business context.\n\n\
             Asset: {}\n\
             Technical description: {}\n\
             Schema context: {}\n",
            self.asset_name,
            non_empty_or(&self.technical_description, "No description available"),
            non_empty_or(&self.schema_context, "Not specified"),
        );

        if !self.columns.is_empty() {
            prompt.push_str("Columns:\n");
            for column in &self.columns {
                prompt.push_str(&format!("- {} ({})", column.name, column.class_type));
                if !column.description.is_empty() {
                    prompt.push_str(&format!(": {}", column.description));
                }
                prompt.push('\n');
            }
        }

        prompt.push_str(
            "\nReply with a short, business-friendly description of at most three sentences.\n",
        );
        prompt
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Pluggable text generator used to enrich asset descriptions.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn enhance_description(
        &self,
        request: &EnrichmentRequest,
    ) -> Result<String, GenerationError>;

    /// Whether the backend is reachable and has the configured model.
    async fn is_available(&self) -> bool;

    fn name(&self) -> &str;
}
