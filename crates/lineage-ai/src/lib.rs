//! Description enrichment through a pluggable text generator.
//!
//! Consumes the records produced by `lineage-catalog`; nothing in the
//! catalog client or the graph builder depends on this crate.

pub mod anthropic;
pub mod factory;
pub mod generator;
pub mod ollama;

pub use anthropic::{AnthropicConfig, AnthropicGenerator};
pub use factory::GeneratorFactory;
pub use generator::{ColumnInfo, EnrichmentRequest, GenerationError, TextGenerator};
pub use ollama::{OllamaConfig, OllamaGenerator};
