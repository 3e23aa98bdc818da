pub mod config_manager;
pub mod error;
pub mod types;

pub use config_manager::{
    CatalogConfig, ConfigError, ConfigManager, LLMConfig, LineageConfig, LoggingConfig,
    TraversalConfig,
};
pub use error::*;
pub use types::*;
