use crate::config_manager::ConfigError;
use thiserror::Error;

/// Failures talking to the remote catalog.
///
/// The builder treats every variant as a per-node failure: the branch being
/// fetched yields no node and the rest of the build continues.
#[derive(Error, Debug, Clone)]
pub enum CatalogError {
    #[error("Catalog unavailable for '{asset}' after {attempts} attempt(s): {reason}")]
    Unavailable {
        asset: String,
        attempts: u32,
        reason: String,
    },

    #[error("Catalog returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to decode catalog response: {0}")]
    Decode(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl CatalogError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Timeout(_) | CatalogError::Network(_) => true,
            CatalogError::Status { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            CatalogError::Unavailable { .. }
            | CatalogError::Decode(_)
            | CatalogError::Client(_) => false,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, CatalogError::Unavailable { .. })
    }
}

#[derive(Error, Debug)]
pub enum LineageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, LineageError>;
