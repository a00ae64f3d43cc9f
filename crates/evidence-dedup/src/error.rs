//! Error types for evidence deduplication

use thiserror::Error;

/// Errors surfaced by the deduplication pipeline
///
/// Scoring itself cannot fail; errors come from configuration and from
/// decoding record batches.
#[derive(Debug, Error)]
pub enum DedupError {
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("JSON options error: {0}")]
    OptionsJson(#[from] serde_json::Error),

    #[error("TOML options error: {0}")]
    OptionsToml(#[from] toml::de::Error),

    #[error("TOML options serialization error: {0}")]
    OptionsTomlWrite(#[from] toml::ser::Error),

    #[error("Invalid record batch: {0}")]
    Records(String),
}

/// Result type for deduplication operations
pub type DedupResult<T> = Result<T, DedupError>;
