//! Catalog-specific error types.
//!
//! Loading errors carry the offending file path so a broken template can be
//! located without guessing.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading, validating or querying templates.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// YAML parsing failed.
    #[error("failed to parse YAML at {path}: {source}")]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// A required file was not found.
    #[error("required file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// No template is registered for the contract type.
    #[error("no contract template registered for {contract_type:?}")]
    TemplateNotFound { contract_type: String },

    /// A template failed structural validation.
    #[error("invalid template {contract_type:?}: {reason}")]
    InvalidTemplate {
        contract_type: String,
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic serde_yaml error (not file-specific).
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
