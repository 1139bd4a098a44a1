//! Error types for configuration and manifest handling.

use thiserror::Error;

/// Errors that can occur while loading configuration or building schemas.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A relation names a model that is not declared before it.
    #[error("{table}.{field} refers to unknown model '{target}'")]
    UnknownTarget {
        table: String,
        field: String,
        target: String,
    },

    /// Declarations that cannot form a valid schema.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
}

/// Convenience alias for results with [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;
