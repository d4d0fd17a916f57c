//! Error types for the ETL library.

use thiserror::Error;

/// Main error type for ETL operations.
#[derive(Error, Debug)]
pub enum EtlError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source or destination unreachable (connect/handshake failure).
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Destination table or column missing during introspection.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Column mapping rejected (empty mapping, unmapped primary key).
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// A bound statement failed during batch execution.
    #[error("Execution error for {statement}: {message}")]
    Execution { statement: String, message: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl EtlError {
    /// Create an Execution error with context about the failing statement.
    pub fn execution(statement: impl Into<String>, message: impl Into<String>) -> Self {
        EtlError::Execution {
            statement: statement.into(),
            message: message.into(),
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for ETL operations.
pub type Result<T> = std::result::Result<T, EtlError>;
