//! Error types for the cutover library.

use thiserror::Error;

/// Main error type for cutover operations.
///
/// Everything here is run-level ("fatal" in the taxonomy): bad
/// configuration, unreachable stores, or a report that cannot be
/// written. Row-level faults are never represented as `CutoverError`;
/// they are caught inside the table loop and recorded as warnings on
/// the table's result.
#[derive(Error, Debug)]
pub enum CutoverError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Legacy store connection or query error
    #[error("Legacy store error: {0}")]
    Source(#[from] tiberius::error::Error),

    /// Target store connection or query error
    #[error("Target store error: {0}")]
    Target(#[from] tokio_postgres::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// A mapped entity could not be round-tripped through the store encoding
    #[error("Entity encoding error in collection {collection}: {message}")]
    Encoding {
        collection: &'static str,
        message: String,
    },

    /// Report file error
    #[error("Report file error: {0}")]
    Report(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CutoverError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl Into<String>, context: impl Into<String>) -> Self {
        CutoverError::Pool {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Create an Encoding error for a collection
    pub fn encoding(collection: &'static str, message: impl Into<String>) -> Self {
        CutoverError::Encoding {
            collection,
            message: message.into(),
        }
    }

    /// Format error with full details including error chain
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

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            CutoverError::Config(_) | CutoverError::Yaml(_) => 2,
            CutoverError::Source(_) | CutoverError::Pool { .. } => 3,
            CutoverError::Target(_) => 4,
            _ => 1,
        }
    }
}

/// Result type alias for cutover operations.
pub type Result<T> = std::result::Result<T, CutoverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CutoverError::Config("x".into()).exit_code(), 2);
        assert_eq!(CutoverError::pool("down", "target connect").exit_code(), 3);
        assert_eq!(CutoverError::Report("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_format_detailed_contains_message() {
        let err = CutoverError::Config("missing source host".into());
        let detail = err.format_detailed();
        assert!(detail.contains("missing source host"));
    }
}
