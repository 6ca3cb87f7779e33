/// Dump Error Module
///
/// This module defines the error taxonomy for the dump engine. Every failure
/// is fatal to the dump that hit it; there are no retries, so each variant
/// only needs to carry enough context to explain what went wrong.
use thiserror::Error;

/// Comprehensive error type for dump operations.
///
/// This enum covers all error scenarios that can occur while dumping:
/// - Metadata and data queries (connectivity, syntax, permissions)
/// - Transaction control (begin, rollback)
/// - Literal rendering and column classification
/// - Output sink writes
/// - Configuration loading and validation
#[derive(Error, Debug)]
pub enum DumpError {
    /// Query execution or connectivity failure reported by the connection
    #[error("Query error: {0}")]
    Query(String),

    /// Transaction begin/rollback failure
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// A retrieved value could not be rendered for its column
    #[error("Render error in column `{column}`: {message}")]
    Render { column: String, message: String },

    /// Column type the renderer has no literal form for
    #[error("Unsupported type `{type_name}` for column `{column}`")]
    UnsupportedType { column: String, type_name: String },

    /// Server reply did not have the expected shape
    #[error("Schema error: {0}")]
    Schema(String),

    /// Output sink and file system errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl DumpError {
    /// Creates a Query error that names the statement that failed
    pub fn query(sql: &str, message: impl std::fmt::Display) -> Self {
        DumpError::Query(format!("{}: {}", sql, message))
    }

    /// Creates a Render error for the given column
    pub fn render(column: impl Into<String>, message: impl Into<String>) -> Self {
        DumpError::Render {
            column: column.into(),
            message: message.into(),
        }
    }
}

/// Type alias for Result to use DumpError as the error type.
pub type Result<T> = std::result::Result<T, DumpError>;
