//! Error types for rxtab-core

use crate::table::ColumnType;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in rxtab-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A regular expression did not compile
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Neither a primary pattern nor any conditional pattern is configured
    #[error("no patterns configured: set a primary pattern or add a conditional parser")]
    EmptyPatternSet,

    /// Parser configuration cannot be used as given
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The first line does not match the first-row pattern
    #[error("the first row does not match the first-row pattern '{pattern}': {line:?}")]
    HeaderMismatch { pattern: String, line: String },

    /// A captured value could not be converted and the run was configured to abort
    #[error("line {line_number}: {source}")]
    Coercion {
        line_number: usize,
        #[source]
        source: CoercionError,
    },

    /// Unknown column type name in a profile or argument
    #[error("unknown column type '{0}' (expected text, integer, float or timestamp)")]
    UnknownColumnType(String),

    /// Profile tree is malformed
    #[error("invalid profile: {0}")]
    Profile(String),

    /// CSV error while splitting a header row
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A captured value that could not be converted to its column's declared type
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot convert {value:?} in column '{column}' to {column_type}: {reason}")]
pub struct CoercionError {
    pub column: String,
    pub value: String,
    pub column_type: ColumnType,
    pub reason: String,
}
