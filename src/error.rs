//! Error types for catalog loading, configuration and message scanning

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building or feeding the detection engine.
///
/// Detection itself never fails: a number matching no carrier is `None`,
/// and a candidate failing validation is simply discarded.
#[derive(Error, Debug)]
pub enum TrackingError {
    /// Failed to read a catalog or configuration source
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Malformed JSON in a catalog record or configuration
    #[error("Invalid JSON in {source_name}: {details}")]
    Json {
        source_name: String,
        details: String,
    },

    /// A regex fragment failed to compile
    #[error("Invalid pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        source: Box<regex::Error>,
    },

    /// A definition references a capture group its regex does not declare
    #[error("Definition {definition} references unknown capture group `{group}`")]
    UnknownGroup { definition: String, group: String },

    /// A definition is structurally invalid
    #[error("Invalid tracking number definition: {0}")]
    Definition(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Failed to parse a raw email message
    #[error("Failed to parse message: {0}")]
    Message(String),
}

impl TrackingError {
    pub(crate) fn pattern(pattern: &str, source: regex::Error) -> Self {
        Self::Pattern {
            pattern: pattern.to_string(),
            source: Box::new(source),
        }
    }
}

/// Result type for tracking number operations
pub type Result<T> = std::result::Result<T, TrackingError>;
