//! Error types for the IPv4 log tagger.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Tagging error: {0}")]
    Tag(#[from] TagError),

    #[error("Run cancelled")]
    Cancelled,
}

/// Configuration-related errors. All of these surface before any record is read.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Failed to read schema file {path}: {source}")]
    SchemaRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid extraction pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// A candidate substring that is not a 4-byte address.
///
/// Only ever seen inside the enrichment step, which drops the candidate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Invalid IPv4 address: {0}")]
    Invalid(String),
}

/// Per-record errors. Each one terminates the tagged stream.
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("Invalid body: field {field} holds {found}, expected string or null")]
    InvalidBody { field: String, found: &'static str },

    #[error("Invalid tags: field {field} holds {found}, expected list or null")]
    InvalidTags { field: String, found: &'static str },

    #[error("Upstream decode error: {0}")]
    Upstream(#[from] DecodeError),
}

/// Errors produced while decoding the input record stream.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed JSON on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Line {line} holds {found}, expected a record")]
    NotARecord { line: usize, found: &'static str },

    #[error("Decoding cancelled")]
    Cancelled,
}

/// Errors from the record codec outside of per-record decoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Invalid schema: {0}")]
    Schema(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for the tagger.
pub type Result<T> = std::result::Result<T, Error>;
