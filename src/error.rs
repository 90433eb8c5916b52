//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine and its collaborators.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A lifetime, timeout or interval expression could not be parsed
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// Options or engine configuration are unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The upstream request failed
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The upstream answered without a body
    #[error("Empty response from {0}")]
    EmptyResponse(String),

    /// A value could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Encryption or decryption failed
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Filesystem error from a disk-backed store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
