use std::io;
use thiserror::Error;

/// Error type for the semantic memory crate
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Chat completion service error
    #[error("LLM error: {0}")]
    LLM(String),

    /// Embedding service error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// HTTP request error
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Error reported by a memory store
    #[error("Memory store error: {0}")]
    MemoryStore(String),

    /// Collection name that cannot be mapped to a store index
    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),

    /// Kernel has no service or store registered for the request
    #[error("Kernel error: {0}")]
    Kernel(String),

    /// Other general errors
    #[error("Other error: {0}")]
    Other(String),
}
