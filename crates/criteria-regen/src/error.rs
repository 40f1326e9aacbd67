//! Error types for criteria-regen

use criteria_doc::SchemaError;
use thiserror::Error;

/// Errors raised while producing a candidate problem statement
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Generator configuration is incomplete (e.g. missing API key)
    #[error("generator not configured: {0}")]
    NotConfigured(String),

    #[error("unknown regeneration mode: {0} (expected \"targeted\" or \"full\")")]
    InvalidMode(String),

    /// Transport-level failure talking to the model endpoint
    #[error("HTTP error: {0}")]
    Http(String),

    /// The requested model does not exist at the endpoint
    #[error("model not found: {model}")]
    ModelNotFound { model: String },

    /// The endpoint answered with a non-success status
    #[error("model API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The completion carried no message content
    #[error("no content received from model")]
    EmptyResponse,

    /// The content was not the expected JSON object
    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    /// The candidate document failed schema validation
    #[error("generated document failed schema validation: {0}")]
    SchemaViolation(#[from] SchemaError),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Http(err.to_string())
    }
}
