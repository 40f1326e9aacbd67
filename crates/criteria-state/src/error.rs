//! Error types for criteria-state

use thiserror::Error;

/// Errors raised while connecting to or preparing the database
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),

    /// Configuration is incomplete
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Connection(err.to_string())
    }
}

/// Errors returned by the storage traits
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("criterion not found: {criterion_id}")]
    CriterionNotFound { criterion_id: String },

    #[error("criterion already exists: {criterion_id}")]
    CriterionExists { criterion_id: String },

    #[error("snapshot not found: {criterion_id} v{version}")]
    SnapshotNotFound { criterion_id: String, version: u32 },

    #[error("snapshot already recorded: {criterion_id} v{version}")]
    DuplicateSnapshot { criterion_id: String, version: u32 },

    #[error("issue not found: {issue_id}")]
    IssueNotFound { issue_id: String },

    #[error("ai run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("problem statement not found: {id}")]
    StatementNotFound { id: String },

    #[error("invalid digest: {digest}")]
    InvalidDigest { digest: String },

    #[error("invalid {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}
