//! Criteria-Regen: candidate problem statements from a language model
//!
//! The [`Generator`] trait is the only seam the rest of the workspace sees.
//! [`OpenAiGenerator`] talks to an OpenAI-compatible chat completions API;
//! [`fakes::ScriptedGenerator`] replays canned results.
//!
//! Generators return raw drafts. Schema validation and linting happen in
//! the caller.

mod error;
pub mod fakes;
mod generator;
pub mod openai;
pub mod prompt;

pub use error::GenerationError;
pub use generator::{
    GeneratedDraft, Generator, IssueContext, RegenerateRequest, RegenerationMode,
};
pub use openai::{OpenAiConfig, OpenAiGenerator};

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, GenerationError>;
