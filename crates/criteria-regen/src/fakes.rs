//! Scripted generator for tests and offline runs

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::GenerationError;
use crate::generator::{GeneratedDraft, Generator, RegenerateRequest};

/// Returns queued results in order and records every request it sees.
///
/// An exhausted queue yields `GenerationError::EmptyResponse`.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<GeneratedDraft, GenerationError>>>,
    calls: Mutex<Vec<RegenerateRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a draft built from a document value and rationale.
    pub fn push_draft(&self, problem_statement_json: serde_json::Value, edit_rationale: &str) {
        self.script.lock().unwrap().push_back(Ok(GeneratedDraft {
            problem_statement_json,
            edit_rationale: edit_rationale.to_string(),
        }));
    }

    pub fn push_error(&self, error: GenerationError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    /// Requests received so far, oldest first.
    pub fn calls(&self) -> Vec<RegenerateRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        request: &RegenerateRequest,
    ) -> Result<GeneratedDraft, GenerationError> {
        self.calls.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenerationError::EmptyResponse))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
