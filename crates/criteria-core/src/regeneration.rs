//! AI-assisted regeneration with an append-only audit trail.
//!
//! A regeneration never touches the criterion. The caller decides whether
//! to apply the candidate through `CriteriaService::update`.

use std::sync::Arc;

use chrono::Utc;
use criteria_doc::{lint, LintVerdict, ProblemStatement};
use criteria_regen::{GeneratedDraft, GenerationError, Generator, RegenerateRequest};
use criteria_state::{AiRunLedger, AiRunRecord, CriterionStore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{require_text, CriteriaError, Result};
use crate::obs;

/// Stored rationales are cut to this many characters.
pub const MAX_RATIONALE_CHARS: usize = 500;

/// A validated, linted and recorded candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerationOutcome {
    pub run_id: Uuid,
    pub problem_statement_json: ProblemStatement,
    pub edit_rationale: String,
    pub lint_result: LintVerdict,
}

pub struct RegenerationService<S> {
    store: Arc<S>,
    generator: Arc<dyn Generator>,
}

impl<S> RegenerationService<S>
where
    S: CriterionStore + AiRunLedger,
{
    pub fn new(store: Arc<S>, generator: Arc<dyn Generator>) -> Self {
        Self { store, generator }
    }

    /// Generate, validate, lint and record one candidate.
    ///
    /// Any generator or schema failure aborts the attempt and records nothing.
    #[instrument(skip(self, request), fields(criterion_id = %request.criterion_id, mode = %request.mode, generator = %self.generator.name()))]
    pub async fn regenerate(
        &self,
        request: RegenerateRequest,
        created_by: &str,
    ) -> Result<RegenerationOutcome> {
        let created_by = require_text("created_by", created_by)?;
        self.store.get_criterion(&request.criterion_id).await?;

        let (document, rationale) = match self.candidate(&request).await {
            Ok(pair) => pair,
            Err(e) => {
                obs::emit_regeneration_failed(&request.criterion_id, &e);
                return Err(e.into());
            }
        };

        let verdict = lint(&document);
        obs::emit_lint_evaluated(&request.criterion_id, &verdict);

        let run = AiRunRecord {
            run_id: Uuid::new_v4(),
            criterion_id: request.criterion_id.clone(),
            mode: request.mode.as_str().to_string(),
            input_context: json!({
                "current_problem_statement": request.current_problem_statement_json,
                "issues": request.issues,
                "developer_notes": request.developer_notes,
            }),
            agent_output: json!({
                "problem_statement_json": document,
                "edit_rationale": rationale,
            }),
            lint_result: verdict.clone(),
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };
        let run_id = run.run_id;
        self.store.append_run(run).await?;

        obs::emit_regeneration_completed(
            &request.criterion_id,
            &run_id.to_string(),
            request.mode.as_str(),
            verdict.passed,
        );
        Ok(RegenerationOutcome {
            run_id,
            problem_statement_json: document,
            edit_rationale: rationale,
            lint_result: verdict,
        })
    }

    /// Call the generator and turn its draft into a schema-valid document.
    async fn candidate(
        &self,
        request: &RegenerateRequest,
    ) -> std::result::Result<(ProblemStatement, String), GenerationError> {
        let GeneratedDraft {
            problem_statement_json,
            edit_rationale,
        } = self.generator.generate(request).await?;

        let document = ProblemStatement::from_json(problem_statement_json)?;
        let rationale = truncate_chars(&edit_rationale, MAX_RATIONALE_CHARS);
        debug!(rationale_chars = rationale.chars().count(), "candidate accepted");
        Ok((document, rationale))
    }

    /// Audit records for a criterion, newest first.
    pub async fn runs(&self, criterion_id: &str) -> Result<Vec<AiRunRecord>> {
        Ok(self.store.list_runs(criterion_id).await?)
    }

    pub async fn run(&self, run_id: &Uuid) -> Result<AiRunRecord> {
        self.store.get_run(run_id).await.map_err(CriteriaError::from)
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
