//! Standalone problem statement library.

use std::sync::Arc;

use chrono::Utc;
use criteria_doc::ProblemStatement;
use criteria_state::{StatementRecord, StatementStore};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{require_text, CriteriaError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStatement {
    pub criterion_id: String,
    #[serde(rename = "problem_statement_json")]
    pub problem_statement: ProblemStatement,
    #[serde(default)]
    pub original_input: String,
    #[serde(default)]
    pub selected_issues: Vec<String>,
    #[serde(default)]
    pub additional_context: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementPatch {
    #[serde(rename = "problem_statement_json")]
    pub problem_statement: Option<ProblemStatement>,
    pub additional_context: Option<String>,
    pub tags: Option<Vec<String>>,
}

pub struct StatementLibrary<S> {
    store: Arc<S>,
}

impl<S> StatementLibrary<S>
where
    S: StatementStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, input), fields(criterion_id = %input.criterion_id))]
    pub async fn create(&self, input: NewStatement) -> Result<StatementRecord> {
        let criterion_id = require_text("criterion_id", &input.criterion_id)?;
        input.problem_statement.validate()?;

        let mut record = StatementRecord::new(criterion_id, input.problem_statement);
        record.original_input = input.original_input;
        record.selected_issues = input.selected_issues;
        record.additional_context = input.additional_context.filter(|c| !c.trim().is_empty());
        record.tags = normalize_tags(input.tags);
        Ok(self.store.create_statement(record).await?)
    }

    pub async fn get(&self, id: &Uuid) -> Result<StatementRecord> {
        Ok(self.store.get_statement(id).await?)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: &Uuid, patch: StatementPatch) -> Result<StatementRecord> {
        let mut record = self.store.get_statement(id).await?;
        if let Some(doc) = patch.problem_statement {
            doc.validate()?;
            record.problem_statement = doc;
        }
        if let Some(context) = patch.additional_context {
            record.additional_context = Some(context).filter(|c| !c.trim().is_empty());
        }
        if let Some(tags) = patch.tags {
            record.tags = normalize_tags(tags);
        }
        record.updated_at = Utc::now();
        Ok(self.store.put_statement(record).await?)
    }

    pub async fn delete(&self, id: &Uuid) -> Result<()> {
        self.store.delete_statement(id).await.map_err(CriteriaError::from)
    }

    /// Records whose criterion id matches exactly, newest first.
    pub async fn list_for_criterion(&self, criterion_id: &str) -> Result<Vec<StatementRecord>> {
        Ok(self.store.list_statements(criterion_id).await?)
    }
}

/// Trim, lower-case and de-duplicate tags, keeping first-seen order.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
