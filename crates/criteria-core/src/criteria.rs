//! Criterion authoring: create, read, update, lint.

use std::sync::Arc;

use chrono::Utc;
use criteria_doc::{lint, LintVerdict, ProblemStatement};
use criteria_state::{CriterionRecord, CriterionStatus, CriterionStore, Transition};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{require_text, CriteriaError, Result};
use crate::obs;

/// Input for a new criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCriterion {
    pub criterion_id: String,
    pub title: String,
    pub author: String,
    #[serde(rename = "problem_statement_json")]
    pub problem_statement: ProblemStatement,
    #[serde(default)]
    pub linked_policy_id: Option<String>,
    #[serde(default)]
    pub linked_criteria_ids: Vec<String>,
}

/// Partial update; `None` leaves a field alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriterionPatch {
    pub title: Option<String>,
    #[serde(rename = "problem_statement_json")]
    pub problem_statement: Option<ProblemStatement>,
    pub linked_policy_id: Option<String>,
    pub linked_criteria_ids: Option<Vec<String>>,
    pub author: Option<String>,
}

impl CriterionPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.problem_statement.is_none()
            && self.linked_policy_id.is_none()
            && self.linked_criteria_ids.is_none()
            && self.author.is_none()
    }
}

/// Thin service over a criterion store.
pub struct CriteriaService<S> {
    store: Arc<S>,
}

impl<S> CriteriaService<S>
where
    S: CriterionStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a Draft at version 1 after validating the document.
    #[instrument(skip(self, input), fields(criterion_id = %input.criterion_id))]
    pub async fn create(&self, input: NewCriterion) -> Result<CriterionRecord> {
        let criterion_id = require_text("criterion_id", &input.criterion_id)?;
        let title = require_text("title", &input.title)?;
        let author = require_text("author", &input.author)?;
        input.problem_statement.validate()?;

        let mut record =
            CriterionRecord::new(criterion_id, title, author, input.problem_statement.clone());
        record.linked_policy_id = input.linked_policy_id.filter(|p| !p.trim().is_empty());
        record.linked_criteria_ids = input.linked_criteria_ids;

        let created = self.store.create_criterion(record).await?;
        info!(version = created.version_number, "criterion created");
        Ok(created)
    }

    pub async fn get(&self, criterion_id: &str) -> Result<CriterionRecord> {
        Ok(self.store.get_criterion(criterion_id).await?)
    }

    /// Criteria, most recently updated first.
    pub async fn list(&self, status: Option<CriterionStatus>) -> Result<Vec<CriterionRecord>> {
        Ok(self.store.list_criteria(status).await?)
    }

    /// Apply a partial update. Version and status are untouched.
    #[instrument(skip(self, patch), fields(criterion_id = %criterion_id))]
    pub async fn update(&self, criterion_id: &str, patch: CriterionPatch) -> Result<CriterionRecord> {
        if patch.is_empty() {
            return Err(CriteriaError::InvalidInput(
                "update contains no changes".to_string(),
            ));
        }

        let mut record = self.store.get_criterion(criterion_id).await?;
        if !record.status.allows(Transition::Update) {
            return Err(CriteriaError::InvalidTransition {
                criterion_id: criterion_id.to_string(),
                status: record.status,
                transition: Transition::Update,
            });
        }

        if let Some(title) = patch.title {
            record.title = require_text("title", &title)?.to_string();
        }
        if let Some(author) = patch.author {
            record.author = require_text("author", &author)?.to_string();
        }
        if let Some(doc) = patch.problem_statement {
            doc.validate()?;
            record.problem_statement = doc;
        }
        if let Some(policy) = patch.linked_policy_id {
            record.linked_policy_id = Some(policy).filter(|p| !p.trim().is_empty());
        }
        if let Some(links) = patch.linked_criteria_ids {
            record.linked_criteria_ids = links;
        }
        record.updated_at = Utc::now();

        debug!(digest = %record.document_digest().short(), "storing update");
        Ok(self.store.put_criterion(record).await?)
    }

    /// Lint the stored document.
    pub async fn lint(&self, criterion_id: &str) -> Result<LintVerdict> {
        let record = self.store.get_criterion(criterion_id).await?;
        let verdict = lint(&record.problem_statement);
        obs::emit_lint_evaluated(criterion_id, &verdict);
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{compliant_doc, new_criterion};
    use criteria_state::fakes::MemoryCriteriaStore;
    use criteria_state::StorageError;

    fn service() -> CriteriaService<MemoryCriteriaStore> {
        CriteriaService::new(Arc::new(MemoryCriteriaStore::new()))
    }

    #[tokio::test]
    async fn create_starts_as_draft_v1() {
        let svc = service();
        let created = svc.create(new_criterion("SEPSIS-001")).await.unwrap();
        assert_eq!(created.status, CriterionStatus::Draft);
        assert_eq!(created.version_number, 1);
        assert_eq!(svc.get("SEPSIS-001").await.unwrap(), created);
    }

    #[tokio::test]
    async fn create_rejects_blank_fields_and_bad_documents() {
        let svc = service();

        let mut input = new_criterion("C");
        input.title = "  ".to_string();
        assert!(matches!(
            svc.create(input).await,
            Err(CriteriaError::InvalidInput(_))
        ));

        let mut input = new_criterion("C");
        input.problem_statement.problem_statement = "Patient seen.".to_string();
        assert!(matches!(svc.create(input).await, Err(CriteriaError::Schema(_))));

        assert!(svc.get("C").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn duplicate_id_is_a_storage_conflict() {
        let svc = service();
        svc.create(new_criterion("C")).await.unwrap();
        let err = svc.create(new_criterion("C")).await.unwrap_err();
        assert!(matches!(
            err,
            CriteriaError::Storage(StorageError::CriterionExists { .. })
        ));
    }

    #[tokio::test]
    async fn update_keeps_version_and_status() {
        let svc = service();
        let created = svc.create(new_criterion("C")).await.unwrap();

        let mut doc = compliant_doc();
        doc.exclusions.push("Chronic conditions only".to_string());
        let updated = svc
            .update(
                "C",
                CriterionPatch {
                    title: Some("Renamed".to_string()),
                    problem_statement: Some(doc.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.problem_statement, doc);
        assert_eq!(updated.version_number, created.version_number);
        assert_eq!(updated.status, created.status);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn update_validates_document_before_writing() {
        let svc = service();
        svc.create(new_criterion("C")).await.unwrap();

        let mut doc = compliant_doc();
        doc.what_qualifies.clear();
        let err = svc
            .update(
                "C",
                CriterionPatch {
                    problem_statement: Some(doc),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CriteriaError::Schema(_)));
        assert_eq!(
            svc.get("C").await.unwrap().problem_statement,
            compliant_doc()
        );
    }

    #[tokio::test]
    async fn empty_patch_is_rejected() {
        let svc = service();
        svc.create(new_criterion("C")).await.unwrap();
        assert!(matches!(
            svc.update("C", CriterionPatch::default()).await,
            Err(CriteriaError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn lint_reads_stored_document() {
        let svc = service();
        svc.create(new_criterion("C")).await.unwrap();
        let verdict = svc.lint("C").await.unwrap();
        assert!(verdict.passed);
    }
}
