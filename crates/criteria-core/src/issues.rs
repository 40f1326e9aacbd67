//! Issues reported against a criterion.

use std::sync::Arc;

use chrono::Utc;
use criteria_regen::IssueContext;
use criteria_state::{CriterionStore, IssueRecord, IssueStatus, IssueTracker, IssueType};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{require_text, CriteriaError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIssue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub proposed_fix: Option<String>,
    pub created_by: String,
}

pub struct IssueService<S> {
    store: Arc<S>,
}

impl<S> IssueService<S>
where
    S: CriterionStore + IssueTracker,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Open a new issue against an existing criterion.
    #[instrument(skip(self, input), fields(criterion_id = %criterion_id, issue_type = %input.issue_type.slug()))]
    pub async fn report(&self, criterion_id: &str, input: NewIssue) -> Result<IssueRecord> {
        let created_by = require_text("created_by", &input.created_by)?;
        self.store.get_criterion(criterion_id).await?;

        let issue = IssueRecord::new(criterion_id, input.issue_type, created_by)
            .with_notes(non_blank(input.notes))
            .with_proposed_fix(non_blank(input.proposed_fix));
        let issue = self.store.create_issue(issue).await?;
        info!(issue_id = %issue.issue_id, "issue reported");
        Ok(issue)
    }

    /// Issues in creation order.
    pub async fn list(&self, criterion_id: &str) -> Result<Vec<IssueRecord>> {
        Ok(self.store.list_issues(criterion_id).await?)
    }

    pub async fn resolve(&self, issue_id: &Uuid, by: &str) -> Result<IssueRecord> {
        self.close(issue_id, by, IssueStatus::Resolved).await
    }

    pub async fn dismiss(&self, issue_id: &Uuid, by: &str) -> Result<IssueRecord> {
        self.close(issue_id, by, IssueStatus::Dismissed).await
    }

    async fn close(&self, issue_id: &Uuid, by: &str, status: IssueStatus) -> Result<IssueRecord> {
        let by = require_text("resolved_by", by)?;
        let mut issue = self.store.get_issue(issue_id).await?;
        if issue.status != IssueStatus::Open {
            return Err(CriteriaError::IssueNotOpen {
                issue_id: *issue_id,
            });
        }

        issue.status = status;
        issue.resolved_at = Some(Utc::now());
        issue.resolved_by = Some(by.to_string());
        let issue = self.store.put_issue(issue).await?;
        info!(issue_id = %issue_id, status = ?status, "issue closed");
        Ok(issue)
    }

    /// Open issues rendered as generator context, oldest first.
    pub async fn open_issue_context(&self, criterion_id: &str) -> Result<Vec<IssueContext>> {
        Ok(self
            .store
            .list_issues(criterion_id)
            .await?
            .into_iter()
            .filter(|i| i.status == IssueStatus::Open)
            .map(|i| IssueContext {
                issue_type: i.issue_type.label().to_string(),
                notes: i.notes,
                proposed_fix: i.proposed_fix,
            })
            .collect())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::new_criterion;
    use crate::CriteriaService;
    use criteria_state::fakes::MemoryCriteriaStore;

    async fn seeded() -> IssueService<MemoryCriteriaStore> {
        let store = Arc::new(MemoryCriteriaStore::new());
        CriteriaService::new(store.clone())
            .create(new_criterion("C"))
            .await
            .unwrap();
        IssueService::new(store)
    }

    fn issue(t: IssueType, notes: Option<&str>) -> NewIssue {
        NewIssue {
            issue_type: t,
            notes: notes.map(str::to_string),
            proposed_fix: Some("   ".to_string()),
            created_by: "rita".to_string(),
        }
    }

    #[tokio::test]
    async fn report_requires_existing_criterion() {
        let svc = seeded().await;
        let err = svc
            .report("NOPE", issue(IssueType::ClinicalAccuracy, None))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn reported_issue_is_open_and_blank_fields_dropped() {
        let svc = seeded().await;
        let created = svc
            .report("C", issue(IssueType::RigidPhrasing, Some("misses 'SIRS'")))
            .await
            .unwrap();
        assert_eq!(created.status, IssueStatus::Open);
        assert_eq!(created.notes.as_deref(), Some("misses 'SIRS'"));
        assert!(created.proposed_fix.is_none());
    }

    #[tokio::test]
    async fn resolve_and_dismiss_only_apply_to_open_issues() {
        let svc = seeded().await;
        let a = svc.report("C", issue(IssueType::KeywordsScope, None)).await.unwrap();
        let b = svc.report("C", issue(IssueType::OverExtraction, None)).await.unwrap();

        let resolved = svc.resolve(&a.issue_id, "alice").await.unwrap();
        assert_eq!(resolved.status, IssueStatus::Resolved);
        assert_eq!(resolved.resolved_by.as_deref(), Some("alice"));
        assert!(resolved.resolved_at.is_some());

        let dismissed = svc.dismiss(&b.issue_id, "alice").await.unwrap();
        assert_eq!(dismissed.status, IssueStatus::Dismissed);

        assert!(matches!(
            svc.dismiss(&a.issue_id, "alice").await,
            Err(CriteriaError::IssueNotOpen { .. })
        ));
        assert!(svc.resolve(&Uuid::new_v4(), "alice").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn context_includes_only_open_issues_with_labels() {
        let svc = seeded().await;
        let a = svc
            .report("C", issue(IssueType::ViolatesNoInference, Some("labs")))
            .await
            .unwrap();
        svc.report("C", issue(IssueType::ExclusionsIncomplete, None))
            .await
            .unwrap();
        svc.resolve(&a.issue_id, "alice").await.unwrap();

        let ctx = svc.open_issue_context("C").await.unwrap();
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx[0].issue_type, "Exclusions incomplete/contradictory");
    }
}
