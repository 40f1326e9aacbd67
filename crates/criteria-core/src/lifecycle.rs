//! Publish / rollback / deprecate lifecycle.
//!
//! Every publish writes the criterion at its new version and then appends a
//! snapshot for that version. If the append fails the previous record is
//! put back, so the stored version never points past the log. Rollback
//! restores content from the snapshot log and also appends, so versions
//! only ever increase and the log is never edited.
//!
//! ```text
//!   Draft ──publish──▶ Published ──publish──▶ Published
//!     │                   │
//!     ├──rollback─────────┤──rollback──▶ Published
//!     └──deprecate────────┴──deprecate─▶ Deprecated (terminal)
//! ```

use std::sync::Arc;

use chrono::Utc;
use criteria_doc::{lint, LintVerdict};
use criteria_state::{
    CriterionRecord, CriterionSnapshot, CriterionStatus, CriterionStore, SnapshotLog, Transition,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::error::{require_text, CriteriaError, Result};
use crate::obs;

/// Marker prepended to the change reason of a rollback.
pub const ROLLBACK_PREFIX: &str = "ROLLBACK: ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub change_reason: String,
    /// Publish even when lint reports failures
    #[serde(default)]
    pub override_lint: bool,
    pub published_by: String,
}

/// Result of a publish attempt. The verdict is present either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PublishOutcome {
    Published {
        criterion: CriterionRecord,
        lint_result: LintVerdict,
    },
    /// Lint failed and no override was given; nothing was written.
    Rejected { lint_result: LintVerdict },
}

impl PublishOutcome {
    pub fn lint_result(&self) -> &LintVerdict {
        match self {
            PublishOutcome::Published { lint_result, .. } => lint_result,
            PublishOutcome::Rejected { lint_result } => lint_result,
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, PublishOutcome::Published { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackRequest {
    pub change_reason: String,
    pub rolled_back_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackOutcome {
    pub criterion: CriterionRecord,
    /// Snapshot version whose content was restored
    pub restored_from_version: u32,
}

/// Lifecycle transitions over a criterion store and its snapshot log.
pub struct LifecycleService<S> {
    store: Arc<S>,
}

impl<S> LifecycleService<S>
where
    S: CriterionStore + SnapshotLog,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn load_for(&self, criterion_id: &str, transition: Transition) -> Result<CriterionRecord> {
        let record = self.store.get_criterion(criterion_id).await?;
        if !record.status.allows(transition) {
            return Err(CriteriaError::InvalidTransition {
                criterion_id: criterion_id.to_string(),
                status: record.status,
                transition,
            });
        }
        Ok(record)
    }

    /// Store `next`, then append its snapshot.
    ///
    /// A failed append puts `previous` back, so a retry starts from the same
    /// version and never collides with a snapshot the criterion did not reach.
    async fn commit_version(
        &self,
        previous: CriterionRecord,
        next: CriterionRecord,
        snapshot: CriterionSnapshot,
    ) -> Result<CriterionRecord> {
        let stored = self.store.put_criterion(next).await?;
        if let Err(e) = self.store.append_snapshot(snapshot).await {
            warn!(
                criterion_id = %previous.criterion_id,
                version = stored.version_number,
                error = %e,
                "snapshot append failed, restoring previous version"
            );
            if let Err(restore) = self.store.put_criterion(previous).await {
                error!(
                    criterion_id = %stored.criterion_id,
                    error = %restore,
                    "restore after failed snapshot append failed"
                );
            }
            return Err(e.into());
        }
        Ok(stored)
    }

    /// Lint the stored document and publish it as `version + 1`.
    ///
    /// A failing verdict without override returns `Rejected` and writes nothing.
    #[instrument(skip(self, request), fields(criterion_id = %criterion_id, override_lint = request.override_lint))]
    pub async fn publish(
        &self,
        criterion_id: &str,
        request: PublishRequest,
    ) -> Result<PublishOutcome> {
        let reason = require_text("change reason", &request.change_reason)?;
        let current = self.load_for(criterion_id, Transition::Publish).await?;

        let verdict = lint(&current.problem_statement);
        obs::emit_lint_evaluated(criterion_id, &verdict);

        if !verdict.passed && !request.override_lint {
            obs::emit_publish_rejected(criterion_id, &verdict);
            return Ok(PublishOutcome::Rejected {
                lint_result: verdict,
            });
        }

        let next_version = current.version_number + 1;
        let snapshot = CriterionSnapshot::new(
            criterion_id,
            next_version,
            &current.title,
            current.problem_statement.clone(),
            reason,
            &request.published_by,
        );
        debug!(version = next_version, digest = %snapshot.document_digest.short(), "publishing");

        let mut record = current.clone();
        record.status = CriterionStatus::Published;
        record.version_number = next_version;
        record.change_reason = Some(reason.to_string());
        record.updated_at = Utc::now();
        let record = self.commit_version(current, record, snapshot).await?;

        obs::emit_criterion_published(criterion_id, next_version, !verdict.passed);
        Ok(PublishOutcome::Published {
            criterion: record,
            lint_result: verdict,
        })
    }

    /// Restore the newest snapshot whose content differs from the current document.
    ///
    /// The restore is written as a new version with status Published.
    #[instrument(skip(self, request), fields(criterion_id = %criterion_id))]
    pub async fn rollback(
        &self,
        criterion_id: &str,
        request: RollbackRequest,
    ) -> Result<RollbackOutcome> {
        let reason = require_text("change reason", &request.change_reason)?;
        let current = self.load_for(criterion_id, Transition::Rollback).await?;

        let current_digest = current.document_digest();
        let target = self
            .store
            .snapshots(criterion_id)
            .await?
            .into_iter()
            .find(|s| s.document_digest != current_digest)
            .ok_or_else(|| CriteriaError::NoPriorSnapshot {
                criterion_id: criterion_id.to_string(),
            })?;

        let next_version = current.version_number + 1;
        let change_reason = format!("{ROLLBACK_PREFIX}{reason}");
        let snapshot = CriterionSnapshot::new(
            criterion_id,
            next_version,
            &target.title,
            target.problem_statement.clone(),
            &change_reason,
            &request.rolled_back_by,
        )
        .restored_from(target.version_number);

        let mut record = current.clone();
        record.title = target.title;
        record.problem_statement = target.problem_statement;
        record.status = CriterionStatus::Published;
        record.version_number = next_version;
        record.change_reason = Some(change_reason);
        record.updated_at = Utc::now();
        let record = self.commit_version(current, record, snapshot).await?;

        obs::emit_criterion_rolled_back(criterion_id, target.version_number, next_version);
        Ok(RollbackOutcome {
            criterion: record,
            restored_from_version: target.version_number,
        })
    }

    /// Retire a criterion. The version is unchanged and no snapshot is taken.
    #[instrument(skip(self, reason), fields(criterion_id = %criterion_id))]
    pub async fn deprecate(&self, criterion_id: &str, reason: &str) -> Result<CriterionRecord> {
        let reason = require_text("change reason", reason)?;
        let mut record = self.load_for(criterion_id, Transition::Deprecate).await?;

        record.status = CriterionStatus::Deprecated;
        record.change_reason = Some(reason.to_string());
        record.updated_at = Utc::now();
        let record = self.store.put_criterion(record).await?;

        obs::emit_criterion_deprecated(criterion_id, record.version_number);
        Ok(record)
    }

    /// Published versions, newest first.
    pub async fn history(&self, criterion_id: &str) -> Result<Vec<CriterionSnapshot>> {
        self.store.get_criterion(criterion_id).await?;
        Ok(self.store.snapshots(criterion_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::new_criterion;
    use crate::CriteriaService;
    use criteria_state::fakes::MemoryCriteriaStore;

    async fn seeded() -> (Arc<MemoryCriteriaStore>, LifecycleService<MemoryCriteriaStore>) {
        let store = Arc::new(MemoryCriteriaStore::new());
        CriteriaService::new(store.clone())
            .create(new_criterion("C"))
            .await
            .unwrap();
        (store.clone(), LifecycleService::new(store))
    }

    fn publish_req(reason: &str) -> PublishRequest {
        PublishRequest {
            change_reason: reason.to_string(),
            override_lint: false,
            published_by: "alice".to_string(),
        }
    }

    #[tokio::test]
    async fn blank_reason_is_rejected_before_lookup() {
        let (_, svc) = seeded().await;
        let err = svc.publish("MISSING", publish_req("  ")).await.unwrap_err();
        assert!(matches!(err, CriteriaError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn publish_writes_snapshot_for_new_version() {
        let (store, svc) = seeded().await;
        let outcome = svc.publish("C", publish_req("initial")).await.unwrap();
        assert!(outcome.is_published());

        let snap = store.get_snapshot("C", 2).await.unwrap();
        assert_eq!(snap.change_reason, "initial");
        assert_eq!(snap.published_by, "alice");
        assert!(snap.restored_from_version.is_none());
    }

    #[tokio::test]
    async fn deprecate_keeps_version_and_blocks_everything() {
        let (_, svc) = seeded().await;
        let record = svc.deprecate("C", "superseded by C-2").await.unwrap();
        assert_eq!(record.status, CriterionStatus::Deprecated);
        assert_eq!(record.version_number, 1);
        assert_eq!(record.change_reason.as_deref(), Some("superseded by C-2"));

        assert!(matches!(
            svc.publish("C", publish_req("again")).await,
            Err(CriteriaError::InvalidTransition {
                transition: Transition::Publish,
                ..
            })
        ));
        assert!(matches!(
            svc.deprecate("C", "twice").await,
            Err(CriteriaError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn history_of_unknown_criterion_is_not_found() {
        let (_, svc) = seeded().await;
        assert!(svc.history("NOPE").await.unwrap_err().is_not_found());
        assert!(svc.history("C").await.unwrap().is_empty());
    }
}
