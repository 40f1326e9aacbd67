//! In-memory fakes for storage traits (testing only)
//!
//! `MemoryCriteriaStore` satisfies every storage trait contract without any
//! external dependencies. Each concern sits behind its own `Mutex`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorageError;
use crate::storage_traits::*;

/// In-memory backend for all criteria storage traits.
#[derive(Debug, Default)]
pub struct MemoryCriteriaStore {
    criteria: Mutex<HashMap<String, CriterionRecord>>,
    // criterion_id -> version -> snapshot
    snapshots: Mutex<HashMap<String, BTreeMap<u32, CriterionSnapshot>>>,
    issues: Mutex<Vec<IssueRecord>>,
    runs: Mutex<Vec<AiRunRecord>>,
    statements: Mutex<HashMap<Uuid, StatementRecord>>,
}

impl MemoryCriteriaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// CriterionStore
// ---------------------------------------------------------------------------

#[async_trait]
impl CriterionStore for MemoryCriteriaStore {
    async fn create_criterion(&self, record: CriterionRecord) -> StorageResult<CriterionRecord> {
        let mut criteria = self.criteria.lock().unwrap();
        if criteria.contains_key(&record.criterion_id) {
            return Err(StorageError::CriterionExists {
                criterion_id: record.criterion_id,
            });
        }
        criteria.insert(record.criterion_id.clone(), record.clone());
        Ok(record)
    }

    async fn get_criterion(&self, criterion_id: &str) -> StorageResult<CriterionRecord> {
        let criteria = self.criteria.lock().unwrap();
        criteria
            .get(criterion_id)
            .cloned()
            .ok_or_else(|| StorageError::CriterionNotFound {
                criterion_id: criterion_id.to_string(),
            })
    }

    async fn put_criterion(&self, record: CriterionRecord) -> StorageResult<CriterionRecord> {
        let mut criteria = self.criteria.lock().unwrap();
        match criteria.get_mut(&record.criterion_id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(record)
            }
            None => Err(StorageError::CriterionNotFound {
                criterion_id: record.criterion_id,
            }),
        }
    }

    async fn list_criteria(
        &self,
        status: Option<CriterionStatus>,
    ) -> StorageResult<Vec<CriterionRecord>> {
        let criteria = self.criteria.lock().unwrap();
        let mut out: Vec<CriterionRecord> = criteria
            .values()
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// SnapshotLog
// ---------------------------------------------------------------------------

#[async_trait]
impl SnapshotLog for MemoryCriteriaStore {
    async fn append_snapshot(&self, snapshot: CriterionSnapshot) -> StorageResult<()> {
        let mut snapshots = self.snapshots.lock().unwrap();
        let versions = snapshots
            .entry(snapshot.criterion_id.clone())
            .or_default();
        if versions.contains_key(&snapshot.version_number) {
            return Err(StorageError::DuplicateSnapshot {
                criterion_id: snapshot.criterion_id,
                version: snapshot.version_number,
            });
        }
        versions.insert(snapshot.version_number, snapshot);
        Ok(())
    }

    async fn snapshots(&self, criterion_id: &str) -> StorageResult<Vec<CriterionSnapshot>> {
        let snapshots = self.snapshots.lock().unwrap();
        Ok(snapshots
            .get(criterion_id)
            .map(|versions| versions.values().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_snapshot(
        &self,
        criterion_id: &str,
        version: u32,
    ) -> StorageResult<CriterionSnapshot> {
        let snapshots = self.snapshots.lock().unwrap();
        snapshots
            .get(criterion_id)
            .and_then(|versions| versions.get(&version))
            .cloned()
            .ok_or_else(|| StorageError::SnapshotNotFound {
                criterion_id: criterion_id.to_string(),
                version,
            })
    }
}

// ---------------------------------------------------------------------------
// IssueTracker
// ---------------------------------------------------------------------------

#[async_trait]
impl IssueTracker for MemoryCriteriaStore {
    async fn create_issue(&self, issue: IssueRecord) -> StorageResult<IssueRecord> {
        let mut issues = self.issues.lock().unwrap();
        issues.push(issue.clone());
        Ok(issue)
    }

    async fn get_issue(&self, issue_id: &Uuid) -> StorageResult<IssueRecord> {
        let issues = self.issues.lock().unwrap();
        issues
            .iter()
            .find(|i| &i.issue_id == issue_id)
            .cloned()
            .ok_or_else(|| StorageError::IssueNotFound {
                issue_id: issue_id.to_string(),
            })
    }

    async fn put_issue(&self, issue: IssueRecord) -> StorageResult<IssueRecord> {
        let mut issues = self.issues.lock().unwrap();
        let slot = issues
            .iter_mut()
            .find(|i| i.issue_id == issue.issue_id)
            .ok_or_else(|| StorageError::IssueNotFound {
                issue_id: issue.issue_id.to_string(),
            })?;
        *slot = issue.clone();
        Ok(issue)
    }

    async fn list_issues(&self, criterion_id: &str) -> StorageResult<Vec<IssueRecord>> {
        let issues = self.issues.lock().unwrap();
        let mut out: Vec<IssueRecord> = issues
            .iter()
            .filter(|i| i.criterion_id == criterion_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// AiRunLedger
// ---------------------------------------------------------------------------

#[async_trait]
impl AiRunLedger for MemoryCriteriaStore {
    async fn append_run(&self, run: AiRunRecord) -> StorageResult<()> {
        let mut runs = self.runs.lock().unwrap();
        runs.push(run);
        Ok(())
    }

    async fn get_run(&self, run_id: &Uuid) -> StorageResult<AiRunRecord> {
        let runs = self.runs.lock().unwrap();
        runs.iter()
            .find(|r| &r.run_id == run_id)
            .cloned()
            .ok_or_else(|| StorageError::RunNotFound {
                run_id: run_id.to_string(),
            })
    }

    async fn list_runs(&self, criterion_id: &str) -> StorageResult<Vec<AiRunRecord>> {
        let runs = self.runs.lock().unwrap();
        // Insertion order is chronological; reverse for newest first.
        Ok(runs
            .iter()
            .rev()
            .filter(|r| r.criterion_id == criterion_id)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// StatementStore
// ---------------------------------------------------------------------------

#[async_trait]
impl StatementStore for MemoryCriteriaStore {
    async fn create_statement(&self, record: StatementRecord) -> StorageResult<StatementRecord> {
        let mut statements = self.statements.lock().unwrap();
        statements.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_statement(&self, id: &Uuid) -> StorageResult<StatementRecord> {
        let statements = self.statements.lock().unwrap();
        statements
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::StatementNotFound { id: id.to_string() })
    }

    async fn put_statement(&self, record: StatementRecord) -> StorageResult<StatementRecord> {
        let mut statements = self.statements.lock().unwrap();
        match statements.get_mut(&record.id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(record)
            }
            None => Err(StorageError::StatementNotFound {
                id: record.id.to_string(),
            }),
        }
    }

    async fn delete_statement(&self, id: &Uuid) -> StorageResult<()> {
        let mut statements = self.statements.lock().unwrap();
        statements
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::StatementNotFound { id: id.to_string() })
    }

    async fn list_statements(&self, criterion_id: &str) -> StorageResult<Vec<StatementRecord>> {
        let statements = self.statements.lock().unwrap();
        let mut out: Vec<StatementRecord> = statements
            .values()
            .filter(|s| s.criterion_id == criterion_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}
