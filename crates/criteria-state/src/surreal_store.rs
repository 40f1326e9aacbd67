//! SurrealDB-backed implementation of every criteria storage trait
//!
//! Uses the row types in `schema`, converting to/from `storage_traits`
//! records at the boundary.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::{CloudConfig, DEFAULT_DATABASE, DEFAULT_LOCAL_PATH, DEFAULT_NAMESPACE};
use crate::error::{StateError, StorageError};
use crate::migrations;
use crate::schema::{AiRunRow, CriterionRow, IssueRow, SnapshotRow, StatementRow};
use crate::storage_traits::*;

/// SurrealDB-backed criteria store.
#[derive(Clone)]
pub struct SurrealCriteriaStore {
    db: Surreal<Any>,
}

impl SurrealCriteriaStore {
    /// Create an in-memory instance for testing.
    ///
    /// Connects to `mem://`, selects `criteria/main`, and runs `init_schema`.
    pub async fn in_memory() -> crate::Result<Self> {
        let db = Self::open("mem://", DEFAULT_NAMESPACE, DEFAULT_DATABASE).await?;
        info!("SurrealCriteriaStore connected (in-memory)");
        Ok(Self { db })
    }

    /// Connect to a remote database with credentials.
    #[instrument(skip(config), fields(endpoint = %config.endpoint, namespace = %config.namespace))]
    pub async fn cloud(config: CloudConfig) -> crate::Result<Self> {
        use surrealdb::opt::auth::{Database, Root};

        let db = surrealdb::engine::any::connect(&config.endpoint)
            .await
            .map_err(|e| {
                StateError::Connection(format!("Failed to connect to {}: {}", config.endpoint, e))
            })?;

        if config.is_root {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| StateError::Connection(format!("Root auth failed: {e}")))?;
        } else {
            db.signin(Database {
                namespace: &config.namespace,
                database: &config.database,
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| StateError::Connection(format!("DB auth failed: {e}")))?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;
        info!("SurrealCriteriaStore connected (cloud)");
        Ok(Self { db })
    }

    /// Create from environment variables.
    ///
    /// Order: cloud credentials (`SURREALDB_ENDPOINT` and friends), then
    /// `SURREALDB_URL`, then local persistence under `.criteria/db`.
    pub async fn from_env() -> crate::Result<Self> {
        if let Ok(config) = CloudConfig::from_env() {
            return Self::cloud(config).await;
        }

        if let Ok(url) = std::env::var("SURREALDB_URL") {
            let db = Self::open(&url, DEFAULT_NAMESPACE, DEFAULT_DATABASE).await?;
            info!("SurrealCriteriaStore connected ({})", url);
            return Ok(Self { db });
        }

        std::fs::create_dir_all(DEFAULT_LOCAL_PATH).map_err(|e| {
            StateError::Connection(format!(
                "Failed to create database directory {}: {}",
                DEFAULT_LOCAL_PATH, e
            ))
        })?;
        let url = format!("surrealkv://{}", DEFAULT_LOCAL_PATH);
        info!(
            "No cloud config or SURREALDB_URL found, using local persistence: {}",
            url
        );
        let db = Self::open(&url, DEFAULT_NAMESPACE, DEFAULT_DATABASE).await?;
        Ok(Self { db })
    }

    async fn open(url: &str, ns: &str, database: &str) -> crate::Result<Surreal<Any>> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        db.use_ns(ns)
            .use_db(database)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;
        Ok(db)
    }

    // -- private helpers -----------------------------------------------------

    /// Run a query with one bound string parameter and take the first result set.
    async fn select<T: DeserializeOwned>(
        &self,
        sql: &'static str,
        key: &'static str,
        value: &str,
    ) -> StorageResult<Vec<T>> {
        let mut res = self
            .db
            .query(sql)
            .bind((key, value.to_string()))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        res.take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    async fn fetch_criterion(&self, criterion_id: &str) -> StorageResult<Option<CriterionRow>> {
        let rows: Vec<CriterionRow> = self
            .select(
                "SELECT * FROM criteria WHERE criterion_id = $cid",
                "cid",
                criterion_id,
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_issue(&self, issue_id: &Uuid) -> StorageResult<IssueRow> {
        let rows: Vec<IssueRow> = self
            .select(
                "SELECT * FROM issues WHERE issue_id = $iid",
                "iid",
                &issue_id.to_string(),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::IssueNotFound {
                issue_id: issue_id.to_string(),
            })
    }

    async fn fetch_statement(&self, id: &Uuid) -> StorageResult<StatementRow> {
        let rows: Vec<StatementRow> = self
            .select(
                "SELECT * FROM problem_statements WHERE statement_id = $sid",
                "sid",
                &id.to_string(),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::StatementNotFound { id: id.to_string() })
    }
}

// ---------------------------------------------------------------------------
// CriterionStore
// ---------------------------------------------------------------------------

#[async_trait]
impl CriterionStore for SurrealCriteriaStore {
    #[instrument(skip(self, record), fields(criterion_id = %record.criterion_id))]
    async fn create_criterion(&self, record: CriterionRecord) -> StorageResult<CriterionRecord> {
        if self.fetch_criterion(&record.criterion_id).await?.is_some() {
            return Err(StorageError::CriterionExists {
                criterion_id: record.criterion_id,
            });
        }

        debug!("creating criterion");
        let _created: Option<CriterionRow> = self
            .db
            .create("criteria")
            .content(CriterionRow::from_record(record.clone()))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(record)
    }

    async fn get_criterion(&self, criterion_id: &str) -> StorageResult<CriterionRecord> {
        self.fetch_criterion(criterion_id)
            .await?
            .ok_or_else(|| StorageError::CriterionNotFound {
                criterion_id: criterion_id.to_string(),
            })?
            .into_record()
    }

    #[instrument(skip(self, record), fields(criterion_id = %record.criterion_id))]
    async fn put_criterion(&self, record: CriterionRecord) -> StorageResult<CriterionRecord> {
        let existing = self
            .fetch_criterion(&record.criterion_id)
            .await?
            .ok_or_else(|| StorageError::CriterionNotFound {
                criterion_id: record.criterion_id.clone(),
            })?;

        let mut row = CriterionRow::from_record(record.clone());
        row.id = existing.id;
        let cid = record.criterion_id.clone();

        self.db
            .query("UPDATE criteria CONTENT $row WHERE criterion_id = $cid")
            .bind(("row", row))
            .bind(("cid", cid))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .check()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(record)
    }

    async fn list_criteria(
        &self,
        status: Option<CriterionStatus>,
    ) -> StorageResult<Vec<CriterionRecord>> {
        let rows: Vec<CriterionRow> = match status {
            Some(s) => {
                self.select(
                    "SELECT * FROM criteria WHERE status = $status ORDER BY updated_at DESC",
                    "status",
                    s.as_str(),
                )
                .await?
            }
            None => {
                let mut res = self
                    .db
                    .query("SELECT * FROM criteria ORDER BY updated_at DESC")
                    .await
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
                res.take(0)
                    .map_err(|e| StorageError::Backend(e.to_string()))?
            }
        };
        rows.into_iter().map(CriterionRow::into_record).collect()
    }
}

// ---------------------------------------------------------------------------
// SnapshotLog
// ---------------------------------------------------------------------------

#[async_trait]
impl SnapshotLog for SurrealCriteriaStore {
    #[instrument(skip(self, snapshot), fields(criterion_id = %snapshot.criterion_id, version = snapshot.version_number))]
    async fn append_snapshot(&self, snapshot: CriterionSnapshot) -> StorageResult<()> {
        match self
            .get_snapshot(&snapshot.criterion_id, snapshot.version_number)
            .await
        {
            Ok(_) => {
                return Err(StorageError::DuplicateSnapshot {
                    criterion_id: snapshot.criterion_id,
                    version: snapshot.version_number,
                })
            }
            Err(StorageError::SnapshotNotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let _created: Option<SnapshotRow> = self
            .db
            .create("criterion_snapshots")
            .content(SnapshotRow::from_snapshot(snapshot))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn snapshots(&self, criterion_id: &str) -> StorageResult<Vec<CriterionSnapshot>> {
        let rows: Vec<SnapshotRow> = self
            .select(
                "SELECT * FROM criterion_snapshots WHERE criterion_id = $cid ORDER BY version_number DESC",
                "cid",
                criterion_id,
            )
            .await?;
        rows.into_iter().map(SnapshotRow::into_snapshot).collect()
    }

    async fn get_snapshot(
        &self,
        criterion_id: &str,
        version: u32,
    ) -> StorageResult<CriterionSnapshot> {
        let mut res = self
            .db
            .query(
                "SELECT * FROM criterion_snapshots WHERE criterion_id = $cid AND version_number = $v",
            )
            .bind(("cid", criterion_id.to_string()))
            .bind(("v", version))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<SnapshotRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::SnapshotNotFound {
                criterion_id: criterion_id.to_string(),
                version,
            })?
            .into_snapshot()
    }
}

// ---------------------------------------------------------------------------
// IssueTracker
// ---------------------------------------------------------------------------

#[async_trait]
impl IssueTracker for SurrealCriteriaStore {
    async fn create_issue(&self, issue: IssueRecord) -> StorageResult<IssueRecord> {
        let _created: Option<IssueRow> = self
            .db
            .create("issues")
            .content(IssueRow::from_issue(issue.clone()))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(issue)
    }

    async fn get_issue(&self, issue_id: &Uuid) -> StorageResult<IssueRecord> {
        self.fetch_issue(issue_id).await?.into_issue()
    }

    async fn put_issue(&self, issue: IssueRecord) -> StorageResult<IssueRecord> {
        let existing = self.fetch_issue(&issue.issue_id).await?;

        let mut row = IssueRow::from_issue(issue.clone());
        row.id = existing.id;
        let iid = issue.issue_id.to_string();

        self.db
            .query("UPDATE issues CONTENT $row WHERE issue_id = $iid")
            .bind(("row", row))
            .bind(("iid", iid))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .check()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(issue)
    }

    async fn list_issues(&self, criterion_id: &str) -> StorageResult<Vec<IssueRecord>> {
        let rows: Vec<IssueRow> = self
            .select(
                "SELECT * FROM issues WHERE criterion_id = $cid ORDER BY created_at ASC",
                "cid",
                criterion_id,
            )
            .await?;
        rows.into_iter().map(IssueRow::into_issue).collect()
    }
}

// ---------------------------------------------------------------------------
// AiRunLedger
// ---------------------------------------------------------------------------

#[async_trait]
impl AiRunLedger for SurrealCriteriaStore {
    #[instrument(skip(self, run), fields(criterion_id = %run.criterion_id, run_id = %run.run_id))]
    async fn append_run(&self, run: AiRunRecord) -> StorageResult<()> {
        let _created: Option<AiRunRow> = self
            .db
            .create("ai_runs")
            .content(AiRunRow::from_run(run))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn get_run(&self, run_id: &Uuid) -> StorageResult<AiRunRecord> {
        let rows: Vec<AiRunRow> = self
            .select(
                "SELECT * FROM ai_runs WHERE run_id = $rid",
                "rid",
                &run_id.to_string(),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::RunNotFound {
                run_id: run_id.to_string(),
            })?
            .into_run()
    }

    async fn list_runs(&self, criterion_id: &str) -> StorageResult<Vec<AiRunRecord>> {
        let rows: Vec<AiRunRow> = self
            .select(
                "SELECT * FROM ai_runs WHERE criterion_id = $cid ORDER BY created_at DESC",
                "cid",
                criterion_id,
            )
            .await?;
        rows.into_iter().map(AiRunRow::into_run).collect()
    }
}

// ---------------------------------------------------------------------------
// StatementStore
// ---------------------------------------------------------------------------

#[async_trait]
impl StatementStore for SurrealCriteriaStore {
    async fn create_statement(&self, record: StatementRecord) -> StorageResult<StatementRecord> {
        let _created: Option<StatementRow> = self
            .db
            .create("problem_statements")
            .content(StatementRow::from_statement(record.clone()))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(record)
    }

    async fn get_statement(&self, id: &Uuid) -> StorageResult<StatementRecord> {
        self.fetch_statement(id).await?.into_statement()
    }

    async fn put_statement(&self, record: StatementRecord) -> StorageResult<StatementRecord> {
        let existing = self.fetch_statement(&record.id).await?;

        let mut row = StatementRow::from_statement(record.clone());
        row.id = existing.id;
        let sid = record.id.to_string();

        self.db
            .query("UPDATE problem_statements CONTENT $row WHERE statement_id = $sid")
            .bind(("row", row))
            .bind(("sid", sid))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .check()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(record)
    }

    async fn delete_statement(&self, id: &Uuid) -> StorageResult<()> {
        self.fetch_statement(id).await?;

        self.db
            .query("DELETE problem_statements WHERE statement_id = $sid")
            .bind(("sid", id.to_string()))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .check()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn list_statements(&self, criterion_id: &str) -> StorageResult<Vec<StatementRecord>> {
        let rows: Vec<StatementRow> = self
            .select(
                "SELECT * FROM problem_statements WHERE criterion_id = $cid ORDER BY created_at DESC",
                "cid",
                criterion_id,
            )
            .await?;
        rows.into_iter().map(StatementRow::into_statement).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use criteria_doc::ProblemStatement;

    #[tokio::test]
    async fn rejected_update_statement_surfaces_as_error() {
        let store = SurrealCriteriaStore::in_memory().await.unwrap();
        let record = CriterionRecord::new("C-1", "Sepsis", "alice", ProblemStatement::default());
        store.create_criterion(record.clone()).await.unwrap();

        store
            .db
            .query("DEFINE FIELD title ON criteria ASSERT $value != 'rejected'")
            .await
            .unwrap()
            .check()
            .unwrap();

        let mut rejected = record.clone();
        rejected.title = "rejected".to_string();
        let err = store.put_criterion(rejected).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
        assert_eq!(store.get_criterion("C-1").await.unwrap().title, "Sepsis");
    }
}
