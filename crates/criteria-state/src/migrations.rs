//! SurrealDB schema migrations and initialization
//!
//! Every table is SCHEMALESS; uniqueness is enforced by indexes and the
//! append-only tables deny updates and deletes.

use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all Criteria Studio tables.
///
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing criteria SurrealDB schema");

    init_criteria_table(db).await?;
    init_snapshots_table(db).await?;
    init_issues_table(db).await?;
    init_ai_runs_table(db).await?;
    init_statements_table(db).await?;

    info!("criteria schema initialization complete");
    Ok(())
}

/// Initialize `criteria` table
///
/// ```text
/// TABLE criteria {
///   criterion_id:            STRING (unique)
///   title:                   STRING
///   version_number:          INT
///   status:                  STRING (Draft | Published | Deprecated)
///   author:                  STRING
///   change_reason:           STRING?
///   linked_policy_id:        STRING?
///   linked_criteria_ids:     ARRAY<STRING>
///   problem_statement_json:  OBJECT
///   created_at:              DATETIME
///   updated_at:              DATETIME (indexed)
/// }
/// ```
async fn init_criteria_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing criteria table");

    let sql = r#"
        DEFINE TABLE criteria AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete NONE;

        DEFINE INDEX idx_criterion_id ON TABLE criteria COLUMNS criterion_id UNIQUE;
        DEFINE INDEX idx_status ON TABLE criteria COLUMNS status;
        DEFINE INDEX idx_updated_at ON TABLE criteria COLUMNS updated_at;
    "#;

    db.query(sql).await?;
    info!("✓ criteria table initialized");
    Ok(())
}

/// Initialize `criterion_snapshots` table
///
/// One row per published version; `(criterion_id, version_number)` is unique.
async fn init_snapshots_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing criterion_snapshots table");

    let sql = r#"
        DEFINE TABLE criterion_snapshots AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update NONE
                FOR delete NONE;

        DEFINE INDEX idx_snapshot_version ON TABLE criterion_snapshots
            COLUMNS criterion_id, version_number UNIQUE;
        DEFINE INDEX idx_snapshot_digest ON TABLE criterion_snapshots COLUMNS document_digest;
    "#;

    db.query(sql).await?;
    info!("✓ criterion_snapshots table initialized");
    Ok(())
}

/// Initialize `issues` table
async fn init_issues_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing issues table");

    let sql = r#"
        DEFINE TABLE issues AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete NONE;

        DEFINE INDEX idx_issue_id ON TABLE issues COLUMNS issue_id UNIQUE;
        DEFINE INDEX idx_issue_criterion ON TABLE issues COLUMNS criterion_id;
    "#;

    db.query(sql).await?;
    info!("✓ issues table initialized");
    Ok(())
}

/// Initialize `ai_runs` table (append-only)
async fn init_ai_runs_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing ai_runs table");

    let sql = r#"
        DEFINE TABLE ai_runs AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update NONE
                FOR delete NONE;

        DEFINE INDEX idx_ai_run_id ON TABLE ai_runs COLUMNS run_id UNIQUE;
        DEFINE INDEX idx_ai_run_criterion_created ON TABLE ai_runs
            COLUMNS criterion_id, created_at;
    "#;

    db.query(sql).await?;
    info!("✓ ai_runs table initialized");
    Ok(())
}

/// Initialize `problem_statements` table
async fn init_statements_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing problem_statements table");

    let sql = r#"
        DEFINE TABLE problem_statements AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete FULL;

        DEFINE INDEX idx_statement_id ON TABLE problem_statements COLUMNS statement_id UNIQUE;
        DEFINE INDEX idx_statement_criterion ON TABLE problem_statements COLUMNS criterion_id;
    "#;

    db.query(sql).await?;
    info!("✓ problem_statements table initialized");
    Ok(())
}
