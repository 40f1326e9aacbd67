//! SurrealDB row types
//!
//! Rows mirror the `storage_traits` records but keep identifiers and enums
//! as plain strings and datetimes as SurrealDB datetimes. Conversion to the
//! domain records happens at the boundary and validates every field.

use chrono::{DateTime, Utc};
use criteria_doc::{LintVerdict, ProblemStatement};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;
use crate::storage_traits::{
    AiRunRecord, ContentDigest, CriterionRecord, CriterionSnapshot, CriterionStatus, IssueRecord,
    IssueStatus, IssueType, StatementRecord, StorageResult,
};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Module for serializing optional chrono DateTime to SurrealDB datetime format
mod surreal_datetime_opt {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => {
                let sd = SurrealDatetime::from(*d);
                serde::Serialize::serialize(&Some(sd), serializer)
            }
            None => serde::Serialize::serialize(&None::<SurrealDatetime>, serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = Option::<SurrealDatetime>::deserialize(deserializer)?;
        Ok(sd.map(DateTime::from))
    }
}

fn parse_uuid(field: &str, value: &str) -> StorageResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| StorageError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}

// ---------------------------------------------------------------------------
// criteria
// ---------------------------------------------------------------------------

/// Row in the `criteria` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub criterion_id: String,
    pub title: String,
    pub version_number: u32,
    /// "Draft" | "Published" | "Deprecated"
    pub status: String,
    pub author: String,
    pub change_reason: Option<String>,
    pub linked_policy_id: Option<String>,
    pub linked_criteria_ids: Vec<String>,
    pub problem_statement_json: ProblemStatement,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl CriterionRow {
    pub fn from_record(record: CriterionRecord) -> Self {
        Self {
            id: None,
            criterion_id: record.criterion_id,
            title: record.title,
            version_number: record.version_number,
            status: record.status.as_str().to_string(),
            author: record.author,
            change_reason: record.change_reason,
            linked_policy_id: record.linked_policy_id,
            linked_criteria_ids: record.linked_criteria_ids,
            problem_statement_json: record.problem_statement,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    pub fn into_record(self) -> StorageResult<CriterionRecord> {
        Ok(CriterionRecord {
            status: self.status.parse::<CriterionStatus>()?,
            criterion_id: self.criterion_id,
            title: self.title,
            version_number: self.version_number,
            author: self.author,
            change_reason: self.change_reason,
            linked_policy_id: self.linked_policy_id,
            linked_criteria_ids: self.linked_criteria_ids,
            problem_statement: self.problem_statement_json,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// criterion_snapshots
// ---------------------------------------------------------------------------

/// Row in the `criterion_snapshots` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub criterion_id: String,
    pub version_number: u32,
    pub title: String,
    pub problem_statement_json: ProblemStatement,
    pub document_digest: String,
    pub change_reason: String,
    pub published_by: String,
    pub restored_from_version: Option<u32>,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl SnapshotRow {
    pub fn from_snapshot(snapshot: CriterionSnapshot) -> Self {
        Self {
            id: None,
            criterion_id: snapshot.criterion_id,
            version_number: snapshot.version_number,
            title: snapshot.title,
            problem_statement_json: snapshot.problem_statement,
            document_digest: snapshot.document_digest.into(),
            change_reason: snapshot.change_reason,
            published_by: snapshot.published_by,
            restored_from_version: snapshot.restored_from_version,
            created_at: snapshot.created_at,
        }
    }

    pub fn into_snapshot(self) -> StorageResult<CriterionSnapshot> {
        Ok(CriterionSnapshot {
            document_digest: ContentDigest::try_from(self.document_digest)?,
            criterion_id: self.criterion_id,
            version_number: self.version_number,
            title: self.title,
            problem_statement: self.problem_statement_json,
            change_reason: self.change_reason,
            published_by: self.published_by,
            restored_from_version: self.restored_from_version,
            created_at: self.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// issues
// ---------------------------------------------------------------------------

/// Row in the `issues` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub issue_id: String,
    pub criterion_id: String,
    /// Full issue-type label
    #[serde(rename = "type")]
    pub issue_type: String,
    /// "Open" | "Resolved" | "Dismissed"
    pub status: String,
    pub notes: Option<String>,
    pub proposed_fix: Option<String>,
    pub created_by: String,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "surreal_datetime_opt")]
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}

impl IssueRow {
    pub fn from_issue(issue: IssueRecord) -> Self {
        let status = match issue.status {
            IssueStatus::Open => "Open",
            IssueStatus::Resolved => "Resolved",
            IssueStatus::Dismissed => "Dismissed",
        };
        Self {
            id: None,
            issue_id: issue.issue_id.to_string(),
            criterion_id: issue.criterion_id,
            issue_type: issue.issue_type.label().to_string(),
            status: status.to_string(),
            notes: issue.notes,
            proposed_fix: issue.proposed_fix,
            created_by: issue.created_by,
            created_at: issue.created_at,
            resolved_at: issue.resolved_at,
            resolved_by: issue.resolved_by,
        }
    }

    pub fn into_issue(self) -> StorageResult<IssueRecord> {
        let status = match self.status.as_str() {
            "Open" => IssueStatus::Open,
            "Resolved" => IssueStatus::Resolved,
            "Dismissed" => IssueStatus::Dismissed,
            other => {
                return Err(StorageError::InvalidValue {
                    field: "issue status".to_string(),
                    value: other.to_string(),
                })
            }
        };
        Ok(IssueRecord {
            issue_id: parse_uuid("issue_id", &self.issue_id)?,
            criterion_id: self.criterion_id,
            issue_type: self.issue_type.parse::<IssueType>()?,
            status,
            notes: self.notes,
            proposed_fix: self.proposed_fix,
            created_by: self.created_by,
            created_at: self.created_at,
            resolved_at: self.resolved_at,
            resolved_by: self.resolved_by,
        })
    }
}

// ---------------------------------------------------------------------------
// ai_runs
// ---------------------------------------------------------------------------

/// Row in the `ai_runs` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiRunRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub run_id: String,
    pub criterion_id: String,
    pub mode: String,
    pub input_context: serde_json::Value,
    pub agent_output: serde_json::Value,
    pub lint_result: LintVerdict,
    pub created_by: String,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl AiRunRow {
    pub fn from_run(run: AiRunRecord) -> Self {
        Self {
            id: None,
            run_id: run.run_id.to_string(),
            criterion_id: run.criterion_id,
            mode: run.mode,
            input_context: run.input_context,
            agent_output: run.agent_output,
            lint_result: run.lint_result,
            created_by: run.created_by,
            created_at: run.created_at,
        }
    }

    pub fn into_run(self) -> StorageResult<AiRunRecord> {
        Ok(AiRunRecord {
            run_id: parse_uuid("run_id", &self.run_id)?,
            criterion_id: self.criterion_id,
            mode: self.mode,
            input_context: self.input_context,
            agent_output: self.agent_output,
            lint_result: self.lint_result,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// problem_statements
// ---------------------------------------------------------------------------

/// Row in the `problem_statements` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub statement_id: String,
    pub criterion_id: String,
    pub problem_statement_json: ProblemStatement,
    pub original_input: String,
    pub selected_issues: Vec<String>,
    pub additional_context: Option<String>,
    pub tags: Vec<String>,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl StatementRow {
    pub fn from_statement(record: StatementRecord) -> Self {
        Self {
            id: None,
            statement_id: record.id.to_string(),
            criterion_id: record.criterion_id,
            problem_statement_json: record.problem_statement,
            original_input: record.original_input,
            selected_issues: record.selected_issues,
            additional_context: record.additional_context,
            tags: record.tags,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    pub fn into_statement(self) -> StorageResult<StatementRecord> {
        Ok(StatementRecord {
            id: parse_uuid("statement_id", &self.statement_id)?,
            criterion_id: self.criterion_id,
            problem_statement: self.problem_statement_json,
            original_input: self.original_input,
            selected_issues: self.selected_issues,
            additional_context: self.additional_context,
            tags: self.tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
