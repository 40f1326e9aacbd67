//! Storage trait definitions for Criteria Studio
//!
//! These traits define the persistence seams:
//! - `CriterionStore`: the current state of each criterion
//! - `SnapshotLog`: append-only published versions (rollback source)
//! - `IssueTracker`: issues reported against a criterion
//! - `AiRunLedger`: append-only audit of regeneration attempts
//! - `StatementStore`: standalone problem statement records
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! via the `fakes` module; `SurrealCriteriaStore` is the database backend.
//! No trait offers optimistic concurrency: the last writer wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use criteria_doc::{LintVerdict, ProblemStatement};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ContentDigest
// ---------------------------------------------------------------------------

/// SHA-256 hex digest of a document's canonical JSON.
///
/// The inner field is private so the string is always valid lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Digest of a problem statement.
    pub fn of_document(doc: &ProblemStatement) -> Self {
        Self::from_bytes(&doc.canonical_bytes())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidDigest { digest: s });
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl From<ContentDigest> for String {
    fn from(d: ContentDigest) -> Self {
        d.0
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// Lifecycle status of a criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CriterionStatus {
    Draft,
    Published,
    Deprecated,
}

/// Operations that change a criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Update,
    Publish,
    Rollback,
    Deprecate,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Update => "update",
            Transition::Publish => "publish",
            Transition::Rollback => "rollback",
            Transition::Deprecate => "deprecate",
        }
    }
}

impl CriterionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CriterionStatus::Draft => "Draft",
            CriterionStatus::Published => "Published",
            CriterionStatus::Deprecated => "Deprecated",
        }
    }

    /// Whether `transition` may start from this status. Deprecated is terminal.
    pub fn allows(&self, transition: Transition) -> bool {
        use Transition::*;
        match (self, transition) {
            (CriterionStatus::Draft, Update | Publish | Rollback | Deprecate) => true,
            (CriterionStatus::Published, Update | Publish | Rollback | Deprecate) => true,
            (CriterionStatus::Deprecated, _) => false,
        }
    }
}

impl std::fmt::Display for CriterionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CriterionStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Ok(CriterionStatus::Draft),
            "published" => Ok(CriterionStatus::Published),
            "deprecated" => Ok(CriterionStatus::Deprecated),
            _ => Err(StorageError::InvalidValue {
                field: "status".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Current state of a criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionRecord {
    /// Human-assigned unique identifier (e.g. "SEPSIS-2024-001")
    pub criterion_id: String,
    pub title: String,
    /// Only ever increases
    pub version_number: u32,
    pub status: CriterionStatus,
    pub author: String,
    pub change_reason: Option<String>,
    pub linked_policy_id: Option<String>,
    pub linked_criteria_ids: Vec<String>,
    #[serde(rename = "problem_statement_json")]
    pub problem_statement: ProblemStatement,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CriterionRecord {
    /// A fresh Draft at version 1.
    pub fn new(
        criterion_id: &str,
        title: &str,
        author: &str,
        problem_statement: ProblemStatement,
    ) -> Self {
        let now = Utc::now();
        Self {
            criterion_id: criterion_id.to_string(),
            title: title.to_string(),
            version_number: 1,
            status: CriterionStatus::Draft,
            author: author.to_string(),
            change_reason: None,
            linked_policy_id: None,
            linked_criteria_ids: Vec::new(),
            problem_statement,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn document_digest(&self) -> ContentDigest {
        ContentDigest::of_document(&self.problem_statement)
    }
}

/// Criterion persistence.
///
/// Guarantees:
/// - `criterion_id` is unique.
/// - `put_criterion` only replaces an existing record.
#[async_trait]
pub trait CriterionStore: Send + Sync {
    /// Insert a new criterion. Fails with `CriterionExists` on a duplicate id.
    async fn create_criterion(&self, record: CriterionRecord) -> StorageResult<CriterionRecord>;

    /// Fetch a criterion. Fails with `CriterionNotFound` if absent.
    async fn get_criterion(&self, criterion_id: &str) -> StorageResult<CriterionRecord>;

    /// Replace an existing criterion. Fails with `CriterionNotFound` if absent.
    async fn put_criterion(&self, record: CriterionRecord) -> StorageResult<CriterionRecord>;

    /// List criteria, most recently updated first.
    async fn list_criteria(
        &self,
        status: Option<CriterionStatus>,
    ) -> StorageResult<Vec<CriterionRecord>>;
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Frozen copy of a criterion taken at publish time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionSnapshot {
    pub criterion_id: String,
    pub version_number: u32,
    pub title: String,
    #[serde(rename = "problem_statement_json")]
    pub problem_statement: ProblemStatement,
    pub document_digest: ContentDigest,
    pub change_reason: String,
    pub published_by: String,
    /// Version this snapshot was restored from, when produced by a rollback
    pub restored_from_version: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl CriterionSnapshot {
    pub fn new(
        criterion_id: &str,
        version_number: u32,
        title: &str,
        problem_statement: ProblemStatement,
        change_reason: &str,
        published_by: &str,
    ) -> Self {
        let document_digest = ContentDigest::of_document(&problem_statement);
        Self {
            criterion_id: criterion_id.to_string(),
            version_number,
            title: title.to_string(),
            problem_statement,
            document_digest,
            change_reason: change_reason.to_string(),
            published_by: published_by.to_string(),
            restored_from_version: None,
            created_at: Utc::now(),
        }
    }

    /// Mark this snapshot as the product of a rollback.
    pub fn restored_from(mut self, version: u32) -> Self {
        self.restored_from_version = Some(version);
        self
    }
}

/// Append-only log of published versions.
///
/// Semantics:
/// - At most one snapshot per (criterion, version).
/// - Snapshots are never modified or removed.
/// - `snapshots` returns newest (highest version) first.
#[async_trait]
pub trait SnapshotLog: Send + Sync {
    /// Record a snapshot. Fails with `DuplicateSnapshot` if the version exists.
    async fn append_snapshot(&self, snapshot: CriterionSnapshot) -> StorageResult<()>;

    /// All snapshots for a criterion, newest first.
    async fn snapshots(&self, criterion_id: &str) -> StorageResult<Vec<CriterionSnapshot>>;

    /// A single snapshot. Fails with `SnapshotNotFound` if absent.
    async fn get_snapshot(
        &self,
        criterion_id: &str,
        version: u32,
    ) -> StorageResult<CriterionSnapshot>;
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// Fixed vocabulary of issue categories.
///
/// Serialized as the full human-readable label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueType {
    #[serde(rename = "Missed extraction (valid documentation not captured)")]
    MissedExtraction,
    #[serde(rename = "Over-extraction / hallucinated info")]
    OverExtraction,
    #[serde(rename = "Misinterpretation of the medical record")]
    Misinterpretation,
    #[serde(rename = "Overly rigid phrasing (misses synonyms/abbreviations)")]
    RigidPhrasing,
    #[serde(rename = "Overly permissive phrasing (false positives)")]
    PermissivePhrasing,
    #[serde(rename = "Violates \"no inference\" rule")]
    ViolatesNoInference,
    #[serde(rename = "Poor handling of distributed documentation")]
    DistributedDocumentation,
    #[serde(rename = "Response Rules unclear/incomplete")]
    ResponseRulesUnclear,
    #[serde(rename = "Exclusions incomplete/contradictory")]
    ExclusionsIncomplete,
    #[serde(rename = "Keywords too narrow or too broad")]
    KeywordsScope,
    #[serde(rename = "Structure non-compliant (7 sections)")]
    StructureNonCompliant,
    #[serde(rename = "Clinical accuracy concern")]
    ClinicalAccuracy,
    #[serde(rename = "Needs optional context capture (e.g., acuity/cause flagging)")]
    OptionalContext,
}

impl IssueType {
    pub const ALL: [IssueType; 13] = [
        IssueType::MissedExtraction,
        IssueType::OverExtraction,
        IssueType::Misinterpretation,
        IssueType::RigidPhrasing,
        IssueType::PermissivePhrasing,
        IssueType::ViolatesNoInference,
        IssueType::DistributedDocumentation,
        IssueType::ResponseRulesUnclear,
        IssueType::ExclusionsIncomplete,
        IssueType::KeywordsScope,
        IssueType::StructureNonCompliant,
        IssueType::ClinicalAccuracy,
        IssueType::OptionalContext,
    ];

    /// Full label, as stored and as shown to reviewers.
    pub fn label(&self) -> &'static str {
        match self {
            IssueType::MissedExtraction => "Missed extraction (valid documentation not captured)",
            IssueType::OverExtraction => "Over-extraction / hallucinated info",
            IssueType::Misinterpretation => "Misinterpretation of the medical record",
            IssueType::RigidPhrasing => "Overly rigid phrasing (misses synonyms/abbreviations)",
            IssueType::PermissivePhrasing => "Overly permissive phrasing (false positives)",
            IssueType::ViolatesNoInference => "Violates \"no inference\" rule",
            IssueType::DistributedDocumentation => "Poor handling of distributed documentation",
            IssueType::ResponseRulesUnclear => "Response Rules unclear/incomplete",
            IssueType::ExclusionsIncomplete => "Exclusions incomplete/contradictory",
            IssueType::KeywordsScope => "Keywords too narrow or too broad",
            IssueType::StructureNonCompliant => "Structure non-compliant (7 sections)",
            IssueType::ClinicalAccuracy => "Clinical accuracy concern",
            IssueType::OptionalContext => {
                "Needs optional context capture (e.g., acuity/cause flagging)"
            }
        }
    }

    /// Short command-line name.
    pub fn slug(&self) -> &'static str {
        match self {
            IssueType::MissedExtraction => "missed-extraction",
            IssueType::OverExtraction => "over-extraction",
            IssueType::Misinterpretation => "misinterpretation",
            IssueType::RigidPhrasing => "rigid-phrasing",
            IssueType::PermissivePhrasing => "permissive-phrasing",
            IssueType::ViolatesNoInference => "no-inference",
            IssueType::DistributedDocumentation => "distributed-docs",
            IssueType::ResponseRulesUnclear => "response-rules",
            IssueType::ExclusionsIncomplete => "exclusions",
            IssueType::KeywordsScope => "keywords",
            IssueType::StructureNonCompliant => "structure",
            IssueType::ClinicalAccuracy => "clinical-accuracy",
            IssueType::OptionalContext => "optional-context",
        }
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for IssueType {
    type Err = StorageError;

    /// Accepts either the full label or the slug (case-insensitive).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let needle = s.trim();
        IssueType::ALL
            .into_iter()
            .find(|t| t.label() == needle || t.slug().eq_ignore_ascii_case(needle))
            .ok_or_else(|| StorageError::InvalidValue {
                field: "issue type".to_string(),
                value: s.to_string(),
            })
    }
}

/// Issue status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueStatus {
    Open,
    Resolved,
    Dismissed,
}

/// An issue reported against a criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub issue_id: Uuid,
    pub criterion_id: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub status: IssueStatus,
    pub notes: Option<String>,
    pub proposed_fix: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}

impl IssueRecord {
    /// A new Open issue.
    pub fn new(criterion_id: &str, issue_type: IssueType, created_by: &str) -> Self {
        Self {
            issue_id: Uuid::new_v4(),
            criterion_id: criterion_id.to_string(),
            issue_type,
            status: IssueStatus::Open,
            notes: None,
            proposed_fix: None,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            resolved_at: None,
            resolved_by: None,
        }
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn with_proposed_fix(mut self, proposed_fix: Option<String>) -> Self {
        self.proposed_fix = proposed_fix;
        self
    }
}

/// Issue persistence.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn create_issue(&self, issue: IssueRecord) -> StorageResult<IssueRecord>;

    /// Fails with `IssueNotFound` if absent.
    async fn get_issue(&self, issue_id: &Uuid) -> StorageResult<IssueRecord>;

    /// Replace an existing issue. Fails with `IssueNotFound` if absent.
    async fn put_issue(&self, issue: IssueRecord) -> StorageResult<IssueRecord>;

    /// Issues for a criterion, oldest first.
    async fn list_issues(&self, criterion_id: &str) -> StorageResult<Vec<IssueRecord>>;
}

// ---------------------------------------------------------------------------
// AI runs
// ---------------------------------------------------------------------------

/// Audit record of one regeneration attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiRunRecord {
    pub run_id: Uuid,
    pub criterion_id: String,
    /// Regeneration mode label (e.g. "Targeted Edit")
    pub mode: String,
    pub input_context: serde_json::Value,
    pub agent_output: serde_json::Value,
    pub lint_result: LintVerdict,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only regeneration audit log.
#[async_trait]
pub trait AiRunLedger: Send + Sync {
    async fn append_run(&self, run: AiRunRecord) -> StorageResult<()>;

    /// Fails with `RunNotFound` if absent.
    async fn get_run(&self, run_id: &Uuid) -> StorageResult<AiRunRecord>;

    /// Runs for a criterion, newest first.
    async fn list_runs(&self, criterion_id: &str) -> StorageResult<Vec<AiRunRecord>>;
}

// ---------------------------------------------------------------------------
// Standalone problem statements
// ---------------------------------------------------------------------------

/// A problem statement kept outside any criterion (generate & search flow)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRecord {
    pub id: Uuid,
    pub criterion_id: String,
    #[serde(rename = "problem_statement_json")]
    pub problem_statement: ProblemStatement,
    /// Free text the statement was generated from
    pub original_input: String,
    pub selected_issues: Vec<String>,
    pub additional_context: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StatementRecord {
    pub fn new(criterion_id: &str, problem_statement: ProblemStatement) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            criterion_id: criterion_id.to_string(),
            problem_statement,
            original_input: String::new(),
            selected_issues: Vec::new(),
            additional_context: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Standalone statement persistence.
#[async_trait]
pub trait StatementStore: Send + Sync {
    async fn create_statement(&self, record: StatementRecord) -> StorageResult<StatementRecord>;

    /// Fails with `StatementNotFound` if absent.
    async fn get_statement(&self, id: &Uuid) -> StorageResult<StatementRecord>;

    /// Replace an existing record. Fails with `StatementNotFound` if absent.
    async fn put_statement(&self, record: StatementRecord) -> StorageResult<StatementRecord>;

    /// Remove a record. Fails with `StatementNotFound` if absent.
    async fn delete_statement(&self, id: &Uuid) -> StorageResult<()>;

    /// Records for a criterion id (exact match), newest first.
    async fn list_statements(&self, criterion_id: &str) -> StorageResult<Vec<StatementRecord>>;
}

// ---------------------------------------------------------------------------
// Umbrella
// ---------------------------------------------------------------------------

/// Everything a full backend provides.
pub trait CriteriaStore:
    CriterionStore + SnapshotLog + IssueTracker + AiRunLedger + StatementStore
{
}

impl<T> CriteriaStore for T where
    T: CriterionStore + SnapshotLog + IssueTracker + AiRunLedger + StatementStore
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_rejects_non_hex() {
        let err = ContentDigest::try_from("xyz".to_string()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidDigest { .. }));
    }

    #[test]
    fn digest_serde_validates() {
        let bad = serde_json::from_str::<ContentDigest>("\"not-a-digest\"");
        assert!(bad.is_err());

        let d = ContentDigest::from_bytes(b"abc");
        let json = serde_json::to_string(&d).unwrap();
        let back: ContentDigest = serde_json::from_str(&json).unwrap();
        assert_eq!(d, back);
    }

    #[test]
    fn equal_documents_share_a_digest() {
        let a = ProblemStatement {
            problem_statement: "same".into(),
            ..Default::default()
        };
        let mut b = a.clone();
        assert_eq!(ContentDigest::of_document(&a), ContentDigest::of_document(&b));
        b.global_rules.push("changed".into());
        assert_ne!(ContentDigest::of_document(&a), ContentDigest::of_document(&b));
    }

    #[test]
    fn issue_type_parses_label_and_slug() {
        for t in IssueType::ALL {
            assert_eq!(t.label().parse::<IssueType>().unwrap(), t);
            assert_eq!(t.slug().to_uppercase().parse::<IssueType>().unwrap(), t);
        }
        assert!("nonsense".parse::<IssueType>().is_err());
    }

    #[test]
    fn issue_type_serializes_as_label() {
        let json = serde_json::to_string(&IssueType::ViolatesNoInference).unwrap();
        assert_eq!(json, r#""Violates \"no inference\" rule""#);
    }

    #[test]
    fn criterion_status_parses_case_insensitively() {
        assert_eq!(
            "published".parse::<CriterionStatus>().unwrap(),
            CriterionStatus::Published
        );
        assert!("archived".parse::<CriterionStatus>().is_err());
    }

    #[test]
    fn deprecated_is_terminal() {
        for t in [
            Transition::Update,
            Transition::Publish,
            Transition::Rollback,
            Transition::Deprecate,
        ] {
            assert!(CriterionStatus::Draft.allows(t));
            assert!(CriterionStatus::Published.allows(t));
            assert!(!CriterionStatus::Deprecated.allows(t));
        }
    }

    #[test]
    fn new_criterion_is_draft_v1() {
        let c = CriterionRecord::new("C-1", "Title", "alice", ProblemStatement::default());
        assert_eq!(c.status, CriterionStatus::Draft);
        assert_eq!(c.version_number, 1);
        assert_eq!(c.created_at, c.updated_at);
    }
}
