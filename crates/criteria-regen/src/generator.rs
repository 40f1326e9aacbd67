//! The generator seam: request/response types and the `Generator` trait

use async_trait::async_trait;
use criteria_doc::ProblemStatement;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// How far the generator may depart from the current document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RegenerationMode {
    /// Fix the listed issues, leave other sections alone
    #[default]
    #[serde(rename = "Targeted Edit")]
    TargetedEdit,
    /// Rewrite the whole document
    #[serde(rename = "Full Rewrite")]
    FullRewrite,
}

impl RegenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegenerationMode::TargetedEdit => "Targeted Edit",
            RegenerationMode::FullRewrite => "Full Rewrite",
        }
    }
}

impl std::fmt::Display for RegenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RegenerationMode {
    type Err = GenerationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "targeted edit" | "targeted" => Ok(RegenerationMode::TargetedEdit),
            "full rewrite" | "full" => Ok(RegenerationMode::FullRewrite),
            _ => Err(GenerationError::InvalidMode(s.to_string())),
        }
    }
}

/// One issue the generator should address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueContext {
    /// Issue-type label
    #[serde(rename = "type")]
    pub issue_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_fix: Option<String>,
}

/// Everything a generator sees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerateRequest {
    pub criterion_id: String,
    pub current_problem_statement_json: ProblemStatement,
    #[serde(default)]
    pub issues: Vec<IssueContext>,
    #[serde(default)]
    pub developer_notes: String,
    #[serde(default)]
    pub mode: RegenerationMode,
}

impl RegenerateRequest {
    pub fn new(criterion_id: &str, current: ProblemStatement) -> Self {
        Self {
            criterion_id: criterion_id.to_string(),
            current_problem_statement_json: current,
            issues: Vec::new(),
            developer_notes: String::new(),
            mode: RegenerationMode::default(),
        }
    }

    pub fn with_issues(mut self, issues: Vec<IssueContext>) -> Self {
        self.issues = issues;
        self
    }

    pub fn with_developer_notes(mut self, notes: impl Into<String>) -> Self {
        self.developer_notes = notes.into();
        self
    }

    pub fn with_mode(mut self, mode: RegenerationMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Raw generator output, not yet validated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDraft {
    pub problem_statement_json: serde_json::Value,
    pub edit_rationale: String,
}

/// Produces a candidate problem statement for a request.
///
/// Implementations make no promises about the candidate's validity; callers
/// validate and lint whatever comes back.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &RegenerateRequest)
        -> Result<GeneratedDraft, GenerationError>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "generator"
    }
}
