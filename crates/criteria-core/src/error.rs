//! Domain-level error taxonomy for Criteria Studio.

use criteria_doc::SchemaError;
use criteria_regen::GenerationError;
use criteria_state::{CriterionStatus, StorageError, Transition};

/// Criteria Studio domain errors.
#[derive(Debug, thiserror::Error)]
pub enum CriteriaError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("document failed schema validation: {0}")]
    Schema(#[from] SchemaError),

    #[error("cannot {} criterion {criterion_id}: status is {status}", .transition.as_str())]
    InvalidTransition {
        criterion_id: String,
        status: CriterionStatus,
        transition: Transition,
    },

    #[error("no earlier published version of {criterion_id} differs from its current content")]
    NoPriorSnapshot { criterion_id: String },

    #[error("issue {issue_id} is not open")]
    IssueNotOpen { issue_id: uuid::Uuid },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("regeneration failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CriteriaError {
    /// True when the error reports a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CriteriaError::Storage(
                StorageError::CriterionNotFound { .. }
                    | StorageError::SnapshotNotFound { .. }
                    | StorageError::IssueNotFound { .. }
                    | StorageError::RunNotFound { .. }
                    | StorageError::StatementNotFound { .. }
            )
        )
    }
}

/// Result type for Criteria Studio domain operations.
pub type Result<T> = std::result::Result<T, CriteriaError>;

/// Reject blank required text, returning it trimmed.
pub(crate) fn require_text<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CriteriaError::InvalidInput(format!("{field} is required")));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_error_names_operation_and_status() {
        let err = CriteriaError::InvalidTransition {
            criterion_id: "C-1".to_string(),
            status: CriterionStatus::Deprecated,
            transition: Transition::Publish,
        };
        assert_eq!(
            err.to_string(),
            "cannot publish criterion C-1: status is Deprecated"
        );
    }

    #[test]
    fn not_found_is_detected_through_storage() {
        let err: CriteriaError = StorageError::CriterionNotFound {
            criterion_id: "X".to_string(),
        }
        .into();
        assert!(err.is_not_found());
        assert!(!CriteriaError::InvalidInput("x".to_string()).is_not_found());
    }

    #[test]
    fn require_text_trims_and_rejects_blank() {
        assert_eq!(require_text("title", "  Sepsis ").unwrap(), "Sepsis");
        let err = require_text("change reason", "   ").unwrap_err();
        assert_eq!(err.to_string(), "invalid input: change reason is required");
    }
}
