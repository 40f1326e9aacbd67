//! Criteria Studio core library
//!
//! Services over the storage traits in `criteria-state`:
//!
//! - [`CriteriaService`]: create, read, update and lint criteria
//! - [`LifecycleService`]: publish, rollback, deprecate, history
//! - [`IssueService`]: report and close issues
//! - [`RegenerationService`]: generator-backed candidates with an audit trail
//! - [`StatementLibrary`]: standalone problem statements
//!
//! Each service holds an `Arc` of the store so one backend can be shared.

pub mod criteria;
pub mod error;
pub mod issues;
pub mod library;
pub mod lifecycle;
pub mod obs;
pub mod regeneration;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;

pub use criteria::{CriteriaService, CriterionPatch, NewCriterion};
pub use error::{CriteriaError, Result};
pub use issues::{IssueService, NewIssue};
pub use library::{NewStatement, StatementLibrary, StatementPatch};
pub use lifecycle::{
    LifecycleService, PublishOutcome, PublishRequest, RollbackOutcome, RollbackRequest,
    ROLLBACK_PREFIX,
};
pub use obs::{
    emit_criterion_deprecated, emit_criterion_published, emit_criterion_rolled_back,
    emit_lint_evaluated, emit_publish_rejected, emit_regeneration_completed,
    emit_regeneration_failed,
};
pub use regeneration::{RegenerationOutcome, RegenerationService, MAX_RATIONALE_CHARS};
pub use telemetry::init_tracing;

pub use criteria_doc::{lint, LintRule, LintVerdict, ProblemStatement};
pub use criteria_state::{CriteriaStore, CriterionRecord, CriterionSnapshot, CriterionStatus};
