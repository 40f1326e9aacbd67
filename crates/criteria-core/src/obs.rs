//! Structured observability hooks for criterion lifecycle events.
//!
//! Every event is an `info!` (or `warn!`) record with an `event` field, so
//! JSON log pipelines can filter on it directly.

use criteria_doc::LintVerdict;
use tracing::{info, warn};

/// Emit event: a document was linted.
pub fn emit_lint_evaluated(criterion_id: &str, verdict: &LintVerdict) {
    info!(
        event = "lint.evaluated",
        criterion_id = %criterion_id,
        passed = verdict.passed,
        failures = verdict.failures.len(),
        warnings = verdict.warnings.len(),
    );
}

/// Emit event: publish went through. `overridden` is true when lint failed.
pub fn emit_criterion_published(criterion_id: &str, version: u32, overridden: bool) {
    info!(
        event = "criterion.published",
        criterion_id = %criterion_id,
        version = version,
        lint_overridden = overridden,
    );
}

/// Emit event: publish blocked by lint failures.
pub fn emit_publish_rejected(criterion_id: &str, verdict: &LintVerdict) {
    let rules: Vec<&str> = verdict.failures.iter().map(|f| f.rule.id()).collect();
    warn!(
        event = "criterion.publish_rejected",
        criterion_id = %criterion_id,
        failed_rules = ?rules,
    );
}

/// Emit event: content restored from an earlier snapshot.
pub fn emit_criterion_rolled_back(criterion_id: &str, restored_from: u32, new_version: u32) {
    info!(
        event = "criterion.rolled_back",
        criterion_id = %criterion_id,
        restored_from = restored_from,
        version = new_version,
    );
}

pub fn emit_criterion_deprecated(criterion_id: &str, version: u32) {
    info!(event = "criterion.deprecated", criterion_id = %criterion_id, version = version);
}

/// Emit event: a regeneration produced a recorded candidate.
pub fn emit_regeneration_completed(criterion_id: &str, run_id: &str, mode: &str, passed: bool) {
    info!(
        event = "regeneration.completed",
        criterion_id = %criterion_id,
        run_id = %run_id,
        mode = %mode,
        lint_passed = passed,
    );
}

/// Emit event: regeneration failed (warning level).
pub fn emit_regeneration_failed(criterion_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "regeneration.failed", criterion_id = %criterion_id, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use criteria_doc::{lint, ProblemStatement};

    #[test]
    fn emitters_do_not_panic_without_subscriber() {
        let verdict = lint(&ProblemStatement::default());
        emit_lint_evaluated("C-1", &verdict);
        emit_publish_rejected("C-1", &verdict);
        emit_criterion_published("C-1", 2, true);
        emit_criterion_rolled_back("C-1", 2, 4);
        emit_criterion_deprecated("C-1", 4);
        emit_regeneration_completed("C-1", "run-1", "Targeted Edit", false);
        emit_regeneration_failed("C-1", &"model unavailable");
    }
}
