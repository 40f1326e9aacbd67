//! Criteria-Doc: the problem statement document and its two gates
//!
//! - `document`: the seven-section [`ProblemStatement`]
//! - `schema`: structural write gate (runs before anything is stored)
//! - `lint`: policy checklist (runs before anything is published)
//!
//! Both gates are pure functions with no I/O.

pub mod document;
pub mod lint;
pub mod schema;

pub use document::{Keywords, ProblemStatement, ResponseRules, Section};
pub use lint::{lint, LintFinding, LintRule, LintRuleSet, LintVerdict, Severity};
pub use schema::{validate, SchemaError, SchemaViolation};
