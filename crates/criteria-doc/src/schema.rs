//! Structural write gate for problem statements.
//!
//! This is independent of the lint engine: the schema gate decides whether a
//! document may be stored at all, lint decides whether a stored document may
//! be published. A short narrative such as `"Patient seen."` passes lint's
//! `REQUIRED_SECTION` check but is rejected here.

use serde::{Deserialize, Serialize};

use crate::document::{ProblemStatement, Section};

/// Minimum narrative length in characters.
pub const MIN_NARRATIVE_CHARS: usize = 50;

/// Minimum length of each response rule in characters.
pub const MIN_RESPONSE_RULE_CHARS: usize = 10;

/// One failed schema constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaViolation {
    pub section: Section,
    pub message: String,
}

/// Errors produced by the schema gate.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The value does not have the seven-section shape.
    #[error("malformed problem statement: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The shape is right but one or more constraints failed.
    #[error("invalid problem statement: {}", summarize(.violations))]
    Invalid { violations: Vec<SchemaViolation> },
}

impl SchemaError {
    /// Violations carried by this error (empty for `Malformed`).
    pub fn violations(&self) -> &[SchemaViolation] {
        match self {
            SchemaError::Invalid { violations } => violations,
            SchemaError::Malformed(_) => &[],
        }
    }
}

fn summarize(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.section, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check a document against the write-time constraints.
///
/// Every constraint is checked; all violations are reported together.
pub fn validate(doc: &ProblemStatement) -> Result<(), SchemaError> {
    let mut violations = Vec::new();

    if doc.problem_statement.chars().count() < MIN_NARRATIVE_CHARS {
        violations.push(SchemaViolation {
            section: Section::ProblemStatement,
            message: format!(
                "Problem statement must be at least {} characters",
                MIN_NARRATIVE_CHARS
            ),
        });
    }

    if doc.what_qualifies.is_empty() {
        violations.push(SchemaViolation {
            section: Section::WhatQualifies,
            message: "At least one qualification is required".to_string(),
        });
    }

    let rules = [
        ("Yes", &doc.response_rules.yes),
        ("Maybe", &doc.response_rules.maybe),
        ("No", &doc.response_rules.no),
    ];
    for (label, text) in rules {
        if text.chars().count() < MIN_RESPONSE_RULE_CHARS {
            violations.push(SchemaViolation {
                section: Section::ResponseRules,
                message: format!("{} rule must be defined", label),
            });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::Invalid { violations })
    }
}

impl ProblemStatement {
    /// Parse a JSON value and run the schema gate over the result.
    pub fn from_json(value: serde_json::Value) -> Result<Self, SchemaError> {
        let doc: ProblemStatement = serde_json::from_value(value)?;
        validate(&doc)?;
        Ok(doc)
    }

    /// Run the schema gate over this document.
    pub fn validate(&self) -> Result<(), SchemaError> {
        validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Keywords, ResponseRules};

    fn valid() -> ProblemStatement {
        ProblemStatement {
            problem_statement: "Verify that the diagnosis is documented in the current encounter."
                .to_string(),
            what_qualifies: vec!["Explicit diagnosis".to_string()],
            exclusions: vec![],
            record_review_priority: vec![],
            response_rules: ResponseRules {
                yes: "Return YES when documented".to_string(),
                maybe: "Return MAYBE when unclear".to_string(),
                no: "Return NO when absent".to_string(),
            },
            keywords: Keywords::default(),
            global_rules: vec![],
        }
    }

    #[test]
    fn valid_document_passes() {
        assert!(validate(&valid()).is_ok());
    }

    #[test]
    fn short_narrative_rejected() {
        let mut doc = valid();
        doc.problem_statement = "Patient seen.".to_string();
        let err = validate(&doc).unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.violations()[0].section, Section::ProblemStatement);
    }

    #[test]
    fn narrative_length_counts_characters_not_bytes() {
        let mut doc = valid();
        doc.problem_statement = "é".repeat(MIN_NARRATIVE_CHARS);
        assert!(validate(&doc).is_ok());
    }

    #[test]
    fn all_violations_reported_together() {
        let mut doc = valid();
        doc.problem_statement.clear();
        doc.what_qualifies.clear();
        doc.response_rules.maybe = "short".to_string();
        doc.response_rules.no.clear();

        let err = validate(&doc).unwrap_err();
        let sections: Vec<Section> = err.violations().iter().map(|v| v.section).collect();
        assert_eq!(
            sections,
            vec![
                Section::ProblemStatement,
                Section::WhatQualifies,
                Section::ResponseRules,
                Section::ResponseRules,
            ]
        );
        assert!(err.to_string().contains("Maybe rule must be defined"));
    }

    #[test]
    fn from_json_reports_malformed_shape() {
        let err = ProblemStatement::from_json(serde_json::json!({ "problem_statement": 3 }))
            .unwrap_err();
        assert!(matches!(err, SchemaError::Malformed(_)));
        assert!(err.violations().is_empty());
    }

    #[test]
    fn from_json_applies_constraints() {
        let mut value = serde_json::to_value(valid()).unwrap();
        value["what_qualifies"] = serde_json::json!([]);
        let err = ProblemStatement::from_json(value).unwrap_err();
        assert!(matches!(err, SchemaError::Invalid { .. }));
    }
}
