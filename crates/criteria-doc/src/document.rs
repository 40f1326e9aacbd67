//! The seven-section problem statement document.
//!
//! Field names match the stored JSON shape exactly; external callers and the
//! generation collaborator both exchange documents in this form.

use serde::{Deserialize, Serialize};

/// Yes / Maybe / No response rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRules {
    pub yes: String,
    pub maybe: String,
    pub no: String,
}

/// Include / exclude keyword lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keywords {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// A structured problem statement.
///
/// Every field is required on deserialization, even where an empty value is
/// acceptable (exclusions, record review priority, global rules).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemStatement {
    /// Free-text narrative.
    pub problem_statement: String,
    /// Ordered qualifying conditions.
    pub what_qualifies: Vec<String>,
    /// Ordered exclusions.
    pub exclusions: Vec<String>,
    /// Documentation types to review, highest priority first.
    pub record_review_priority: Vec<String>,
    pub response_rules: ResponseRules,
    pub keywords: Keywords,
    /// Rules that apply across every section.
    pub global_rules: Vec<String>,
}

impl ProblemStatement {
    /// Canonical serialized form, used for content digests.
    ///
    /// Struct field order is fixed, so the output is stable for equal documents.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Lower-cased JSON text of the whole document, keys included.
    pub(crate) fn searchable_text(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_default()
            .to_lowercase()
    }
}

/// Addressable document sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    ProblemStatement,
    WhatQualifies,
    Exclusions,
    RecordReviewPriority,
    ResponseRules,
    Keywords,
    GlobalRules,
}

impl Section {
    /// Wire name of the section (the document field name).
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::ProblemStatement => "problem_statement",
            Section::WhatQualifies => "what_qualifies",
            Section::Exclusions => "exclusions",
            Section::RecordReviewPriority => "record_review_priority",
            Section::ResponseRules => "response_rules",
            Section::Keywords => "keywords",
            Section::GlobalRules => "global_rules",
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
