//! Policy lint engine.
//!
//! Evaluates a [`ProblemStatement`] against a [`LintRuleSet`] and produces a
//! [`LintVerdict`]: blocking failures plus advisory warnings. The same verdict
//! gates publication and drives live editor feedback, so the rule identifiers
//! and field names are a stable external contract.
//!
//! Rules are a flat checklist. Every rule runs regardless of what earlier
//! rules found, so one pass reports every violation.

use serde::{Deserialize, Serialize};

use crate::document::{ProblemStatement, Section};

// ---------------------------------------------------------------------------
// Phrase tables
// ---------------------------------------------------------------------------

const CURRENT_ENCOUNTER_PHRASES: &[&str] = &["current encounter", "current-encounter"];

const CLINICIAN_AUTHORED_PHRASES: &[&str] = &["clinician-authored", "clinician authored"];

const NO_INFERENCE_PHRASES: &[&str] = &["no inference", "do not infer", "without inference"];

/// Phrases accepted inside a single global rule entry.
const NO_INFERENCE_RULE_PHRASES: &[&str] = &["no inference", "do not infer"];

const SINGLE_NOTE_PHRASES: &[&str] = &[
    "must be in one note",
    "single note",
    "same note",
    "in the same documentation",
];

const EXACT_WORDING_PHRASES: &[&str] = &[
    "must say",
    "must state exactly",
    "exact wording",
    "must use the phrase",
];

/// Minimum trimmed length of a meaningful Maybe rule.
pub const MIN_MAYBE_CHARS: usize = 5;
/// Include-keyword count below which a warning is raised.
pub const MIN_INCLUDE_KEYWORDS: usize = 3;
/// Exclude-keyword count below which a warning is raised.
pub const MIN_EXCLUDE_KEYWORDS: usize = 2;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Whether a rule blocks publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Failure,
    Warning,
}

/// A single lint rule. Serialized names are the external rule identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LintRule {
    /// Narrative, qualifying conditions, response rules and keywords present.
    RequiredSection,
    /// Document mentions the current encounter.
    CurrentEncounter,
    /// Document restricts evidence to clinician-authored documentation.
    ClinicianAuthored,
    /// Document forbids inference from raw data.
    NoInference,
    /// Maybe response rule carries a meaningful definition.
    MaybeRequired,
    KeywordsSparse,
    ExcludeKeywordsSparse,
    ExclusionsEmpty,
    PriorityEmpty,
    /// Language forbids documentation distributed across notes.
    DistributedDocs,
    /// Language demands exact wording and will miss synonyms.
    OverSpecific,
}

impl LintRule {
    pub fn severity(&self) -> Severity {
        match self {
            LintRule::RequiredSection
            | LintRule::CurrentEncounter
            | LintRule::ClinicianAuthored
            | LintRule::NoInference
            | LintRule::MaybeRequired => Severity::Failure,
            LintRule::KeywordsSparse
            | LintRule::ExcludeKeywordsSparse
            | LintRule::ExclusionsEmpty
            | LintRule::PriorityEmpty
            | LintRule::DistributedDocs
            | LintRule::OverSpecific => Severity::Warning,
        }
    }

    /// External identifier, e.g. `"CURRENT_ENCOUNTER"`.
    pub fn id(&self) -> &'static str {
        match self {
            LintRule::RequiredSection => "REQUIRED_SECTION",
            LintRule::CurrentEncounter => "CURRENT_ENCOUNTER",
            LintRule::ClinicianAuthored => "CLINICIAN_AUTHORED",
            LintRule::NoInference => "NO_INFERENCE",
            LintRule::MaybeRequired => "MAYBE_REQUIRED",
            LintRule::KeywordsSparse => "KEYWORDS_SPARSE",
            LintRule::ExcludeKeywordsSparse => "EXCLUDE_KEYWORDS_SPARSE",
            LintRule::ExclusionsEmpty => "EXCLUSIONS_EMPTY",
            LintRule::PriorityEmpty => "PRIORITY_EMPTY",
            LintRule::DistributedDocs => "DISTRIBUTED_DOCS",
            LintRule::OverSpecific => "OVER_SPECIFIC",
        }
    }

    fn check(&self, ctx: &LintContext<'_>) -> Vec<LintFinding> {
        let doc = ctx.doc;
        match self {
            LintRule::RequiredSection => {
                let mut found = Vec::new();
                if doc.problem_statement.trim().is_empty() {
                    found.push(self.finding(
                        "Problem Statement section is required",
                        Section::ProblemStatement,
                    ));
                }
                if doc.what_qualifies.is_empty() {
                    found.push(
                        self.finding("What Qualifies section is required", Section::WhatQualifies),
                    );
                }
                let rules = &doc.response_rules;
                if [&rules.yes, &rules.maybe, &rules.no]
                    .iter()
                    .any(|text| text.trim().is_empty())
                {
                    found.push(self.finding(
                        "Response Rules must include Yes, Maybe, and No",
                        Section::ResponseRules,
                    ));
                }
                if doc.keywords.include.is_empty() && doc.keywords.exclude.is_empty() {
                    found.push(self.finding("Keywords section is required", Section::Keywords));
                }
                found
            }

            LintRule::CurrentEncounter => ctx
                .lacks(CURRENT_ENCOUNTER_PHRASES)
                .then(|| {
                    self.finding(
                        "Must mention \"current encounter\" somewhere in the problem statement",
                        Section::ProblemStatement,
                    )
                })
                .into_iter()
                .collect(),

            LintRule::ClinicianAuthored => ctx
                .lacks(CLINICIAN_AUTHORED_PHRASES)
                .then(|| {
                    self.finding(
                        "Must mention \"clinician-authored\" documentation",
                        Section::ProblemStatement,
                    )
                })
                .into_iter()
                .collect(),

            LintRule::NoInference => {
                let in_global_rules = doc.global_rules.iter().any(|rule| {
                    let rule = rule.to_lowercase();
                    NO_INFERENCE_RULE_PHRASES.iter().any(|p| rule.contains(p))
                });
                if ctx.mentions(NO_INFERENCE_PHRASES) || in_global_rules {
                    Vec::new()
                } else {
                    vec![self.finding(
                        "Must include a \"no inference from raw data\" rule in Problem Statement or Global Rules",
                        Section::GlobalRules,
                    )]
                }
            }

            LintRule::MaybeRequired => {
                if doc.response_rules.maybe.trim().chars().count() < MIN_MAYBE_CHARS {
                    vec![self.finding(
                        "Response Rules must include a meaningful Maybe definition",
                        Section::ResponseRules,
                    )]
                } else {
                    Vec::new()
                }
            }

            LintRule::KeywordsSparse => {
                if doc.keywords.include.len() < MIN_INCLUDE_KEYWORDS {
                    vec![self.finding(
                        "Include keywords list has fewer than 3 items",
                        Section::Keywords,
                    )]
                } else {
                    Vec::new()
                }
            }

            LintRule::ExcludeKeywordsSparse => {
                if doc.keywords.exclude.len() < MIN_EXCLUDE_KEYWORDS {
                    vec![self.finding(
                        "Exclude keywords list has fewer than 2 items",
                        Section::Keywords,
                    )]
                } else {
                    Vec::new()
                }
            }

            LintRule::ExclusionsEmpty => {
                if doc.exclusions.is_empty() {
                    vec![self.finding(
                        "Exclusions list is empty - consider adding common exclusions",
                        Section::Exclusions,
                    )]
                } else {
                    Vec::new()
                }
            }

            LintRule::PriorityEmpty => {
                if doc.record_review_priority.is_empty() {
                    vec![self.finding(
                        "Record Review Priority is empty - consider prioritizing documentation types",
                        Section::RecordReviewPriority,
                    )]
                } else {
                    Vec::new()
                }
            }

            LintRule::DistributedDocs => {
                if ctx.mentions(SINGLE_NOTE_PHRASES) {
                    vec![self.finding(
                        "Language appears to forbid distributed documentation across multiple notes",
                        Section::ProblemStatement,
                    )]
                } else {
                    Vec::new()
                }
            }

            LintRule::OverSpecific => {
                if ctx.mentions(EXACT_WORDING_PHRASES) {
                    vec![self.finding(
                        "Language appears overly specific - may miss synonyms and abbreviations",
                        Section::ProblemStatement,
                    )]
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn finding(&self, message: &str, section: Section) -> LintFinding {
        LintFinding {
            rule: *self,
            message: message.to_string(),
            section: Some(section),
        }
    }
}

impl std::fmt::Display for LintRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// An ordered list of rules to evaluate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintRuleSet {
    pub rules: Vec<LintRule>,
}

impl LintRuleSet {
    /// The publication policy: every rule, failures first.
    pub fn standard() -> Self {
        Self {
            rules: vec![
                LintRule::RequiredSection,
                LintRule::CurrentEncounter,
                LintRule::ClinicianAuthored,
                LintRule::NoInference,
                LintRule::MaybeRequired,
                LintRule::KeywordsSparse,
                LintRule::ExcludeKeywordsSparse,
                LintRule::ExclusionsEmpty,
                LintRule::PriorityEmpty,
                LintRule::DistributedDocs,
                LintRule::OverSpecific,
            ],
        }
    }

    /// Append a rule.
    pub fn with_rule(mut self, rule: LintRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Evaluate every rule against `doc`.
    pub fn evaluate(&self, doc: &ProblemStatement) -> LintVerdict {
        let ctx = LintContext::new(doc);
        let mut failures = Vec::new();
        let mut warnings = Vec::new();

        for rule in &self.rules {
            let found = rule.check(&ctx);
            match rule.severity() {
                Severity::Failure => failures.extend(found),
                Severity::Warning => warnings.extend(found),
            }
        }

        LintVerdict {
            passed: failures.is_empty(),
            failures,
            warnings,
        }
    }
}

impl Default for LintRuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

/// Per-evaluation state shared by every rule.
struct LintContext<'a> {
    doc: &'a ProblemStatement,
    text: String,
}

impl<'a> LintContext<'a> {
    fn new(doc: &'a ProblemStatement) -> Self {
        Self {
            doc,
            text: doc.searchable_text(),
        }
    }

    fn mentions(&self, phrases: &[&str]) -> bool {
        phrases.iter().any(|p| self.text.contains(p))
    }

    fn lacks(&self, phrases: &[&str]) -> bool {
        !self.mentions(phrases)
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// One failure or warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintFinding {
    pub rule: LintRule,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<Section>,
}

/// Result of linting one document.
///
/// `passed` is true iff `failures` is empty; warnings never affect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintVerdict {
    pub passed: bool,
    pub failures: Vec<LintFinding>,
    pub warnings: Vec<LintFinding>,
}

impl LintVerdict {
    /// Whether any finding (failure or warning) was raised for `rule`.
    pub fn has(&self, rule: LintRule) -> bool {
        self.failures
            .iter()
            .chain(self.warnings.iter())
            .any(|f| f.rule == rule)
    }

    /// Number of findings raised for `rule`.
    pub fn count(&self, rule: LintRule) -> usize {
        self.failures
            .iter()
            .chain(self.warnings.iter())
            .filter(|f| f.rule == rule)
            .count()
    }
}

/// Lint a document against the standard rule set.
pub fn lint(doc: &ProblemStatement) -> LintVerdict {
    LintRuleSet::standard().evaluate(doc)
}
