use criteria_doc::{
    lint, validate, Keywords, LintRule, ProblemStatement, ResponseRules, Section,
};

/// A document that satisfies every failure and warning rule.
fn compliant() -> ProblemStatement {
    ProblemStatement {
        problem_statement: "Verify that severe sepsis in the current encounter is supported by \
                            clinician-authored documentation. Do not infer sepsis from vital \
                            signs or lab values alone."
            .to_string(),
        what_qualifies: vec!["Explicit mention of severe sepsis".to_string()],
        exclusions: vec!["SIRS without documented infection".to_string()],
        record_review_priority: vec!["Progress notes".to_string()],
        response_rules: ResponseRules {
            yes: "Return YES when severe sepsis is documented".to_string(),
            maybe: "Return MAYBE when terminology is ambiguous".to_string(),
            no: "Return NO when only SIRS is documented".to_string(),
        },
        keywords: Keywords {
            include: vec![
                "severe sepsis".to_string(),
                "septic shock".to_string(),
                "septicemia".to_string(),
            ],
            exclude: vec!["SIRS".to_string(), "rule out sepsis".to_string()],
        },
        global_rules: vec!["Allow distributed documentation across notes".to_string()],
    }
}

// ---- baseline ----

#[test]
fn compliant_document_is_clean() {
    let verdict = lint(&compliant());
    assert!(verdict.passed);
    assert!(verdict.failures.is_empty());
    assert!(verdict.warnings.is_empty(), "{:?}", verdict.warnings);
}

#[test]
fn lint_is_idempotent() {
    let doc = ProblemStatement::default();
    assert_eq!(lint(&doc), lint(&doc));
    let doc = compliant();
    assert_eq!(lint(&doc), lint(&doc));
}

// ---- REQUIRED_SECTION ----

#[test]
fn one_required_section_finding_per_missing_section() {
    let mut doc = compliant();
    doc.problem_statement = "   ".to_string();
    doc.what_qualifies.clear();

    let verdict = lint(&doc);
    assert!(!verdict.passed);
    let sections: Vec<Option<Section>> = verdict
        .failures
        .iter()
        .filter(|f| f.rule == LintRule::RequiredSection)
        .map(|f| f.section)
        .collect();
    assert_eq!(
        sections,
        vec![Some(Section::ProblemStatement), Some(Section::WhatQualifies)]
    );
}

#[test]
fn response_rules_missing_any_branch_is_required_section() {
    let mut doc = compliant();
    doc.response_rules.no.clear();
    let verdict = lint(&doc);
    assert!(verdict
        .failures
        .iter()
        .any(|f| f.rule == LintRule::RequiredSection && f.section == Some(Section::ResponseRules)));
}

#[test]
fn keywords_required_only_when_both_lists_empty() {
    let mut doc = compliant();
    doc.keywords.include.clear();
    let verdict = lint(&doc);
    assert!(!verdict
        .failures
        .iter()
        .any(|f| f.section == Some(Section::Keywords)));

    doc.keywords.exclude.clear();
    let verdict = lint(&doc);
    assert!(verdict
        .failures
        .iter()
        .any(|f| f.rule == LintRule::RequiredSection && f.section == Some(Section::Keywords)));
}

#[test]
fn short_narrative_passes_lint_but_not_schema() {
    let mut doc = compliant();
    doc.problem_statement = "Patient seen.".to_string();
    doc.global_rules = vec![
        "Current encounter only".to_string(),
        "Clinician-authored documentation only".to_string(),
        "Do not infer from raw data".to_string(),
    ];

    let verdict = lint(&doc);
    assert!(!verdict
        .failures
        .iter()
        .any(|f| f.rule == LintRule::RequiredSection));
    assert!(verdict.passed);

    let err = validate(&doc).unwrap_err();
    assert_eq!(err.violations()[0].section, Section::ProblemStatement);
}

// ---- phrase rules ----

#[test]
fn missing_current_encounter_always_fails() {
    let mut doc = compliant();
    doc.problem_statement = doc.problem_statement.replace("current encounter", "visit");
    let verdict = lint(&doc);
    assert!(!verdict.passed);
    assert!(verdict.has(LintRule::CurrentEncounter));
}

#[test]
fn current_encounter_matches_case_insensitively_anywhere() {
    let mut doc = compliant();
    doc.problem_statement = doc.problem_statement.replace("current encounter", "visit");
    doc.exclusions.push("Anything outside the CURRENT-ENCOUNTER".to_string());
    assert!(!lint(&doc).has(LintRule::CurrentEncounter));
}

#[test]
fn clinician_authored_accepts_unhyphenated_variant() {
    let mut doc = compliant();
    doc.problem_statement = doc
        .problem_statement
        .replace("clinician-authored", "Clinician Authored");
    assert!(!lint(&doc).has(LintRule::ClinicianAuthored));

    doc.problem_statement = doc.problem_statement.replace("Clinician Authored", "written");
    assert!(lint(&doc).has(LintRule::ClinicianAuthored));
}

#[test]
fn do_not_infer_in_global_rules_satisfies_no_inference() {
    let mut doc = compliant();
    doc.problem_statement = doc
        .problem_statement
        .replace("Do not infer sepsis", "Sepsis is not derived");
    assert!(lint(&doc).has(LintRule::NoInference));

    doc.global_rules.push("Do NOT infer from orders".to_string());
    let verdict = lint(&doc);
    assert!(!verdict.has(LintRule::NoInference));
    assert!(verdict.passed);
}

#[test]
fn without_inference_anywhere_satisfies_no_inference() {
    let mut doc = compliant();
    doc.problem_statement = doc
        .problem_statement
        .replace("Do not infer sepsis", "Sepsis is read without inference");
    assert!(!lint(&doc).has(LintRule::NoInference));
}

#[test]
fn short_maybe_fails_independently() {
    let mut doc = compliant();
    doc.response_rules.maybe = "  ok  ".to_string();
    let verdict = lint(&doc);
    assert!(verdict.has(LintRule::MaybeRequired));
    assert!(!verdict.has(LintRule::RequiredSection));

    doc.response_rules.maybe.clear();
    let verdict = lint(&doc);
    assert!(verdict.has(LintRule::MaybeRequired));
    assert!(verdict.has(LintRule::RequiredSection));
}

#[test]
fn every_failure_reported_in_one_pass() {
    let verdict = lint(&ProblemStatement::default());
    for rule in [
        LintRule::RequiredSection,
        LintRule::CurrentEncounter,
        LintRule::ClinicianAuthored,
        LintRule::NoInference,
        LintRule::MaybeRequired,
    ] {
        assert!(verdict.has(rule), "missing {rule}");
    }
}

// ---- warnings ----

#[test]
fn warnings_never_change_passed() {
    let mut doc = compliant();
    doc.keywords.include.truncate(1);
    doc.keywords.exclude.truncate(1);
    doc.exclusions.clear();
    doc.record_review_priority.clear();
    doc.global_rules.push("All evidence must be in one note".to_string());

    let verdict = lint(&doc);
    assert!(verdict.failures.is_empty());
    assert_eq!(verdict.warnings.len(), 5);
    assert!(verdict.passed);
}

#[test]
fn over_specific_language_warns() {
    let mut doc = compliant();
    doc.what_qualifies
        .push("Note must state exactly \"severe sepsis\"".to_string());
    let verdict = lint(&doc);
    assert!(verdict.passed);
    let warning = verdict
        .warnings
        .iter()
        .find(|w| w.rule == LintRule::OverSpecific)
        .expect("over-specific warning");
    assert_eq!(warning.section, Some(Section::ProblemStatement));
}

#[test]
fn verdict_json_shape_is_stable() {
    let mut doc = compliant();
    doc.exclusions.clear();
    doc.problem_statement = doc.problem_statement.replace("clinician-authored", "");

    let value = serde_json::to_value(lint(&doc)).unwrap();
    assert_eq!(value["passed"], false);
    assert_eq!(value["failures"][0]["rule"], "CLINICIAN_AUTHORED");
    assert_eq!(value["failures"][0]["section"], "problem_statement");
    assert_eq!(value["warnings"][0]["rule"], "EXCLUSIONS_EMPTY");
    assert_eq!(value["warnings"][0]["section"], "exclusions");
}
