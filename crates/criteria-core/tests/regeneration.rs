use std::sync::Arc;

use criteria_core::{
    CriteriaError, CriteriaService, IssueService, LintRule, NewCriterion, NewIssue,
    RegenerationService, MAX_RATIONALE_CHARS,
};
use criteria_doc::{Keywords, ProblemStatement, ResponseRules};
use criteria_regen::fakes::ScriptedGenerator;
use criteria_regen::{GenerationError, RegenerateRequest, RegenerationMode};
use criteria_state::fakes::MemoryCriteriaStore;
use criteria_state::IssueType;
use serde_json::json;

fn current() -> ProblemStatement {
    ProblemStatement {
        problem_statement: "Confirm heart failure exacerbation is documented in the current \
                            encounter by clinician-authored notes. Do not infer from BNP alone."
            .to_string(),
        what_qualifies: vec!["Acute on chronic heart failure".to_string()],
        exclusions: vec!["Compensated chronic heart failure".to_string()],
        record_review_priority: vec!["Cardiology consult".to_string()],
        response_rules: ResponseRules {
            yes: "Return YES when exacerbation is documented".to_string(),
            maybe: "Return MAYBE when volume status is unclear".to_string(),
            no: "Return NO when no exacerbation is documented".to_string(),
        },
        keywords: Keywords {
            include: vec!["CHF exacerbation".into(), "ADHF".into(), "decompensated HF".into()],
            exclude: vec!["stable CHF".into(), "history of CHF".into()],
        },
        global_rules: vec![],
    }
}

struct Fixture {
    store: Arc<MemoryCriteriaStore>,
    generator: Arc<ScriptedGenerator>,
    criteria: CriteriaService<MemoryCriteriaStore>,
    regen: RegenerationService<MemoryCriteriaStore>,
}

async fn fixture() -> Fixture {
    let store = Arc::new(MemoryCriteriaStore::new());
    let generator = Arc::new(ScriptedGenerator::new());
    let criteria = CriteriaService::new(store.clone());
    criteria
        .create(NewCriterion {
            criterion_id: "HF-001".to_string(),
            title: "Heart failure exacerbation".to_string(),
            author: "alice".to_string(),
            problem_statement: current(),
            linked_policy_id: Some("POL-9".to_string()),
            linked_criteria_ids: vec![],
        })
        .await
        .unwrap();
    let regen = RegenerationService::new(store.clone(), generator.clone());
    Fixture {
        store,
        generator,
        criteria,
        regen,
    }
}

fn request() -> RegenerateRequest {
    RegenerateRequest::new("HF-001", current())
        .with_developer_notes("tighten exclusions")
        .with_mode(RegenerationMode::TargetedEdit)
}

#[tokio::test]
async fn valid_draft_is_recorded_and_criterion_untouched() {
    let f = fixture().await;
    let before = f.criteria.get("HF-001").await.unwrap();

    let mut candidate = current();
    candidate.exclusions.push("Isolated diastolic dysfunction".to_string());
    f.generator
        .push_draft(serde_json::to_value(&candidate).unwrap(), &"x".repeat(900));

    let outcome = f.regen.regenerate(request(), "carol").await.unwrap();
    assert_eq!(outcome.problem_statement_json, candidate);
    assert_eq!(outcome.edit_rationale.chars().count(), MAX_RATIONALE_CHARS);
    assert!(outcome.lint_result.passed);

    let run = f.regen.run(&outcome.run_id).await.unwrap();
    assert_eq!(run.criterion_id, "HF-001");
    assert_eq!(run.mode, "Targeted Edit");
    assert_eq!(run.created_by, "carol");
    assert_eq!(run.input_context["developer_notes"], json!("tighten exclusions"));
    assert_eq!(
        run.agent_output["edit_rationale"].as_str().unwrap().chars().count(),
        MAX_RATIONALE_CHARS
    );
    assert_eq!(run.lint_result, outcome.lint_result);

    assert_eq!(f.criteria.get("HF-001").await.unwrap(), before);
}

#[tokio::test]
async fn lint_failures_are_recorded_not_rejected() {
    let f = fixture().await;
    let mut candidate = current();
    candidate.problem_statement = candidate
        .problem_statement
        .replace("current encounter", "admission");
    f.generator
        .push_draft(serde_json::to_value(&candidate).unwrap(), "dropped wording");

    let outcome = f.regen.regenerate(request(), "carol").await.unwrap();
    assert!(!outcome.lint_result.passed);
    assert!(outcome.lint_result.has(LintRule::CurrentEncounter));
    assert_eq!(f.regen.runs("HF-001").await.unwrap().len(), 1);
}

#[tokio::test]
async fn schema_violation_records_nothing() {
    let f = fixture().await;
    let mut bad = serde_json::to_value(current()).unwrap();
    bad["response_rules"]["maybe"] = json!("short");
    f.generator.push_draft(bad, "oops");
    f.generator
        .push_draft(json!({ "problem_statement": 42 }), "wrong shape");

    for _ in 0..2 {
        let err = f.regen.regenerate(request(), "carol").await.unwrap_err();
        assert!(matches!(
            err,
            CriteriaError::Generation(GenerationError::SchemaViolation(_))
        ));
    }
    assert!(f.regen.runs("HF-001").await.unwrap().is_empty());
}

#[tokio::test]
async fn generator_failure_surfaces_and_records_nothing() {
    let f = fixture().await;
    f.generator.push_error(GenerationError::Api {
        status: 500,
        message: "upstream".to_string(),
    });

    let err = f.regen.regenerate(request(), "carol").await.unwrap_err();
    assert!(matches!(
        err,
        CriteriaError::Generation(GenerationError::Api { status: 500, .. })
    ));
    assert!(f.regen.runs("HF-001").await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_criterion_never_reaches_generator() {
    let f = fixture().await;
    let req = RegenerateRequest::new("NOPE", current());
    let err = f.regen.regenerate(req, "carol").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(f.generator.calls().is_empty());
}

#[tokio::test]
async fn open_issues_flow_into_the_request() {
    let f = fixture().await;
    let issues = IssueService::new(f.store.clone());
    issues
        .report(
            "HF-001",
            NewIssue {
                issue_type: IssueType::ExclusionsIncomplete,
                notes: Some("misses diastolic".to_string()),
                proposed_fix: None,
                created_by: "dave".to_string(),
            },
        )
        .await
        .unwrap();

    let context = issues.open_issue_context("HF-001").await.unwrap();
    f.generator
        .push_draft(serde_json::to_value(current()).unwrap(), "no change");
    f.regen
        .regenerate(
            request()
                .with_issues(context)
                .with_mode(RegenerationMode::FullRewrite),
            "carol",
        )
        .await
        .unwrap();

    let calls = f.generator.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].issues.len(), 1);
    assert_eq!(calls[0].issues[0].issue_type, IssueType::ExclusionsIncomplete.label());

    let runs = f.regen.runs("HF-001").await.unwrap();
    assert_eq!(runs[0].mode, "Full Rewrite");
    assert_eq!(runs[0].input_context["issues"][0]["notes"], json!("misses diastolic"));
}
