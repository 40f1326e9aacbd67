use criteria_doc::{Keywords, ProblemStatement, ResponseRules};

use crate::criteria::NewCriterion;

/// A document with no lint failures or warnings.
pub fn compliant_doc() -> ProblemStatement {
    ProblemStatement {
        problem_statement: "Confirm acute kidney injury is documented in the current encounter \
                            by clinician-authored notes. Do not infer from creatinine values."
            .to_string(),
        what_qualifies: vec!["Explicit AKI diagnosis".to_string()],
        exclusions: vec!["Chronic kidney disease alone".to_string()],
        record_review_priority: vec!["Nephrology consult".to_string()],
        response_rules: ResponseRules {
            yes: "Return YES when AKI is documented".to_string(),
            maybe: "Return MAYBE when renal injury is vague".to_string(),
            no: "Return NO when AKI is not mentioned".to_string(),
        },
        keywords: Keywords {
            include: vec!["AKI".into(), "acute kidney injury".into(), "acute renal failure".into()],
            exclude: vec!["CKD".into(), "ESRD".into()],
        },
        global_rules: vec!["Distributed documentation across notes is allowed".to_string()],
    }
}

pub fn new_criterion(id: &str) -> NewCriterion {
    NewCriterion {
        criterion_id: id.to_string(),
        title: "Acute kidney injury".to_string(),
        author: "alice".to_string(),
        problem_statement: compliant_doc(),
        linked_policy_id: None,
        linked_criteria_ids: vec![],
    }
}
