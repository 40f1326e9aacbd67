//! Prompt text sent to chat-completion models

use crate::error::GenerationError;
use crate::generator::{RegenerateRequest, RegenerationMode};

/// System prompt describing the seven-section output contract.
pub const SYSTEM_PROMPT: &str = r#"You generate healthcare audit Problem Statements in a strict 7-section JSON schema.

Hard rules:
- Use ONLY current-encounter, clinician-authored documentation. Do not infer from raw labs/imaging/vitals/orders unless a clinician explicitly interprets or references them.
- Allow distributed documentation across multiple notes if consistent and not contradicted.
- Include Response Rules with clear Yes / Maybe / No.
- Preserve the 7 sections exactly: problem_statement, what_qualifies, exclusions, record_review_priority, response_rules, keywords{include/exclude}, global_rules.
- No PHI. No clinical inference beyond documented statements. Keep language precise and operational.

Your response must be a single JSON object with:
{
  "problem_statement_json": {
    "problem_statement": "string",
    "what_qualifies": ["string"],
    "exclusions": ["string"],
    "record_review_priority": ["string"],
    "response_rules": {
      "yes": "string",
      "maybe": "string",
      "no": "string"
    },
    "keywords": {
      "include": ["string"],
      "exclude": ["string"]
    },
    "global_rules": ["string"]
  },
  "edit_rationale": "string (max 150 words explaining changes)"
}"#;

/// Render the user message for a request.
pub fn build_user_prompt(request: &RegenerateRequest) -> Result<String, GenerationError> {
    let mut prompt = format!("Mode: {}\n\n", request.mode);

    prompt.push_str("Current Problem Statement:\n");
    prompt.push_str(&serde_json::to_string_pretty(
        &request.current_problem_statement_json,
    )?);
    prompt.push_str("\n\n");

    if !request.issues.is_empty() {
        prompt.push_str("Issues to Address:\n");
        for (idx, issue) in request.issues.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", idx + 1, issue.issue_type));
            if let Some(notes) = issue.notes.as_deref().filter(|n| !n.is_empty()) {
                prompt.push_str(&format!("   Notes: {notes}\n"));
            }
            if let Some(fix) = issue.proposed_fix.as_deref().filter(|f| !f.is_empty()) {
                prompt.push_str(&format!("   Proposed Fix: {fix}\n"));
            }
        }
        prompt.push('\n');
    }

    if !request.developer_notes.trim().is_empty() {
        prompt.push_str(&format!(
            "Developer Notes:\n{}\n\n",
            request.developer_notes
        ));
    }

    prompt.push_str("Tasks:\n");
    match request.mode {
        RegenerationMode::TargetedEdit => prompt.push_str(
            "1. Address the specific issues listed above while preserving unchanged sections\n",
        ),
        RegenerationMode::FullRewrite => prompt.push_str(
            "1. Perform a comprehensive rewrite addressing all issues and improving overall quality\n",
        ),
    }
    prompt.push_str("2. Ensure all 7 sections are present and valid\n");
    prompt.push_str(
        "3. Follow all hard rules (current encounter, clinician-authored, no inference, distributed docs OK)\n",
    );
    prompt.push_str("4. Include clear Yes/Maybe/No response rules\n");
    prompt.push_str("5. Write a concise edit_rationale (max 150 words) explaining changes\n\n");
    prompt.push_str("Return ONLY a JSON object with problem_statement_json and edit_rationale.");

    Ok(prompt)
}
