//! Instruction text sent to the generative backend.

use crate::models::{Candidate, EmailInput};

const RESPONSE_FORMAT: &str = r#"{
  "category": "EXACT_CATEGORY_FROM_OPTIONS",
  "subcategory": "EXACT_SUBCATEGORY_FROM_OPTIONS",
  "confidence": "high|medium|low",
  "match_reason": "Specific phrase: '<quoted text from the email>'"
}"#;

/// Renders the classification prompt. Candidates are embedded as a JSON
/// array, verbatim, so the model copies names instead of paraphrasing them.
pub fn build_prompt(candidates: &[Candidate], email: &EmailInput) -> serde_json::Result<String> {
    let options = serde_json::to_string_pretty(candidates)?;
    Ok(format!(
        "You are a customer service email classifier. Pick exactly one option from the list below.

OPTIONS (use ONLY these, copied exactly):
{options}

EMAIL:
Subject: {subject}
Body: {body}

STRICT RULES:
1. Respond with ONLY one JSON object. No markdown, no code fences, no text before or after it.
2. \"category\" and \"subcategory\" must be copied exactly from a single option above.
3. NEVER invent categories or subcategories that are not in the options.
4. \"confidence\" must be one of: high, medium, low.
5. \"match_reason\" must quote the words from the email that justify the choice.
6. If no option fits, use \"Uncategorized\" for both category and subcategory.

RESPONSE FORMAT (ONLY JSON, NO OTHER TEXT):
{format}
",
        subject = email.subject,
        body = email.body,
        format = RESPONSE_FORMAT,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate {
                category: Some("Billing".into()),
                subcategory: Some("Refund".into()),
                description: Some("Customer wants money back".into()),
            },
            Candidate {
                category: Some("Shipping".into()),
                subcategory: Some("Delay".into()),
                description: None,
            },
        ]
    }

    #[test]
    fn lists_candidates_as_json_and_embeds_email() {
        let email = EmailInput::new("Refund request", "I want a refund for order 123");
        let prompt = build_prompt(&candidates(), &email).unwrap();

        let listed = serde_json::to_string_pretty(&candidates()).unwrap();
        assert!(prompt.contains(&listed));
        assert!(prompt.contains("\"category\": \"Billing\""));
        assert!(prompt.contains("\"subcategory\": \"Delay\""));
        assert!(prompt.contains("Subject: Refund request"));
        assert!(prompt.contains("Body: I want a refund for order 123"));
    }

    #[test]
    fn states_schema_and_prohibitions() {
        let prompt = build_prompt(&candidates(), &EmailInput::new("s", "b")).unwrap();
        for field in ["\"category\"", "\"subcategory\"", "\"confidence\"", "\"match_reason\""] {
            assert!(prompt.contains(field), "missing {field}");
        }
        assert!(prompt.contains("high, medium, low"));
        assert!(prompt.contains("NEVER invent categories"));
        assert!(prompt.contains("ONLY one JSON object"));
    }

    #[test]
    fn omits_absent_candidate_fields() {
        let prompt = build_prompt(&candidates()[1..], &EmailInput::new("s", "b")).unwrap();
        assert!(!prompt.contains("\"description\""));
    }
}
