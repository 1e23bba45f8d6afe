use crate::models::{Candidate, ClassificationResult, Confidence};
use crate::parser::ModelAnswer;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{category}/{subcategory} is not one of the retrieved candidates")]
pub struct ValidationError {
    pub category: String,
    pub subcategory: String,
}

/// Accepts the answer only if its pair names one of `candidates` exactly.
///
/// `match_reason` passes through untouched (non-string values in their JSON
/// form). Confidence values outside high/medium/low are read as `low`.
pub fn validate(
    answer: ModelAnswer,
    candidates: &[Candidate],
) -> Result<ClassificationResult, ValidationError> {
    if !candidates
        .iter()
        .any(|c| c.matches(&answer.category, &answer.subcategory))
    {
        return Err(ValidationError {
            category: answer.category,
            subcategory: answer.subcategory,
        });
    }

    let match_reason = answer.match_reason_text();
    let confidence = match answer.confidence_label().and_then(Confidence::parse_lenient) {
        Some(c) => c,
        None => {
            warn!(raw = ?answer.confidence, "unrecognized confidence, using low");
            Confidence::Low
        }
    };

    Ok(ClassificationResult {
        category: answer.category,
        subcategory: answer.subcategory,
        confidence,
        match_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate {
                category: Some("Billing".into()),
                subcategory: Some("Refund".into()),
                description: None,
            },
            Candidate {
                category: Some("Billing".into()),
                subcategory: Some("Invoice".into()),
                description: None,
            },
        ]
    }

    fn answer(cat: &str, sub: &str, confidence: Option<serde_json::Value>) -> ModelAnswer {
        ModelAnswer {
            category: cat.into(),
            subcategory: sub.into(),
            confidence,
            match_reason: Some(serde_json::json!("'refund for order 123'")),
        }
    }

    #[test]
    fn exact_pair_passes_through() {
        let r = validate(
            answer("Billing", "Invoice", Some(serde_json::json!("medium"))),
            &candidates(),
        )
        .unwrap();
        assert_eq!(r.category, "Billing");
        assert_eq!(r.subcategory, "Invoice");
        assert_eq!(r.confidence, Confidence::Medium);
        assert_eq!(r.match_reason, "'refund for order 123'");
    }

    #[test]
    fn comparison_is_case_sensitive_and_whole_string() {
        for (c, s) in [("billing", "Refund"), ("Billing", "refund"), ("Billing ", "Refund"), ("Bill", "Refund")] {
            assert!(validate(answer(c, s, None), &candidates()).is_err(), "{c}/{s}");
        }
    }

    #[test]
    fn fields_must_come_from_the_same_candidate() {
        let mixed = vec![
            Candidate {
                category: Some("Billing".into()),
                subcategory: Some("Refund".into()),
                description: None,
            },
            Candidate {
                category: Some("Shipping".into()),
                subcategory: Some("Delay".into()),
                description: None,
            },
        ];
        assert_eq!(
            validate(answer("Billing", "Delay", None), &mixed),
            Err(ValidationError {
                category: "Billing".into(),
                subcategory: "Delay".into()
            })
        );
    }

    #[test]
    fn sentinel_pair_is_not_a_candidate() {
        assert!(validate(answer("Uncategorized", "Uncategorized", None), &candidates()).is_err());
    }

    #[test]
    fn structured_match_reason_passes_through() {
        let mut a = answer("Billing", "Refund", Some(serde_json::json!("high")));
        a.match_reason = Some(serde_json::json!(["refund", "order 123"]));
        let r = validate(a, &candidates()).unwrap();
        assert_eq!(r.confidence, Confidence::High);
        assert_eq!(r.match_reason, r#"["refund","order 123"]"#);
    }

    #[test]
    fn unknown_confidence_reads_as_low() {
        let r = validate(
            answer("Billing", "Refund", Some(serde_json::json!(0.95))),
            &candidates(),
        )
        .unwrap();
        assert_eq!(r.confidence, Confidence::Low);

        let r = validate(answer("Billing", "Refund", Some(serde_json::json!("HIGH"))), &candidates())
            .unwrap();
        assert_eq!(r.confidence, Confidence::High);
    }
}
