use serde::{Deserialize, Serialize};
use std::fmt;

/// Category and subcategory of the sentinel result.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// One record of the knowledge file. Fields are nullable; gaps are reported
/// as [`crate::knowledge::KnowledgeDiagnostic`]s at load time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

impl KnowledgeEntry {
    /// Text that gets embedded for this entry.
    pub fn render(&self) -> String {
        [
            format!("Category: {}", self.category.as_deref().unwrap_or_default()),
            format!(
                "Subcategory: {}",
                self.subcategory.as_deref().unwrap_or_default()
            ),
            format!(
                "Description: {}",
                self.description.as_deref().unwrap_or_default()
            ),
            format!("Examples: {}", self.examples.join("; ")),
        ]
        .join("\n")
    }

    pub fn to_candidate(&self) -> Candidate {
        Candidate {
            category: self.category.clone(),
            subcategory: self.subcategory.clone(),
            description: self.description.clone(),
        }
    }
}

/// The part of a knowledge entry shown to the model for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Candidate {
    /// Exact, case-sensitive match on both fields. Candidates missing either
    /// field never match.
    pub fn matches(&self, category: &str, subcategory: &str) -> bool {
        self.category.as_deref() == Some(category) && self.subcategory.as_deref() == Some(subcategory)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Accepts `high`, `medium`, `low` in any case, surrounding whitespace ignored.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: String,
    pub subcategory: String,
    pub confidence: Confidence,
    pub match_reason: String,
}

impl ClassificationResult {
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            category: UNCATEGORIZED.to_string(),
            subcategory: UNCATEGORIZED.to_string(),
            confidence: Confidence::Low,
            match_reason: reason.into(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.category == UNCATEGORIZED && self.subcategory == UNCATEGORIZED
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailInput {
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

impl EmailInput {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Text embedded for retrieval.
    pub fn query_text(&self) -> String {
        format!("{}\n{}", self.subject, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_lists_all_fields_and_tolerates_gaps() {
        let entry = KnowledgeEntry {
            category: Some("Billing".into()),
            subcategory: None,
            description: Some("Money back".into()),
            examples: vec!["refund please".into(), "charge me back".into()],
        };
        assert_eq!(
            entry.render(),
            "Category: Billing\nSubcategory: \nDescription: Money back\nExamples: refund please; charge me back"
        );
    }

    #[test]
    fn candidate_without_subcategory_never_matches() {
        let c = KnowledgeEntry {
            category: Some("Billing".into()),
            ..Default::default()
        }
        .to_candidate();
        assert!(!c.matches("Billing", ""));
        assert!(!c.matches("Billing", "Refund"));
    }

    #[test]
    fn candidate_serializes_without_absent_fields() {
        let c = Candidate {
            category: Some("Billing".into()),
            subcategory: Some("Refund".into()),
            description: None,
        };
        assert_eq!(
            serde_json::to_value(&c).unwrap(),
            serde_json::json!({ "category": "Billing", "subcategory": "Refund" })
        );
    }

    #[test]
    fn confidence_parsing_is_case_insensitive() {
        assert_eq!(Confidence::parse_lenient(" High "), Some(Confidence::High));
        assert_eq!(Confidence::parse_lenient("medium"), Some(Confidence::Medium));
        assert_eq!(Confidence::parse_lenient("high/medium/low"), None);
    }

    #[test]
    fn fallback_is_the_sentinel() {
        let r = ClassificationResult::fallback("why");
        assert!(r.is_fallback());
        assert_eq!(r.confidence, Confidence::Low);
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            serde_json::json!({
                "category": "Uncategorized",
                "subcategory": "Uncategorized",
                "confidence": "low",
                "match_reason": "why"
            })
        );
    }
}
