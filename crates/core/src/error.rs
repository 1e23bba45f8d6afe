use crate::parser::ParseError;
use crate::validator::ValidationError;
use providers::ProviderError;
use thiserror::Error;

pub const REASON_NO_CANDIDATES: &str = "No matching categories found";
pub const REASON_NO_VALID_MATCH: &str = "No valid category match found";

/// Why a classification ended in the fallback result.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("retrieval returned no candidates")]
    RetrievalEmpty,
    #[error("generation failed: {0}")]
    Generation(#[from] ProviderError),
    #[error("response parse failed: {0}")]
    Parse(#[from] ParseError),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl ClassifyError {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifyError::RetrievalEmpty => "retrieval_empty",
            ClassifyError::Generation(_) => "generation",
            ClassifyError::Parse(_) => "parse",
            ClassifyError::Validation(_) => "validation",
            ClassifyError::Unexpected(_) => "unexpected",
        }
    }

    /// `match_reason` of the fallback result for this failure.
    pub fn fallback_reason(&self) -> String {
        match self {
            ClassifyError::RetrievalEmpty => REASON_NO_CANDIDATES.to_string(),
            ClassifyError::Generation(e) => format!("Generation failed: {e}"),
            ClassifyError::Parse(e) => format!("Failed to parse model response: {e}"),
            ClassifyError::Validation(_) => REASON_NO_VALID_MATCH.to_string(),
            ClassifyError::Unexpected(msg) => format!("System error: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn reasons_per_failure_kind() {
        assert_eq!(
            ClassifyError::RetrievalEmpty.fallback_reason(),
            "No matching categories found"
        );
        assert_eq!(
            ClassifyError::from(ValidationError {
                category: "X".into(),
                subcategory: "Y".into()
            })
            .fallback_reason(),
            "No valid category match found"
        );
        assert_eq!(
            ClassifyError::from(ProviderError::Timeout(Duration::from_secs(60))).fallback_reason(),
            "Generation failed: timed out after 60s"
        );
        assert_eq!(
            ClassifyError::from(ParseError::NoObject).fallback_reason(),
            "Failed to parse model response: no JSON object found in response"
        );
        assert_eq!(
            ClassifyError::Unexpected("connection reset".into()).fallback_reason(),
            "System error: connection reset"
        );
    }
}
