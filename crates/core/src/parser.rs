//! Pulls the answer object out of free-form model output.
//!
//! Models wrap JSON in prose, code fences or reasoning blocks despite being
//! told not to. The object is taken to span from the first `{` to the last
//! `}` of the response.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no JSON object found in response")]
    NoObject,
    #[error("malformed JSON object: {0}")]
    Malformed(String),
}

/// The model's answer as decoded, before validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelAnswer {
    pub category: String,
    pub subcategory: String,
    /// Kept raw: models sometimes answer with numbers or odd casing.
    #[serde(default)]
    pub confidence: Option<serde_json::Value>,
    #[serde(default)]
    pub match_reason: Option<serde_json::Value>,
}

impl ModelAnswer {
    pub fn confidence_label(&self) -> Option<&str> {
        self.confidence.as_ref().and_then(|v| v.as_str())
    }

    /// Strings verbatim, any other JSON value in its compact form, empty
    /// when absent or null.
    pub fn match_reason_text(&self) -> String {
        match &self.match_reason {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Slice between the first `{` and the last `}`, inclusive.
pub fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start > end {
        return None;
    }
    Some(&text[start..=end])
}

pub fn parse_answer(text: &str) -> Result<ModelAnswer, ParseError> {
    let object = extract_object(text).ok_or(ParseError::NoObject)?;
    serde_json::from_str(object).map_err(|e| ParseError::Malformed(e.to_string()))
}
