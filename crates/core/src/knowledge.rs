//! Knowledge file loading.
//!
//! The file is a JSON array of entries. Structural problems with the file
//! itself are errors; problems with individual entries are collected as
//! diagnostics and the entry is kept whenever it can be represented.

use crate::models::KnowledgeEntry;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("failed to read knowledge file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("knowledge file is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid knowledge format: expected a JSON array")]
    NotAnArray,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KnowledgeDiagnostic {
    /// Required field absent or blank; the entry is still indexed.
    MissingField { index: usize, field: &'static str },
    /// Entry could not be read as a knowledge record and was skipped.
    InvalidEntry { index: usize, reason: String },
}

impl fmt::Display for KnowledgeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnowledgeDiagnostic::MissingField { index, field } => {
                write!(f, "entry {index}: missing required field `{field}`")
            }
            KnowledgeDiagnostic::InvalidEntry { index, reason } => {
                write!(f, "entry {index}: skipped ({reason})")
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    pub entries: Vec<KnowledgeEntry>,
    pub diagnostics: Vec<KnowledgeDiagnostic>,
}

impl KnowledgeBase {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn load_knowledge(path: &Path) -> Result<KnowledgeBase, KnowledgeError> {
    let raw = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_knowledge(&raw)
}

pub fn parse_knowledge(raw: &str) -> Result<KnowledgeBase, KnowledgeError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        _ => return Err(KnowledgeError::NotAnArray),
    };

    let mut kb = KnowledgeBase::default();
    for (index, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            kb.diagnostics.push(KnowledgeDiagnostic::InvalidEntry {
                index,
                reason: "not a JSON object".into(),
            });
            continue;
        }
        let entry: KnowledgeEntry = match serde_json::from_value(item) {
            Ok(entry) => entry,
            Err(e) => {
                kb.diagnostics.push(KnowledgeDiagnostic::InvalidEntry {
                    index,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if is_blank(&entry.category) {
            kb.diagnostics.push(KnowledgeDiagnostic::MissingField {
                index,
                field: "category",
            });
        }
        if is_blank(&entry.subcategory) {
            kb.diagnostics.push(KnowledgeDiagnostic::MissingField {
                index,
                field: "subcategory",
            });
        }
        kb.entries.push(entry);
    }
    Ok(kb)
}

fn is_blank(field: &Option<String>) -> bool {
    field.as_deref().map_or(true, |s| s.trim().is_empty())
}
