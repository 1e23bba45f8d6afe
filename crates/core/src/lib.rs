//! Core library: knowledge loading, embeddings, retrieval, prompt building,
//! response parsing and validation for email classification.

pub mod classifier;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod knowledge;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod validator;
pub mod vectorstore;

pub use classifier::{Classifier, ClassifierSettings};
pub use error::ClassifyError;
pub use models::{ClassificationResult, Confidence, EmailInput, KnowledgeEntry};
