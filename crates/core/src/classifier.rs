//! Retrieval-augmented classification.
//!
//! `retrieve → prompt → generate → parse → validate`, strictly in that order
//! for one email. Every failure is carried as a [`ClassifyError`] and turned
//! into the sentinel result only in [`Classifier::classify`].

use crate::error::ClassifyError;
use crate::models::{Candidate, ClassificationResult, EmailInput, KnowledgeEntry};
use crate::retriever::Retriever;
use crate::{parser, prompt, validator};
use providers::{GenerateParams, LlmProvider, ProviderError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct ClassifierSettings {
    pub top_k: usize,
    pub params: GenerateParams,
    pub timeout: Duration,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            params: GenerateParams::default(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Cheap to clone; clones share the retriever and backend.
#[derive(Clone)]
pub struct Classifier {
    retriever: Arc<dyn Retriever>,
    llm: Arc<dyn LlmProvider>,
    settings: ClassifierSettings,
}

impl Classifier {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        llm: Arc<dyn LlmProvider>,
        settings: ClassifierSettings,
    ) -> Self {
        Self {
            retriever,
            llm,
            settings,
        }
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    /// Always yields a well-formed result; failures become the fallback.
    pub async fn classify(&self, email: &EmailInput) -> ClassificationResult {
        match self.try_classify(email).await {
            Ok(result) => {
                info!(
                    category = %result.category,
                    subcategory = %result.subcategory,
                    confidence = %result.confidence,
                    "email classified"
                );
                result
            }
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "classification fell back to Uncategorized");
                ClassificationResult::fallback(e.fallback_reason())
            }
        }
    }

    pub async fn try_classify(
        &self,
        email: &EmailInput,
    ) -> Result<ClassificationResult, ClassifyError> {
        let entries = self
            .retriever
            .retrieve(&email.query_text(), self.settings.top_k)
            .await
            .map_err(|e| ClassifyError::Unexpected(format!("{e:#}")))?;
        if entries.is_empty() {
            return Err(ClassifyError::RetrievalEmpty);
        }

        let candidates: Vec<Candidate> = entries.iter().map(KnowledgeEntry::to_candidate).collect();
        let prompt = prompt::build_prompt(&candidates, email)
            .map_err(|e| ClassifyError::Unexpected(format!("rendering prompt: {e}")))?;
        debug!(
            candidates = candidates.len(),
            prompt_len = prompt.len(),
            "prompt built"
        );

        let raw = self.generate(prompt).await?;
        debug!(response_len = raw.len(), "model responded");

        let answer = parser::parse_answer(&raw)?;
        Ok(validator::validate(answer, &candidates)?)
    }

    /// One backend call on its own task, bounded by the configured timeout.
    /// A panic inside the backend surfaces as `Unexpected`.
    async fn generate(&self, prompt: String) -> Result<String, ClassifyError> {
        let llm = Arc::clone(&self.llm);
        let params = self.settings.params;
        let mut task = tokio::spawn(async move { llm.generate(&prompt, &params).await });

        match tokio::time::timeout(self.settings.timeout, &mut task).await {
            Ok(Ok(result)) => Ok(result?),
            Ok(Err(join)) if join.is_panic() => Err(ClassifyError::Unexpected(
                "generative backend panicked".to_string(),
            )),
            Ok(Err(join)) => Err(ClassifyError::Unexpected(join.to_string())),
            Err(_) => {
                task.abort();
                Err(ProviderError::Timeout(self.settings.timeout).into())
            }
        }
    }
}
