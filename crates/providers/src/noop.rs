use crate::{EmbedResponse, EmbeddingProvider, GenerateParams, LlmProvider, ProviderError};

#[derive(Debug, Default)]
pub struct NoopProvider;

#[async_trait::async_trait]
impl EmbeddingProvider for NoopProvider {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        Ok(EmbedResponse {
            vectors: vec![vec![]; texts.len()],
        })
    }
}

#[async_trait::async_trait]
impl LlmProvider for NoopProvider {
    async fn generate(
        &self,
        _prompt: &str,
        _params: &GenerateParams,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::NotImplemented)
    }
}
