//! Ollama backend: `/api/embed` for vectors and `/api/generate` for completions.

use crate::{
    ensure_success, EmbedResponse, EmbeddingProvider, GenerateParams, LlmProvider, ProviderError,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub request_timeout: Duration,
}

#[derive(Clone)]
pub struct OllamaProvider {
    client: Client,
    cfg: Arc<OllamaConfig>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedApiResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateApiResponse {
    response: String,
}

impl OllamaProvider {
    pub fn new(cfg: OllamaConfig) -> Self {
        let client = Client::builder()
            .timeout(cfg.request_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            cfg: Arc::new(cfg),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.cfg.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OllamaProvider {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        let body = EmbedRequest {
            model: &self.cfg.embedding_model,
            input: texts,
        };
        let resp = self
            .client
            .post(self.endpoint("/api/embed"))
            .json(&body)
            .send()
            .await?;
        let parsed: EmbedApiResponse = ensure_success(resp)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        debug!(
            model = %self.cfg.embedding_model,
            count = parsed.embeddings.len(),
            "ollama embeddings received"
        );
        Ok(EmbedResponse {
            vectors: parsed.embeddings,
        })
    }
}

#[async_trait::async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerateParams,
    ) -> Result<String, ProviderError> {
        let body = GenerateRequest {
            model: &self.cfg.chat_model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: params.temperature,
            },
        };
        let resp = self
            .client
            .post(self.endpoint("/api/generate"))
            .json(&body)
            .send()
            .await?;
        let parsed: GenerateApiResponse = ensure_success(resp)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(parsed.response)
    }
}
