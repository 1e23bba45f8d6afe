use crate::{ensure_success, ProviderError};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub collection: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

#[derive(Clone)]
pub struct QdrantClient {
    client: Client,
    cfg: QdrantConfig,
}

impl QdrantClient {
    pub fn new(cfg: QdrantConfig) -> Self {
        let client = Client::builder()
            .timeout(cfg.request_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, cfg }
    }

    pub fn collection(&self) -> &str {
        &self.cfg.collection
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!(
            "{}/collections/{}{}",
            self.cfg.url.trim_end_matches('/'),
            self.cfg.collection,
            suffix
        )
    }

    fn with_key(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.cfg.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    /// Drops the collection if present and creates it empty with cosine distance.
    pub async fn recreate_collection(&self, dimension: usize) -> Result<(), ProviderError> {
        // A missing collection answers 404; only the create below must succeed.
        let _ = self
            .with_key(self.client.delete(self.collection_url("")))
            .send()
            .await?;

        #[derive(Serialize)]
        struct VectorParams {
            size: usize,
            distance: &'static str,
        }
        #[derive(Serialize)]
        struct CreateCollection {
            vectors: VectorParams,
        }
        let body = CreateCollection {
            vectors: VectorParams {
                size: dimension,
                distance: "Cosine",
            },
        };
        let resp = self
            .with_key(self.client.put(self.collection_url("")).json(&body))
            .send()
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }

    pub async fn search(
        &self,
        vector: Vec<f32>,
        limit: u64,
    ) -> Result<QdrantSearchResponse, ProviderError> {
        #[derive(Serialize)]
        struct SearchRequest {
            vector: Vec<f32>,
            limit: u64,
            with_payload: bool,
        }
        let body = SearchRequest {
            vector,
            limit,
            with_payload: true,
        };
        let resp = self
            .with_key(
                self.client
                    .post(self.collection_url("/points/search"))
                    .json(&body),
            )
            .send()
            .await?;
        ensure_success(resp)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    /// Upserts and waits for the points to become searchable.
    pub async fn upsert(&self, points: Vec<QdrantPoint>) -> Result<(), ProviderError> {
        let req = QdrantUpsert { points };
        let resp = self
            .with_key(
                self.client
                    .put(self.collection_url("/points?wait=true"))
                    .json(&req),
            )
            .send()
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct QdrantUpsert {
    pub points: Vec<QdrantPoint>,
}

#[derive(Debug, Serialize)]
pub struct QdrantPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct QdrantSearchResponse {
    pub result: Vec<SearchResult>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SearchResult {
    pub id: serde_json::Value,
    pub score: f32,
    pub payload: Option<serde_json::Value>,
}
