use crate::embeddings::embed_query;
use crate::models::KnowledgeEntry;
use crate::vectorstore::KnowledgeIndex;
use anyhow::Context;
use providers::EmbeddingProvider;
use std::sync::Arc;
use tracing::debug;

/// Candidate lookup for a query. Implementations must be side-effect free
/// and safe to call concurrently.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Up to `k` entries, most similar first. An empty result is not an error.
    async fn retrieve(&self, query: &str, k: usize) -> anyhow::Result<Vec<KnowledgeEntry>>;
}

/// Embeds the query and searches a frozen [`KnowledgeIndex`].
pub struct VectorRetriever {
    index: Arc<dyn KnowledgeIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    min_similarity: Option<f32>,
}

impl VectorRetriever {
    pub fn new(index: Arc<dyn KnowledgeIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            index,
            embedder,
            min_similarity: None,
        }
    }

    pub fn with_min_similarity(mut self, threshold: Option<f32>) -> Self {
        self.min_similarity = threshold;
        self
    }

    pub fn index(&self) -> &Arc<dyn KnowledgeIndex> {
        &self.index
    }
}

#[async_trait::async_trait]
impl Retriever for VectorRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> anyhow::Result<Vec<KnowledgeEntry>> {
        if k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }
        let vector = embed_query(self.embedder.as_ref(), query)
            .await
            .context("embedding query")?;
        let hits = self.index.search(&vector, k).await?;
        let total = hits.len();
        let entries: Vec<KnowledgeEntry> = hits
            .into_iter()
            .filter(|h| self.min_similarity.map_or(true, |min| h.score >= min))
            .map(|h| h.entry)
            .collect();
        debug!(
            backend = self.index.backend(),
            hits = total,
            kept = entries.len(),
            "retrieved candidates"
        );
        Ok(entries)
    }
}
