//! Startup: load knowledge, embed it, freeze the index, hand out a classifier.
//!
//! Nothing here runs per request. The returned [`Classifier`] owns
//! read-only handles only.

use crate::classifier::{Classifier, ClassifierSettings};
use crate::config::AppConfig;
use crate::embeddings::{self, CacheScope, EmbedStats};
use crate::knowledge::{self, KnowledgeBase, KnowledgeDiagnostic};
use crate::retriever::VectorRetriever;
use crate::vectorstore::{KnowledgeIndex, MemoryIndex, QdrantIndex};
use anyhow::{bail, Context};
use providers::noop::NoopProvider;
use providers::ollama::{OllamaConfig, OllamaProvider};
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::qdrant::{QdrantClient, QdrantConfig};
use providers::{EmbeddingProvider, GenerateParams, ProviderRegistry};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use storage::EmbeddingCache;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct IndexSummary {
    pub backend: &'static str,
    pub entries: usize,
    pub cached_embeddings: usize,
    pub new_embeddings: usize,
    pub diagnostics: Vec<KnowledgeDiagnostic>,
}

pub struct Startup {
    pub classifier: Classifier,
    pub summary: IndexSummary,
}

/// Per-request HTTP timeout, just above the pipeline's own bound on
/// generation.
fn request_timeout(config: &AppConfig) -> Duration {
    config
        .generation
        .timeout()
        .saturating_add(Duration::from_secs(5))
}

pub fn build_registry(config: &AppConfig) -> ProviderRegistry {
    let noop = Arc::new(NoopProvider);
    let mut reg = ProviderRegistry::new()
        .with_embedding("noop", noop.clone())
        .with_llm("noop", noop);

    let request_timeout = request_timeout(config);

    let ollama_host = std::env::var("OLLAMA_HOST")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| providers::ollama::DEFAULT_BASE_URL.to_string());
    let ollama = OllamaProvider::new(OllamaConfig {
        base_url: ollama_host,
        embedding_model: config.embeddings.model.clone(),
        chat_model: config.generation.model.clone(),
        request_timeout,
    });
    reg = reg
        .with_embedding("ollama", Arc::new(ollama.clone()))
        .with_llm("ollama", Arc::new(ollama));

    if let (Some(key), Some(base)) = (
        std::env::var_os("OPENAI_API_KEY"),
        std::env::var_os("OPENAI_BASE_URL"),
    ) {
        let provider = OpenAiProvider::new(OpenAiConfig {
            api_key: key.to_string_lossy().into_owned(),
            base_url: base.to_string_lossy().into_owned(),
            embedding_model: config.embeddings.model.clone(),
            chat_model: config.generation.model.clone(),
            request_timeout,
        });
        reg = reg
            .with_embedding("openai", Arc::new(provider.clone()))
            .with_llm("openai", Arc::new(provider));
    }

    reg.set_preferred_embedding(&config.embeddings.provider)
        .set_preferred_llm(&config.generation.provider)
}

/// Loads the configured knowledge file and logs its diagnostics.
pub fn load_knowledge(config: &AppConfig) -> anyhow::Result<KnowledgeBase> {
    let kb = knowledge::load_knowledge(Path::new(&config.knowledge.path))?;
    info!(
        path = %config.knowledge.path,
        entries = kb.len(),
        "knowledge file parsed"
    );
    for d in &kb.diagnostics {
        warn!("{d}");
    }
    Ok(kb)
}

/// Embeds every entry and freezes the result into the configured backend.
pub async fn build_index(
    config: &AppConfig,
    entries: &[crate::models::KnowledgeEntry],
    embedder: &dyn EmbeddingProvider,
) -> anyhow::Result<(Arc<dyn KnowledgeIndex>, EmbedStats)> {
    let texts: Vec<String> = entries.iter().map(|e| e.render()).collect();

    let cache = match &config.cache.path {
        Some(path) => Some(
            EmbeddingCache::open(path)
                .await
                .with_context(|| format!("opening embedding cache {path}"))?,
        ),
        None => None,
    };
    let scope = cache.as_ref().map(|cache| CacheScope {
        cache,
        model: &config.embeddings.model,
    });
    let (vectors, stats) =
        embeddings::embed_all(embedder, &texts, config.embeddings.batch_size, scope).await?;

    let items: Vec<_> = entries.iter().cloned().zip(vectors).collect();
    let index: Arc<dyn KnowledgeIndex> = match config.vectors.provider.as_str() {
        "memory" => Arc::new(MemoryIndex::new(items)),
        "qdrant" => {
            let Some(url) = &config.vectors.url else {
                bail!("vectors.url is required for the qdrant vector provider");
            };
            let client = QdrantClient::new(QdrantConfig {
                url: url.clone(),
                collection: config.vectors.collection.clone(),
                api_key: std::env::var("QDRANT_API_KEY").ok(),
                request_timeout: request_timeout(config),
            });
            Arc::new(QdrantIndex::build(client, items).await?)
        }
        other => bail!("unknown vector provider: {other}"),
    };
    info!(
        backend = index.backend(),
        entries = index.len(),
        cached = stats.cached,
        embedded = stats.embedded,
        "knowledge index ready"
    );
    Ok((index, stats))
}

pub async fn initialize(config: &AppConfig) -> anyhow::Result<Startup> {
    initialize_with(config, build_registry(config)).await
}

/// Same as [`initialize`] with a caller-supplied registry.
pub async fn initialize_with(
    config: &AppConfig,
    registry: ProviderRegistry,
) -> anyhow::Result<Startup> {
    config.validate()?;
    let kb = load_knowledge(config)?;

    let embedder = registry
        .embedding(None)
        .context("resolving embedding provider")?;
    let llm = registry.llm(None).context("resolving generation provider")?;

    let (index, stats) = build_index(config, &kb.entries, embedder.as_ref()).await?;
    let summary = IndexSummary {
        backend: index.backend(),
        entries: index.len(),
        cached_embeddings: stats.cached,
        new_embeddings: stats.embedded,
        diagnostics: kb.diagnostics,
    };

    let retriever = VectorRetriever::new(index, embedder)
        .with_min_similarity(config.retrieval.min_similarity);
    let settings = ClassifierSettings {
        top_k: config.retrieval.top_k,
        params: GenerateParams {
            temperature: config.generation.temperature,
        },
        timeout: config.generation.timeout(),
    };
    Ok(Startup {
        classifier: Classifier::new(Arc::new(retriever), llm, settings),
        summary,
    })
}
