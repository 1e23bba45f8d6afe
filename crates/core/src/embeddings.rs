use anyhow::{bail, Context};
use providers::{EmbeddingProvider, ProviderError};
use std::collections::{HashMap, HashSet};
use storage::EmbeddingCache;
use tracing::debug;

/// Cache lookups are scoped to this model name.
pub struct CacheScope<'a> {
    pub cache: &'a EmbeddingCache,
    pub model: &'a str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbedStats {
    pub cached: usize,
    pub embedded: usize,
}

pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Embeds a single query string.
pub async fn embed_query(
    provider: &dyn EmbeddingProvider,
    text: &str,
) -> Result<Vec<f32>, ProviderError> {
    let resp = provider.embed(&[text.to_string()]).await?;
    resp.vectors
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("no embedding returned for query".into()))
}

/// Embeds `texts` in batches, reusing cached vectors for unchanged content.
/// Output order matches input order.
pub async fn embed_all(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
    cache: Option<CacheScope<'_>>,
) -> anyhow::Result<(Vec<Vec<f32>>, EmbedStats)> {
    let hashes: Vec<String> = texts.iter().map(|t| content_hash(t)).collect();

    let mut known: HashMap<String, Vec<f32>> = match &cache {
        Some(scope) => scope
            .cache
            .get_many(scope.model, &hashes)
            .await
            .context("embedding cache lookup")?,
        None => HashMap::new(),
    };
    let mut stats = EmbedStats {
        cached: hashes.iter().filter(|h| known.contains_key(*h)).count(),
        embedded: 0,
    };

    // Skip entries already cached; duplicates of the same text are embedded once.
    let mut seen = HashSet::new();
    let mut pending: Vec<usize> = Vec::new();
    for (i, h) in hashes.iter().enumerate() {
        if !known.contains_key(h) && seen.insert(h.as_str()) {
            pending.push(i);
        }
    }

    for batch in pending.chunks(batch_size.max(1)) {
        let inputs: Vec<String> = batch.iter().map(|&i| texts[i].clone()).collect();
        let resp = provider
            .embed(&inputs)
            .await
            .context("embedding request failed")?;
        if resp.vectors.len() != inputs.len() {
            bail!(
                "embedding provider returned {} vectors for {} inputs",
                resp.vectors.len(),
                inputs.len()
            );
        }
        let fresh: Vec<(String, Vec<f32>)> = batch
            .iter()
            .zip(resp.vectors)
            .map(|(&i, v)| (hashes[i].clone(), v))
            .collect();
        if let Some(scope) = &cache {
            scope
                .cache
                .put_many(scope.model, &fresh)
                .await
                .context("embedding cache write")?;
        }
        stats.embedded += fresh.len();
        debug!(batch = fresh.len(), "embedded knowledge batch");
        known.extend(fresh);
    }

    let mut vectors = Vec::with_capacity(texts.len());
    for h in &hashes {
        match known.get(h) {
            Some(v) => vectors.push(v.clone()),
            None => bail!("missing embedding for content {h}"),
        }
    }
    Ok((vectors, stats))
}
