//! Read-only knowledge indexes. Built once at startup, then only searched.

use crate::models::KnowledgeEntry;
use anyhow::{bail, Context};
use providers::qdrant::{QdrantClient, QdrantPoint};
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub entry: KnowledgeEntry,
    pub score: f32,
}

#[async_trait::async_trait]
pub trait KnowledgeIndex: Send + Sync {
    /// Up to `k` entries, most similar first.
    async fn search(&self, vector: &[f32], k: usize) -> anyhow::Result<Vec<ScoredEntry>>;
    fn len(&self) -> usize;
    fn backend(&self) -> &'static str;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut mag_a, mut mag_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }
    let denom = mag_a.sqrt() * mag_b.sqrt();
    let score = dot / denom;
    // Zero-length or non-finite vectors carry no signal.
    if denom < f64::EPSILON || !score.is_finite() {
        return 0.0;
    }
    score.clamp(-1.0, 1.0) as f32
}

struct IndexedEntry {
    entry: KnowledgeEntry,
    vector: Vec<f32>,
}

/// Brute-force cosine index held in memory.
pub struct MemoryIndex {
    records: Vec<IndexedEntry>,
}

impl MemoryIndex {
    pub fn new(items: Vec<(KnowledgeEntry, Vec<f32>)>) -> Self {
        Self {
            records: items
                .into_iter()
                .map(|(entry, vector)| IndexedEntry { entry, vector })
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl KnowledgeIndex for MemoryIndex {
    async fn search(&self, vector: &[f32], k: usize) -> anyhow::Result<Vec<ScoredEntry>> {
        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            // Entries embedded with a different dimension cannot be compared.
            .filter(|(_, r)| !r.vector.is_empty() && r.vector.len() == vector.len())
            .map(|(pos, r)| (pos, cosine_similarity(&r.vector, vector)))
            .collect();
        // Stable: equal scores keep knowledge-file order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        Ok(scored
            .into_iter()
            .map(|(pos, score)| ScoredEntry {
                entry: self.records[pos].entry.clone(),
                score,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Index stored in a Qdrant collection; entries travel as point payloads.
pub struct QdrantIndex {
    client: QdrantClient,
    len: usize,
}

impl QdrantIndex {
    /// Recreates the collection and uploads every entry. Point ids are the
    /// entries' positions in the knowledge file.
    pub async fn build(
        client: QdrantClient,
        items: Vec<(KnowledgeEntry, Vec<f32>)>,
    ) -> anyhow::Result<Self> {
        let len = items.len();
        let Some(dimension) = items.first().map(|(_, v)| v.len()) else {
            return Ok(Self { client, len: 0 });
        };
        if dimension == 0 {
            bail!("embedding provider produced empty vectors; qdrant needs a fixed dimension");
        }
        if let Some((pos, _)) = items
            .iter()
            .enumerate()
            .find(|(_, (_, v))| v.len() != dimension)
        {
            bail!("entry {pos} has an embedding dimension different from {dimension}");
        }

        client
            .recreate_collection(dimension)
            .await
            .with_context(|| format!("creating qdrant collection {}", client.collection()))?;

        let points: Vec<QdrantPoint> = items
            .into_iter()
            .enumerate()
            .map(|(pos, (entry, vector))| QdrantPoint {
                id: pos as u64,
                vector,
                payload: entry_payload(&entry),
            })
            .collect();
        let mut remaining = points;
        while !remaining.is_empty() {
            let rest = remaining.split_off(remaining.len().min(256));
            client.upsert(remaining).await.context("qdrant upsert")?;
            remaining = rest;
        }
        info!(collection = client.collection(), entries = len, "qdrant index built");
        Ok(Self { client, len })
    }
}

fn entry_payload(entry: &KnowledgeEntry) -> HashMap<String, serde_json::Value> {
    match serde_json::to_value(entry) {
        Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
        _ => HashMap::new(),
    }
}

#[async_trait::async_trait]
impl KnowledgeIndex for QdrantIndex {
    async fn search(&self, vector: &[f32], k: usize) -> anyhow::Result<Vec<ScoredEntry>> {
        if self.len == 0 || k == 0 {
            return Ok(Vec::new());
        }
        let resp = self
            .client
            .search(vector.to_vec(), k as u64)
            .await
            .context("qdrant search")?;
        debug!(hits = resp.result.len(), "qdrant search");
        resp.result
            .into_iter()
            .map(|hit| -> anyhow::Result<ScoredEntry> {
                let payload = hit
                    .payload
                    .with_context(|| format!("qdrant point {} has no payload", hit.id))?;
                let entry: KnowledgeEntry =
                    serde_json::from_value(payload).context("decoding qdrant payload")?;
                Ok(ScoredEntry {
                    entry,
                    score: hit.score,
                })
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn backend(&self) -> &'static str {
        "qdrant"
    }
}
