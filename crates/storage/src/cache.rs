use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Content-addressed store of embedding vectors, keyed by (hash, model).
#[derive(Clone)]
pub struct EmbeddingCache {
    pool: SqlitePool,
}

impl EmbeddingCache {
    /// Connects and runs migrations.
    pub async fn open(database_url: &str) -> anyhow::Result<Self> {
        let pool = crate::connect(database_url).await?;
        crate::migrate(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn get_many(
        &self,
        model: &str,
        hashes: &[String],
    ) -> anyhow::Result<HashMap<String, Vec<f32>>> {
        let mut found = HashMap::new();
        for batch in hashes.chunks(256) {
            let placeholders = std::iter::repeat("?")
                .take(batch.len())
                .collect::<Vec<_>>()
                .join(",");
            let sql = format!(
                "SELECT content_hash, vector_json FROM embeddings \
                 WHERE model = ? AND content_hash IN ({})",
                placeholders
            );
            let mut q = sqlx::query(&sql).bind(model);
            for h in batch {
                q = q.bind(h);
            }
            for row in q.fetch_all(&self.pool).await? {
                let hash: String = row.try_get("content_hash")?;
                let raw: String = row.try_get("vector_json")?;
                match serde_json::from_str::<Vec<f32>>(&raw) {
                    Ok(vector) => {
                        found.insert(hash, vector);
                    }
                    Err(e) => warn!(%hash, error = %e, "skipping corrupt cached embedding"),
                }
            }
        }
        debug!(model, requested = hashes.len(), hits = found.len(), "embedding cache lookup");
        Ok(found)
    }

    pub async fn put_many(&self, model: &str, items: &[(String, Vec<f32>)]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        for (hash, vector) in items {
            sqlx::query(
                "INSERT INTO embeddings (content_hash, model, vector_json) VALUES (?1, ?2, ?3)
                 ON CONFLICT(content_hash, model) DO UPDATE SET vector_json = excluded.vector_json",
            )
            .bind(hash)
            .bind(model)
            .bind(serde_json::to_string(vector)?)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn count(&self, model: &str) -> anyhow::Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM embeddings WHERE model = ?1")
            .bind(model)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_returns_vectors_per_model() {
        let cache = EmbeddingCache::open("sqlite::memory:").await.unwrap();
        cache
            .put_many(
                "m1",
                &[
                    ("h1".to_string(), vec![0.5, 0.25]),
                    ("h2".to_string(), vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let hits = cache
            .get_many("m1", &["h1".to_string(), "h3".to_string()])
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits["h1"], vec![0.5, 0.25]);

        let other_model = cache.get_many("m2", &["h1".to_string()]).await.unwrap();
        assert!(other_model.is_empty());
        assert_eq!(cache.count("m1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn put_overwrites_existing_entry() {
        let cache = EmbeddingCache::open("sqlite::memory:").await.unwrap();
        cache
            .put_many("m", &[("h".to_string(), vec![1.0])])
            .await
            .unwrap();
        cache
            .put_many("m", &[("h".to_string(), vec![2.0])])
            .await
            .unwrap();
        let hits = cache.get_many("m", &["h".to_string()]).await.unwrap();
        assert_eq!(hits["h"], vec![2.0]);
        assert_eq!(cache.count("m").await.unwrap(), 1);
    }
}
