use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Prefix for environment overrides, e.g. `MAIL_TRIAGE__GENERATION__MODEL`.
pub const ENV_PREFIX: &str = "MAIL_TRIAGE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub knowledge: KnowledgeConfig,
    pub embeddings: EmbeddingConfig,
    pub vectors: VectorConfig,
    pub generation: GenerationConfig,
    pub retrieval: RetrievalConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub path: String,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            path: "knowledge.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "mxbai-embed-large".to_string(),
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    pub provider: String,
    pub url: Option<String>,
    pub collection: String,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            provider: "memory".to_string(),
            url: None,
            collection: "knowledge".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "deepseek-r1:7b".to_string(),
            temperature: 0.2,
            timeout_secs: 60,
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub min_similarity: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_similarity: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// SQLite database for cached entry embeddings; disabled when unset.
    pub path: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("retrieval.top_k must be at least 1")]
    ZeroTopK,
    #[error("embeddings.batch_size must be at least 1")]
    ZeroBatchSize,
    #[error("generation.timeout_secs must be at least 1")]
    ZeroTimeout,
    #[error("generation.temperature must be within 0.0..=2.0, got {0}")]
    TemperatureOutOfRange(f32),
    #[error("vectors.url is required for the qdrant vector provider")]
    MissingQdrantUrl,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ZeroTopK);
        }
        if self.embeddings.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::TemperatureOutOfRange(
                self.generation.temperature,
            ));
        }
        if self.vectors.provider == "qdrant" && self.vectors.url.is_none() {
            return Err(ConfigError::MissingQdrantUrl);
        }
        Ok(())
    }
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );
    let cfg: AppConfig = settings.build()?.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}
