use serde::{Deserialize, Serialize};

pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_RERANK_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_RERANK_MODEL: &str = "rerank-v3.5";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub rerank: RerankConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    pub fn config_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join("notevec").join("config.toml"))
    }

    pub fn load() -> Result<Self, crate::error::ConfigError> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            return Ok(config);
        }
        Ok(Self::default())
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, crate::error::ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<(), crate::error::ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            crate::error::ConfigError::Path("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    #[serde(default = "default_overlap_size")]
    pub overlap_size: usize,
}

fn default_max_chunk_size() -> usize {
    1000
}

fn default_overlap_size() -> usize {
    200
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            overlap_size: default_overlap_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Provider calls allowed in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,

    /// Minimum spacing between dispatches, milliseconds.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

fn default_max_concurrent() -> usize {
    1
}

fn default_min_interval_ms() -> u64 {
    500
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent(),
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Texts per provider request; bounded by provider payload limits.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_encoding_format")]
    pub encoding_format: String,
}

fn default_embedding_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_batch_size() -> usize {
    300
}

fn default_timeout() -> u64 {
    120
}

fn default_encoding_format() -> String {
    "float".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            model: default_embedding_model(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout(),
            encoding_format: default_encoding_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    #[serde(default = "default_rerank_url")]
    pub url: String,

    #[serde(default = "default_rerank_model")]
    pub model: String,

    #[serde(default)]
    pub enabled: bool,

    /// Vector-search pool handed to the reranker; wider than the final cut so
    /// the cross-encoder has candidates to promote.
    #[serde(default = "default_initial_candidates")]
    pub initial_candidates: usize,

    #[serde(default = "default_rerank_timeout")]
    pub timeout_secs: u64,
}

fn default_rerank_url() -> String {
    DEFAULT_RERANK_URL.to_string()
}

fn default_rerank_model() -> String {
    DEFAULT_RERANK_MODEL.to_string()
}

fn default_initial_candidates() -> usize {
    50
}

fn default_rerank_timeout() -> u64 {
    30
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            url: default_rerank_url(),
            model: default_rerank_model(),
            enabled: false,
            initial_candidates: default_initial_candidates(),
            timeout_secs: default_rerank_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results returned to the caller after ranking (and reranking, if any).
    #[serde(default = "default_final_top_n")]
    pub final_top_n: usize,

    #[serde(default)]
    pub similarity_threshold: f32,
}

fn default_final_top_n() -> usize {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            final_top_n: default_final_top_n(),
            similarity_threshold: 0.0,
        }
    }
}
