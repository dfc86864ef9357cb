use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Max records per upsert statement. Independent of the embedding batch
    /// size: storage batches are cheap, provider batches are not.
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,
}

fn default_collection() -> String {
    "documents".to_string()
}
fn default_upsert_batch_size() -> usize {
    256
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}
fn default_chunk_overlap() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `openai` (any OpenAI-compatible embeddings endpoint) or `hashed`
    /// (deterministic local vectors, no network — dev and test use).
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_dims")]
    pub dims: usize,
    /// Provider-imposed batch limit per embed call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: default_dims(),
            batch_size: default_batch_size(),
            base_url: default_base_url(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "hashed".to_string()
}
fn default_dims() -> usize {
    256
}
fn default_batch_size() -> usize {
    10
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Optional floor on the similarity score; results below it are dropped.
    #[serde(default)]
    pub min_similarity: Option<f64>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_similarity: None,
        }
    }
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    /// Fixed root all relative paths are computed against. Keeping the root
    /// fixed keeps chunk source keys stable across restarts and machines.
    pub root: PathBuf,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_recursive")]
    pub recursive: bool,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    ["txt", "md", "markdown", "text", "log"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_recursive() -> bool {
    true
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!(
            "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.chunk_overlap,
            config.chunking.chunk_size
        );
    }

    if config.store.upsert_batch_size == 0 {
        anyhow::bail!("store.upsert_batch_size must be > 0");
    }

    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if let Some(floor) = config.retrieval.min_similarity {
        if !(0.0..=1.0).contains(&floor) {
            anyhow::bail!("retrieval.min_similarity must be in [0.0, 1.0]");
        }
    }

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }
    match config.embedding.provider.as_str() {
        "hashed" => {}
        "openai" => {
            if config.embedding.model.is_none() {
                anyhow::bail!("embedding.model must be specified when provider is 'openai'");
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be openai or hashed.",
            other
        ),
    }

    if config.sources.extensions.is_empty() {
        anyhow::bail!("sources.extensions must not be empty");
    }

    Ok(config)
}
