//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and two concrete providers:
//!
//! - **[`OpenAiCompatProvider`]** — calls any OpenAI-compatible embeddings
//!   endpoint (OpenAI itself, DashScope compatible mode, vLLM, ...) with
//!   retry and exponential backoff.
//! - **[`HashedProvider`]** — deterministic local vectors derived from a
//!   content digest. No network, no model; meant for tests and offline
//!   development where only the pipeline mechanics matter.
//!
//! Also provides the vector codecs used by the repository:
//! [`vec_to_blob`] / [`blob_to_vec`] encode embeddings as little-endian
//! `f32` bytes for SQLite BLOB storage, and [`squared_l2`] is the raw
//! distance metric behind similarity scoring.
//!
//! # Retry Strategy
//!
//! The HTTP provider retries transient failures only:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::config::EmbeddingConfig;
use crate::error::{EngineError, Result};

/// Capability contract for embedding backends.
///
/// `embed_batch` takes at most [`max_batch_size`](Self::max_batch_size)
/// texts per call; splitting larger workloads into batches is the caller's
/// job (the sync engine does this once per run).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier recorded in chunk metadata.
    fn model_name(&self) -> &str;
    /// Embedding vector dimensionality.
    fn dims(&self) -> usize;
    /// Provider-imposed per-call batch limit.
    fn max_batch_size(&self) -> usize;
    /// Embed one batch of texts, returning one vector per input in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Instantiate the provider selected by configuration.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "hashed" => Ok(Box::new(HashedProvider::new(
            config.dims,
            config.batch_size,
        ))),
        "openai" => Ok(Box::new(OpenAiCompatProvider::new(config)?)),
        other => Err(EngineError::validation(format!(
            "unknown embedding provider: '{}'",
            other
        ))),
    }
}

// ============ OpenAI-compatible provider ============

/// Embedding provider for OpenAI-compatible `POST {base_url}/embeddings`
/// endpoints. Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAiCompatProvider {
    model: String,
    dims: usize,
    batch_size: usize,
    base_url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| EngineError::validation("embedding.model required for openai provider"))?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(EngineError::provider(
                "OPENAI_API_KEY environment variable not set",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EngineError::provider(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            model,
            dims: config.dims,
            batch_size: config.batch_size,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            client,
        })
    }

    async fn request_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| EngineError::provider("OPENAI_API_KEY not set"))?;

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
            "dimensions": self.dims,
        });

        let url = format!("{}/embeddings", self.base_url);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await.map_err(|e| {
                            EngineError::provider(format!("malformed embeddings response: {}", e))
                        })?;
                        return parse_embeddings_response(&json, texts.len());
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(EngineError::provider(format!(
                            "embeddings API error {}: {}",
                            status, body_text
                        )));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    return Err(EngineError::provider(format!(
                        "embeddings API error {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(EngineError::provider(format!("network error: {}", e)));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| EngineError::provider("embedding failed after retries")))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(EngineError::validation("embed_batch requires at least one text"));
        }
        if texts.len() > self.batch_size {
            return Err(EngineError::validation(format!(
                "batch of {} exceeds provider limit {}",
                texts.len(),
                self.batch_size
            )));
        }
        self.request_embeddings(texts).await
    }
}

/// Parse `data[].embedding` out of an OpenAI-shaped response, restoring
/// input order via the `index` field.
fn parse_embeddings_response(json: &serde_json::Value, expected: usize) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| EngineError::provider("embeddings response missing data array"))?;

    if data.len() != expected {
        return Err(EngineError::provider(format!(
            "embeddings response has {} vectors, expected {}",
            data.len(),
            expected
        )));
    }

    let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        let vector: Vec<f32> = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| EngineError::provider("embeddings response missing embedding"))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        indexed.push((index, vector));
    }

    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Hashed provider ============

/// Deterministic offline embeddings: each text's vector is expanded from a
/// Sha256 digest with a fixed PRNG and L2-normalized. Identical texts map to
/// identical unit vectors, so distance-0 self-matches behave like a real
/// model's would; there is no semantic signal.
pub struct HashedProvider {
    dims: usize,
    batch_size: usize,
}

impl HashedProvider {
    pub fn new(dims: usize, batch_size: usize) -> Self {
        Self { dims, batch_size }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let digest = Sha256::digest(text.as_bytes());
        let mut state = u64::from_le_bytes(digest[..8].try_into().expect("digest is 32 bytes"));

        let mut vector = Vec::with_capacity(self.dims);
        for _ in 0..self.dims {
            // splitmix64 step
            state = state.wrapping_add(0x9e3779b97f4a7c15);
            let mut z = state;
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
            z ^= z >> 31;
            // Map the top 24 bits onto [-1, 1].
            let unit = (z >> 40) as f32 / 8_388_607.5 - 1.0;
            vector.push(unit);
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashedProvider {
    fn model_name(&self) -> &str {
        "hashed-sha256"
    }
    fn dims(&self) -> usize {
        self.dims
    }
    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(EngineError::validation("embed_batch requires at least one text"));
        }
        if texts.len() > self.batch_size {
            return Err(EngineError::validation(format!(
                "batch of {} exceeds provider limit {}",
                texts.len(),
                self.batch_size
            )));
        }
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

// ============ Vector codecs and distance ============

/// Encode a float vector as a BLOB (little-endian f32 bytes).
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Squared Euclidean distance between two vectors. Returns `f64::INFINITY`
/// for mismatched lengths so such pairs sort last instead of panicking.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = (*x - *y) as f64;
            d * d
        })
        .sum()
}

/// Bounded, rank-preserving similarity from a raw distance:
/// `exp(-distance)` maps distance 0 → 1 and decays toward 0.
pub fn distance_to_similarity(distance: f64) -> f64 {
    (-distance).exp()
}
