//! Embedding providers.
//!
//! Concrete [`Embedder`] implementations selected by `[embedding].provider`:
//! - **[`DisabledEmbedder`]**: fails every call; uploads skip vectors.
//! - **[`OpenAIEmbedder`]**: `POST /v1/embeddings` with batching and retry.
//! - **[`OllamaEmbedder`]**: a local Ollama instance's `/api/embed` endpoint.
//!
//! Use [`create_embedder`] to build the configured one:
//!
//! ```rust
//! # use clause_harness::config::EmbeddingConfig;
//! # use clause_harness::embedding::create_embedder;
//! let embedder = create_embedder(&EmbeddingConfig::default()).unwrap();
//! assert_eq!(embedder.model_name(), "disabled");
//! ```

use async_trait::async_trait;
use clause_harness_core::embedding::Embedder;
use clause_harness_core::{ClauseError, Result};
use std::sync::Arc;

use crate::config::EmbeddingConfig;
use crate::http;

/// Placeholder used when `embedding.provider = "disabled"`.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }

    fn dims(&self) -> usize {
        0
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(ClauseError::ProviderDisabled(
            "embedding provider is disabled; set [embedding].provider".to_string(),
        ))
    }
}

/// Embedder backed by the OpenAI embeddings API.
pub struct OpenAIEmbedder {
    model: String,
    dims: usize,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIEmbedder {
    /// Fails if `model` or `dims` is unset or `OPENAI_API_KEY` is missing.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = model_and_dims(config, "OpenAI")?;
        Ok(Self {
            model,
            dims,
            api_key: http::openai_api_key()?,
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
            "dimensions": self.dims,
        });
        let json = http::post_json(
            &self.client,
            "OpenAI",
            "https://api.openai.com/v1/embeddings",
            Some(&self.api_key),
            &body,
            self.max_retries,
        )
        .await?;
        parse_openai_response(&json)
    }
}

/// Embedder backed by a local Ollama instance.
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = model_and_dims(config, "Ollama")?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());
        Ok(Self {
            model,
            dims,
            url,
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = http::post_json(
            &self.client,
            "Ollama",
            &format!("{}/api/embed", self.url.trim_end_matches('/')),
            None,
            &body,
            self.max_retries,
        )
        .await?;
        parse_ollama_response(&json)
    }
}

fn model_and_dims(config: &EmbeddingConfig, provider: &str) -> Result<(String, usize)> {
    let model = config.model.clone().ok_or_else(|| {
        ClauseError::Config(format!("embedding.model required for {} provider", provider))
    })?;
    let dims = config.dims.filter(|d| *d > 0).ok_or_else(|| {
        ClauseError::Config(format!("embedding.dims required for {} provider", provider))
    })?;
    Ok((model, dims))
}

/// Extract `data[].embedding`, ordered by each item's `index`.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| invalid("OpenAI", "missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| invalid("OpenAI", "missing embedding"))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        indexed.push((index, to_f32(embedding)));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| invalid("Ollama", "missing embeddings array"))?;

    embeddings
        .iter()
        .map(|e| {
            e.as_array()
                .map(|values| to_f32(values))
                .ok_or_else(|| invalid("Ollama", "embedding is not an array"))
        })
        .collect()
}

fn to_f32(values: &[serde_json::Value]) -> Vec<f32> {
    values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect()
}

fn invalid(service: &str, what: &str) -> ClauseError {
    ClauseError::TransientExternal(format!("invalid {} response: {}", service, what))
}

/// Create the [`Embedder`] named by `config.provider`.
///
/// | Config Value | Embedder |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"openai"` | [`OpenAIEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        "openai" => Ok(Arc::new(OpenAIEmbedder::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        other => Err(ClauseError::Config(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}
