//! TOML configuration.
//!
//! Every command reads one file (`--config`, default `./config/clx.toml`).
//! Only `[db]` is required; every other section has defaults. Credentials
//! never live in the file: the OpenAI providers read `OPENAI_API_KEY`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of hits when a search does not specify `k`.
    #[serde(default = "default_k")]
    pub default_k: usize,
    /// Reference clauses passed to the model as style examples.
    #[serde(default = "default_generate_examples")]
    pub generate_examples: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
            generate_examples: default_generate_examples(),
        }
    }
}

fn default_k() -> usize {
    6
}
fn default_generate_examples() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_disabled")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Limit for one request attempt, not the whole call with retries.
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
    /// Base URL for Ollama.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_disabled(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout(),
            url: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_disabled() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    96
}
fn default_max_retries() -> u32 {
    2
}
fn default_embedding_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_disabled")]
    pub provider: String,
    /// Model for edit proposals and clause generation.
    #[serde(default = "default_completion_model")]
    pub model: String,
    #[serde(default = "default_rewrite_model")]
    pub rewrite_model: String,
    #[serde(default = "default_summarize_model")]
    pub summarize_model: String,
    #[serde(default = "default_patch_temperature")]
    pub patch_temperature: f32,
    #[serde(default = "default_generate_temperature")]
    pub generate_temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Limit for one request attempt, not the whole call with retries.
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: default_disabled(),
            model: default_completion_model(),
            rewrite_model: default_rewrite_model(),
            summarize_model: default_summarize_model(),
            patch_temperature: default_patch_temperature(),
            generate_temperature: default_generate_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_max_retries(),
            timeout_secs: default_completion_timeout(),
            base_url: default_base_url(),
        }
    }
}

impl CompletionConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_completion_model() -> String {
    "gpt-4.1".to_string()
}
fn default_rewrite_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_summarize_model() -> String {
    "gpt-4o".to_string()
}
fn default_patch_temperature() -> f32 {
    0.1
}
fn default_generate_temperature() -> f32 {
    0.5
}
fn default_max_tokens() -> u32 {
    500
}
fn default_completion_timeout() -> u64 {
    60
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

impl Config {
    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.retrieval.default_k == 0 {
            bail!("retrieval.default_k must be >= 1");
        }

        match self.embedding.provider.as_str() {
            "disabled" | "openai" | "ollama" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
                other
            ),
        }

        if self.embedding.is_enabled() {
            if self.embedding.dims.unwrap_or(0) == 0 {
                bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    self.embedding.provider
                );
            }
            if self.embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    self.embedding.provider
                );
            }
            if self.embedding.batch_size == 0 {
                bail!("embedding.batch_size must be > 0");
            }
        }

        match self.completion.provider.as_str() {
            "disabled" | "openai" => {}
            other => bail!(
                "Unknown completion provider: '{}'. Must be disabled or openai.",
                other
            ),
        }

        if self.completion.is_enabled() && self.completion.model.trim().is_empty() {
            bail!("completion.model must not be empty");
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    Config::from_toml(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = Config::from_toml("[db]\npath = \"./data/clauses.sqlite\"\n").unwrap();
        assert_eq!(cfg.retrieval.default_k, 6);
        assert_eq!(cfg.retrieval.generate_examples, 5);
        assert!(!cfg.embedding.is_enabled());
        assert_eq!(cfg.embedding.batch_size, 96);
        assert!(!cfg.completion.is_enabled());
        assert_eq!(cfg.completion.model, "gpt-4.1");
        assert_eq!(cfg.server.bind, "127.0.0.1:7340");
    }

    #[test]
    fn test_enabled_embedding_requires_dims_and_model() {
        let err = Config::from_toml(
            "[db]\npath = \"x\"\n[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("dims"));

        let err =
            Config::from_toml("[db]\npath = \"x\"\n[embedding]\nprovider = \"ollama\"\ndims = 768\n")
                .unwrap_err();
        assert!(err.to_string().contains("model"));
    }

    #[test]
    fn test_unknown_providers_rejected() {
        assert!(
            Config::from_toml("[db]\npath = \"x\"\n[embedding]\nprovider = \"local\"\n").is_err()
        );
        assert!(
            Config::from_toml("[db]\npath = \"x\"\n[completion]\nprovider = \"claude\"\n").is_err()
        );
    }

    #[test]
    fn test_zero_k_rejected() {
        let err =
            Config::from_toml("[db]\npath = \"x\"\n[retrieval]\ndefault_k = 0\n").unwrap_err();
        assert!(err.to_string().contains("default_k"));
    }
}
