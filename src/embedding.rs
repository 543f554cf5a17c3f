//! Embedding provider implementations.
//!
//! Concrete backends for the core [`EmbeddingProvider`] trait:
//! - **[`DisabledProvider`]**: always errors; used when embeddings are not configured.
//! - **[`OpenAIProvider`]**: `POST {url}/embeddings` (default `https://api.openai.com/v1`).
//! - **[`OllamaProvider`]**: `POST {url}/api/embed` on a local Ollama instance.
//!
//! Transient HTTP failures are retried inside the provider (see
//! [`http`](crate::http)); every other failure surfaces as
//! [`RecallError::Embedding`]. Returned vectors are checked against the
//! index dimension before they leave the provider.
//!
//! # Provider Selection
//!
//! ```rust,no_run
//! # use chat_recall::config::Config;
//! # fn example(config: &Config) -> anyhow::Result<()> {
//! let provider = chat_recall::embedding::create_provider(config)?;
//! println!("embedding with {} ({} dims)", provider.model_name(), provider.dims());
//! # Ok(())
//! # }
//! ```

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use chat_recall_core::embedding::{validate_embedding, EmbeddingProvider};
use chat_recall_core::RecallError;

use crate::config::Config;
use crate::http;

pub const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1";
pub const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Instantiate the provider named by `embedding.provider`.
///
/// # Errors
///
/// Fails when the provider needs an API key that is not in the
/// environment, or the provider name is unknown.
pub fn create_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let emb = &config.embedding;
    let dims = config.index.dims;
    let model = || {
        emb.model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required"))
    };

    let provider: Arc<dyn EmbeddingProvider> = match emb.provider.as_str() {
        "disabled" => Arc::new(DisabledProvider { dims }),
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
            Arc::new(OpenAIProvider::new(
                model()?,
                dims,
                emb.url.clone().unwrap_or_else(|| OPENAI_DEFAULT_URL.to_string()),
                api_key,
                http::build_client(emb.timeout_secs)?,
                emb.max_retries,
            ))
        }
        "ollama" => Arc::new(OllamaProvider::new(
            model()?,
            dims,
            emb.url.clone().unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string()),
            http::build_client(emb.timeout_secs)?,
            emb.max_retries,
        )),
        other => bail!("Unknown embedding provider: {}", other),
    };

    Ok(provider)
}

// ============ Disabled Provider ============

/// A provider that refuses every request.
pub struct DisabledProvider {
    dims: usize,
}

impl DisabledProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, _text: &str) -> chat_recall_core::Result<Vec<f32>> {
        Err(RecallError::Embedding(
            "embedding provider is disabled".into(),
        ))
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI embeddings API.
pub struct OpenAIProvider {
    model: String,
    dims: usize,
    url: String,
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl OpenAIProvider {
    pub fn new(
        model: String,
        dims: usize,
        url: String,
        api_key: String,
        client: reqwest::Client,
        max_retries: u32,
    ) -> Self {
        Self {
            model,
            dims,
            url: url.trim_end_matches('/').to_string(),
            api_key,
            client,
            max_retries,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> chat_recall_core::Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(RecallError::Embedding("cannot embed empty text".into()));
        }
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        let json = http::post_json(
            &self.client,
            &format!("{}/embeddings", self.url),
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await
        .map_err(RecallError::embedding)?;

        let vector = parse_openai_response(&json).map_err(RecallError::embedding)?;
        validate_embedding(vector, self.dims)
    }
}

/// Extract `data[0].embedding` from an OpenAI embeddings response.
pub fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing data[0].embedding"))?;
    parse_number_array(embedding, "OpenAI")
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Requires Ollama to be running with an embedding model pulled
/// (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaProvider {
    model: String,
    dims: usize,
    url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl OllamaProvider {
    pub fn new(
        model: String,
        dims: usize,
        url: String,
        client: reqwest::Client,
        max_retries: u32,
    ) -> Self {
        Self {
            model,
            dims,
            url: url.trim_end_matches('/').to_string(),
            client,
            max_retries,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> chat_recall_core::Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(RecallError::Embedding("cannot embed empty text".into()));
        }
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        let json = http::post_json(
            &self.client,
            &format!("{}/api/embed", self.url),
            None,
            &body,
            self.max_retries,
            "Ollama",
        )
        .await
        .map_err(RecallError::embedding)?;

        let vector = parse_ollama_response(&json).map_err(RecallError::embedding)?;
        validate_embedding(vector, self.dims)
    }
}

/// Extract `embeddings[0]` from an Ollama `/api/embed` response.
pub fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .and_then(|e| e.first())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing embeddings array"))?;
    parse_number_array(embedding, "Ollama")
}

fn parse_number_array(value: &serde_json::Value, label: &str) -> Result<Vec<f32>> {
    let items = value
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("Invalid {} response: embedding is not an array", label))?;
    items
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| anyhow::anyhow!("Invalid {} response: non-numeric component", label))
        })
        .collect()
}
