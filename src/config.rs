use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use chat_recall_core::filter::DEFAULT_THRESHOLD;
use chat_recall_core::ingest::DEFAULT_MAX_CONTENT_CHARS;
use chat_recall_core::query::QueryParams;
use chat_recall_core::synthesis::SynthesisSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_name")]
    pub name: String,
    /// Dimension of every vector in the index; must match the embedding model.
    #[serde(default = "default_dims")]
    pub dims: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: default_index_name(),
            dims: default_dims(),
        }
    }
}

fn default_index_name() -> String {
    "discord-knowledge".to_string()
}
fn default_dims() -> usize {
    1536
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_disabled")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Base URL override. Defaults to the public OpenAI API or a local
    /// Ollama instance depending on `provider`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_disabled(),
            model: None,
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
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
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct SynthesisConfig {
    #[serde(default = "default_disabled")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Base URL for OpenAI-compatible endpoints.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_persona")]
    pub persona: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_synthesis_retries")]
    pub max_retries: u32,
    #[serde(default = "default_synthesis_timeout")]
    pub timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            provider: default_disabled(),
            model: None,
            url: None,
            persona: default_persona(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_synthesis_retries(),
            timeout_secs: default_synthesis_timeout(),
        }
    }
}

impl SynthesisConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    pub fn settings(&self) -> SynthesisSettings {
        SynthesisSettings {
            persona: self.persona.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

fn default_persona() -> String {
    "the community".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    500
}
fn default_synthesis_retries() -> u32 {
    2
}
fn default_synthesis_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            threshold: default_threshold(),
            max_sources: default_max_sources(),
        }
    }
}

impl RetrievalConfig {
    pub fn params(&self) -> QueryParams {
        QueryParams {
            top_k: self.top_k,
            threshold: self.threshold,
            max_sources: self.max_sources,
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}
fn default_max_sources() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_content_chars: default_max_content_chars(),
            queue_capacity: default_queue_capacity(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_max_content_chars() -> usize {
    DEFAULT_MAX_CONTENT_CHARS
}
fn default_queue_capacity() -> usize {
    256
}
fn default_concurrency() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    60
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Check cross-field constraints that serde defaults cannot express.
pub fn validate(config: &Config) -> Result<()> {
    if config.index.dims == 0 {
        anyhow::bail!("index.dims must be > 0");
    }

    // Validate retrieval
    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if !(0.0..1.0).contains(&config.retrieval.threshold) {
        anyhow::bail!("retrieval.threshold must be in [0.0, 1.0)");
    }

    // Validate ingestion
    if config.ingest.max_content_chars == 0 {
        anyhow::bail!("ingest.max_content_chars must be > 0");
    }
    if config.ingest.queue_capacity == 0 || config.ingest.concurrency == 0 {
        anyhow::bail!("ingest.queue_capacity and ingest.concurrency must be > 0");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }
    if config.embedding.is_enabled() && config.embedding.model.is_none() {
        anyhow::bail!(
            "embedding.model must be specified when provider is '{}'",
            config.embedding.provider
        );
    }

    // Validate synthesis
    match config.synthesis.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown synthesis provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    if config.synthesis.is_enabled() && config.synthesis.model.is_none() {
        anyhow::bail!(
            "synthesis.model must be specified when provider is '{}'",
            config.synthesis.provider
        );
    }
    if !(0.0..=2.0).contains(&config.synthesis.temperature) {
        anyhow::bail!("synthesis.temperature must be in [0.0, 2.0]");
    }
    if config.synthesis.max_tokens == 0 {
        anyhow::bail!("synthesis.max_tokens must be > 0");
    }

    Ok(())
}
