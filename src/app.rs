//! Construction of the service graph from configuration.
//!
//! Every external client (embedding model, vector index, language model) is
//! built once here and handed to the pipelines as a trait object. Tests
//! build [`Services::from_parts`] with doubles instead.

use anyhow::Result;
use std::sync::Arc;

use chat_recall_core::embedding::EmbeddingProvider;
use chat_recall_core::ingest::IngestPipeline;
use chat_recall_core::query::{QueryParams, QueryPipeline};
use chat_recall_core::store::VectorStore;
use chat_recall_core::synthesis::{LanguageModel, SynthesisEngine, SynthesisSettings};

use crate::config::Config;
use crate::sqlite_store::SqliteVectorStore;
use crate::{db, embedding, llm, migrate};

/// The wired-up pipelines plus the handles the HTTP and CLI layers need.
#[derive(Clone)]
pub struct Services {
    pub query: Arc<QueryPipeline>,
    pub ingest: Arc<IngestPipeline>,
    pub store: Arc<dyn VectorStore>,
    pub index_name: String,
}

impl Services {
    /// Open the index database and build providers named in `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply_schema(&pool).await?;
        let store: Arc<dyn VectorStore> =
            Arc::new(SqliteVectorStore::new(pool, config.index.dims));

        let embedder = embedding::create_provider(config)?;
        let model = llm::create_model(config)?;

        tracing::info!(
            index = %config.index.name,
            dims = config.index.dims,
            embedding = embedder.model_name(),
            synthesis = model.model_name(),
            "services ready"
        );

        Ok(Self::from_parts(
            embedder,
            store,
            model,
            config.synthesis.settings(),
            config.retrieval.params(),
            config.ingest.max_content_chars,
            config.index.name.clone(),
        ))
    }

    pub fn from_parts(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        model: Arc<dyn LanguageModel>,
        settings: SynthesisSettings,
        params: QueryParams,
        max_content_chars: usize,
        index_name: String,
    ) -> Self {
        let query = QueryPipeline::new(
            embedder.clone(),
            store.clone(),
            SynthesisEngine::new(model, settings),
            params,
        );
        let ingest = IngestPipeline::new(embedder, store.clone(), max_content_chars);
        Self {
            query: Arc::new(query),
            ingest: Arc::new(ingest),
            store,
            index_name,
        }
    }
}
