//! Query pipeline: question → embedding → top-k retrieval → normalization
//! → relevance filter → synthesis → answer with sources.
//!
//! Every step is a single sequential call against an injected service. Any
//! failure aborts the query; no partial answer is produced. The pipeline
//! holds no per-query state, so one instance serves concurrent queries.

use std::sync::Arc;

use crate::embedding::EmbeddingProvider;
use crate::error::{RecallError, Result};
use crate::filter::{filter_relevant, DEFAULT_THRESHOLD};
use crate::models::{Answer, ContextRecord, Source};
use crate::normalize::normalize;
use crate::store::VectorStore;
use crate::synthesis::SynthesisEngine;

/// Canned answer returned when nothing clears the relevance threshold.
pub const NO_CONTEXT_RESPONSE: &str = "I couldn't find any relevant information in the chat history about that topic. Could you rephrase your question or ask about something else?";

/// Retrieval tuning parameters, decoupled from application config.
#[derive(Debug, Clone)]
pub struct QueryParams {
    /// Number of nearest matches requested from the store.
    pub top_k: usize,
    /// Candidates with `score <= threshold` are dropped.
    pub threshold: f64,
    /// Maximum citations attached to an answer.
    pub max_sources: usize,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            top_k: 5,
            threshold: DEFAULT_THRESHOLD,
            max_sources: 3,
        }
    }
}

/// The retrieval-and-synthesis pipeline.
pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    engine: SynthesisEngine,
    params: QueryParams,
}

impl QueryPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        engine: SynthesisEngine,
        params: QueryParams,
    ) -> Self {
        Self {
            embedder,
            store,
            engine,
            params,
        }
    }

    /// Embed the query and return the filtered, normalized context records
    /// in store order.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ContextRecord>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RecallError::Validation("query must not be empty".into()));
        }

        let vector = self.embedder.embed(query).await?;
        let candidates = self.store.query(&vector, self.params.top_k).await?;
        let returned = candidates.len();

        for c in &candidates {
            tracing::debug!(id = %c.id, score = c.score, fields = c.metadata.len(), "candidate match");
        }

        let contexts: Vec<ContextRecord> = filter_relevant(candidates, self.params.threshold)
            .iter()
            .map(normalize)
            .collect();

        tracing::info!(
            returned,
            kept = contexts.len(),
            threshold = self.params.threshold,
            "retrieved context"
        );
        Ok(contexts)
    }

    /// Answer a question from the index.
    ///
    /// When no context survives the filter the language model is not
    /// called and [`NO_CONTEXT_RESPONSE`] is returned with no sources.
    pub async fn answer(&self, query: &str) -> Result<Answer> {
        let contexts = self.retrieve(query).await?;
        if contexts.is_empty() {
            return Ok(Answer {
                text: NO_CONTEXT_RESPONSE.to_string(),
                sources: Vec::new(),
            });
        }

        let text = self.engine.synthesize(query, &contexts).await?;
        let sources = contexts
            .iter()
            .take(self.params.max_sources)
            .map(Source::from)
            .collect();

        Ok(Answer { text, sources })
    }
}
