//! Error taxonomy shared by every pipeline stage.

use thiserror::Error;

/// Failure of one stage of the ingestion or query pipeline.
///
/// Each variant carries a human-readable detail for the logs. Callers at
/// the HTTP boundary never forward that detail to clients.
#[derive(Debug, Error)]
pub enum RecallError {
    /// The embedding model was unreachable, rejected the input, or returned
    /// a vector of the wrong shape.
    #[error("embedding failed: {0}")]
    Embedding(String),
    /// The vector index refused or failed an upsert.
    #[error("vector store write failed: {0}")]
    StoreWrite(String),
    /// The vector index failed a similarity query or introspection call.
    #[error("vector store query failed: {0}")]
    StoreQuery(String),
    /// The generation model failed to produce an answer.
    #[error("synthesis failed: {0}")]
    Synthesis(String),
    /// Malformed caller input.
    #[error("invalid input: {0}")]
    Validation(String),
}

impl RecallError {
    pub fn embedding(err: impl std::fmt::Display) -> Self {
        RecallError::Embedding(err.to_string())
    }

    pub fn store_write(err: impl std::fmt::Display) -> Self {
        RecallError::StoreWrite(err.to_string())
    }

    pub fn store_query(err: impl std::fmt::Display) -> Self {
        RecallError::StoreQuery(err.to_string())
    }

    pub fn synthesis(err: impl std::fmt::Display) -> Self {
        RecallError::Synthesis(err.to_string())
    }

    /// Short, stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RecallError::Embedding(_) => "embedding",
            RecallError::StoreWrite(_) => "store_write",
            RecallError::StoreQuery(_) => "store_query",
            RecallError::Synthesis(_) => "synthesis",
            RecallError::Validation(_) => "validation",
        }
    }
}

pub type Result<T, E = RecallError> = std::result::Result<T, E>;
