//! Vector index abstraction for Chat Recall.
//!
//! The [`VectorStore`] trait is the single seam between the pipelines and
//! the concrete nearest-neighbour engine. Everything else depends only on
//! this contract, so the SQLite backend, the in-memory backend, or a hosted
//! index can be swapped without touching retrieval logic.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{RecallError, Result};
use crate::models::{CandidateMatch, Metadata};

/// Introspection result of [`VectorStore::describe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub total_count: u64,
    pub dimension: usize,
}

/// Abstract nearest-neighbour index keyed by opaque ids.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorStore::upsert) | Insert or replace the entry for an id |
/// | [`query`](VectorStore::query) | Top-k similarity search, best first |
/// | [`describe`](VectorStore::describe) | Entry count and configured dimension |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert the entry for `id`, or replace it entirely if one exists.
    ///
    /// Fails with [`RecallError::StoreWrite`] when the vector dimension
    /// differs from the index dimension or the backend is unavailable.
    async fn upsert(&self, id: &str, vector: &[f32], metadata: &Metadata) -> Result<()>;

    /// Return at most `top_k` matches in non-increasing score order.
    ///
    /// Fails with [`RecallError::StoreQuery`].
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<CandidateMatch>>;

    /// Report the number of entries and the configured dimension.
    async fn describe(&self) -> Result<IndexStats>;
}

/// Reject a write whose vector does not match the index dimension.
pub fn check_write_dims(vector: &[f32], dimension: usize) -> Result<()> {
    if vector.len() != dimension {
        return Err(RecallError::StoreWrite(format!(
            "vector has {} dimensions, index expects {}",
            vector.len(),
            dimension
        )));
    }
    Ok(())
}

/// Reject a query whose vector does not match the index dimension.
pub fn check_query_dims(vector: &[f32], dimension: usize) -> Result<()> {
    if vector.len() != dimension {
        return Err(RecallError::StoreQuery(format!(
            "query vector has {} dimensions, index expects {}",
            vector.len(),
            dimension
        )));
    }
    Ok(())
}

/// Sort candidates best-first and keep the top `top_k`.
///
/// Ties are broken by id so results are deterministic.
pub fn rank_candidates(mut candidates: Vec<CandidateMatch>, top_k: usize) -> Vec<CandidateMatch> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    candidates.truncate(top_k);
    candidates
}
