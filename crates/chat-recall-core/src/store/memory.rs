//! In-memory [`VectorStore`] implementation for tests and embedded use.
//!
//! Uses a `HashMap` behind `std::sync::RwLock`. Queries are brute-force
//! cosine similarity over every stored vector.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::{RecallError, Result};
use crate::models::{CandidateMatch, Metadata};

use super::{check_query_dims, check_write_dims, rank_candidates, IndexStats, VectorStore};

#[derive(Debug, Clone)]
struct StoredEntry {
    vector: Vec<f32>,
    metadata: Metadata,
}

/// In-memory index with a fixed dimension.
pub struct InMemoryVectorStore {
    dimension: usize,
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl InMemoryVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Metadata currently stored under `id`, if any.
    pub fn metadata(&self, id: &str) -> Option<Metadata> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(id).map(|e| e.metadata.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, id: &str, vector: &[f32], metadata: &Metadata) -> Result<()> {
        check_write_dims(vector, self.dimension)?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| RecallError::StoreWrite("index lock poisoned".into()))?;
        entries.insert(
            id.to_string(),
            StoredEntry {
                vector: vector.to_vec(),
                metadata: metadata.clone(),
            },
        );
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<CandidateMatch>> {
        check_query_dims(vector, self.dimension)?;
        let entries = self
            .entries
            .read()
            .map_err(|_| RecallError::StoreQuery("index lock poisoned".into()))?;
        let candidates = entries
            .iter()
            .map(|(id, entry)| CandidateMatch {
                id: id.clone(),
                score: cosine_similarity(vector, &entry.vector) as f64,
                metadata: entry.metadata.clone(),
            })
            .collect();
        Ok(rank_candidates(candidates, top_k))
    }

    async fn describe(&self) -> Result<IndexStats> {
        let entries = self
            .entries
            .read()
            .map_err(|_| RecallError::StoreQuery("index lock poisoned".into()))?;
        Ok(IndexStats {
            total_count: entries.len() as u64,
            dimension: self.dimension,
        })
    }
}
