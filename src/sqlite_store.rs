//! SQLite-backed [`VectorStore`] implementation.
//!
//! Vectors are stored as little-endian f32 BLOBs in the `vectors` table
//! (see [`migrate`](crate::migrate)). Similarity queries are brute-force
//! cosine similarity over every row, which is adequate for a single
//! community's archive.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use chat_recall_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use chat_recall_core::models::{CandidateMatch, Metadata};
use chat_recall_core::store::{
    check_query_dims, check_write_dims, rank_candidates, IndexStats, VectorStore,
};
use chat_recall_core::{RecallError, Result};

/// SQLite implementation of the [`VectorStore`] trait.
pub struct SqliteVectorStore {
    pool: SqlitePool,
    dimension: usize,
}

impl SqliteVectorStore {
    pub fn new(pool: SqlitePool, dimension: usize) -> Self {
        Self { pool, dimension }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Metadata stored under `id`, if present.
    pub async fn metadata(&self, id: &str) -> Result<Option<Metadata>> {
        let row: Option<String> =
            sqlx::query_scalar("SELECT metadata_json FROM vectors WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(RecallError::store_query)?;
        row.map(|json| parse_metadata(&json)).transpose()
    }
}

fn parse_metadata(json: &str) -> Result<Metadata> {
    serde_json::from_str(json).map_err(RecallError::store_query)
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(&self, id: &str, vector: &[f32], metadata: &Metadata) -> Result<()> {
        check_write_dims(vector, self.dimension)?;
        let metadata_json = serde_json::to_string(metadata).map_err(RecallError::store_write)?;

        sqlx::query(
            r#"
            INSERT INTO vectors (id, embedding, dims, metadata_json, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                embedding = excluded.embedding,
                dims = excluded.dims,
                metadata_json = excluded.metadata_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(id)
        .bind(vec_to_blob(vector))
        .bind(vector.len() as i64)
        .bind(&metadata_json)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(RecallError::store_write)?;

        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<CandidateMatch>> {
        check_query_dims(vector, self.dimension)?;

        let rows = sqlx::query("SELECT id, embedding, metadata_json FROM vectors WHERE dims = ?")
            .bind(self.dimension as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(RecallError::store_query)?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let metadata_json: String = row.get("metadata_json");
            let id: String = row.get("id");
            let stored = blob_to_vec(&blob);
            // Rows from older writers may carry any JSON; fall back to empty
            // metadata so the normalizer supplies defaults.
            let metadata = parse_metadata(&metadata_json).unwrap_or_else(|e| {
                tracing::warn!(%id, error = %e, "unreadable metadata, using defaults");
                Metadata::new()
            });
            candidates.push(CandidateMatch {
                score: cosine_similarity(vector, &stored) as f64,
                id,
                metadata,
            });
        }

        Ok(rank_candidates(candidates, top_k))
    }

    /// Counts only rows of the configured dimension, the same rows
    /// [`query`](VectorStore::query) scans.
    async fn describe(&self) -> Result<IndexStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vectors WHERE dims = ?")
            .bind(self.dimension as i64)
            .fetch_one(&self.pool)
            .await
            .map_err(RecallError::store_query)?;

        Ok(IndexStats {
            total_count: total as u64,
            dimension: self.dimension,
        })
    }
}
