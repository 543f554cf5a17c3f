//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that every embedding backend
//! implements, plus pure helpers for vector validation, serialization, and
//! similarity computation.
//!
//! Concrete providers (OpenAI, Ollama, disabled) live in the `chat-recall`
//! app crate.

use async_trait::async_trait;

use crate::error::{RecallError, Result};

/// Trait for embedding providers.
///
/// Both the ingestion path and the query path embed through this trait,
/// so every vector written to or compared against one index comes from the
/// same model and has [`dims`](EmbeddingProvider::dims) components.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Embed a single non-empty text.
    ///
    /// Fails with [`RecallError::Embedding`] on any model-call failure.
    /// Never returns a placeholder vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Check that a provider response has the expected shape.
///
/// Rejects empty vectors, vectors whose length differs from `dims`, and
/// vectors containing non-finite values.
pub fn validate_embedding(vector: Vec<f32>, dims: usize) -> Result<Vec<f32>> {
    if vector.is_empty() {
        return Err(RecallError::Embedding("model returned an empty vector".into()));
    }
    if vector.len() != dims {
        return Err(RecallError::Embedding(format!(
            "model returned {} dimensions, expected {}",
            vector.len(),
            dims
        )));
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(RecallError::Embedding(
            "model returned non-finite components".into(),
        ));
    }
    Ok(vector)
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use chat_recall_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB produced by [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors
/// of different lengths, or zero-magnitude vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
