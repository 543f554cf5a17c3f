//! Core data models that flow through the ingestion and query pipelines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata attached to an indexed entry: string keys mapped to string or
/// numeric JSON values.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A captured chat message, validated and ready to be embedded.
///
/// `content` is already truncated to the configured bound. Built by
/// [`IngestPipeline::validate`](crate::ingest::IngestPipeline::validate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub author: String,
    pub channel: String,
    pub guild: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    /// Metadata stored next to the message vector.
    pub fn metadata(&self) -> Metadata {
        let mut meta = Metadata::new();
        meta.insert("message_id".into(), self.id.clone().into());
        meta.insert("author".into(), self.author.clone().into());
        meta.insert("channel".into(), self.channel.clone().into());
        meta.insert("guild".into(), self.guild.clone().into());
        meta.insert("content".into(), self.content.clone().into());
        meta.insert("timestamp".into(), self.created_at.to_rfc3339().into());
        meta
    }
}

/// A similarity-query hit returned by a [`VectorStore`](crate::store::VectorStore).
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMatch {
    pub id: String,
    /// Cosine similarity; higher is more similar.
    pub score: f64,
    pub metadata: Metadata,
}

/// Canonical view of a [`CandidateMatch`], independent of which ingestion
/// version wrote its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextRecord {
    pub content: String,
    pub author: String,
    pub channel: String,
    pub timestamp: String,
    pub score: f64,
}

/// A citation attached to an [`Answer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub author: String,
    pub channel: String,
    pub timestamp: String,
    /// Similarity as a percentage rounded to one decimal place.
    pub relevance: f64,
}

impl From<&ContextRecord> for Source {
    fn from(ctx: &ContextRecord) -> Self {
        Source {
            author: ctx.author.clone(),
            channel: ctx.channel.clone(),
            timestamp: ctx.timestamp.clone(),
            relevance: relevance_percent(ctx.score),
        }
    }
}

/// The result of answering one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(rename = "response")]
    pub text: String,
    pub sources: Vec<Source>,
}

/// Convert a similarity score to a percentage with one decimal place.
pub fn relevance_percent(score: f64) -> f64 {
    (score * 1000.0).round() / 10.0
}
