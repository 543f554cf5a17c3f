//! Per-message ingestion: `received → validated → embedded → stored`.
//!
//! Messages from non-human authors or with blank content exit early as
//! skipped. Embedding and store failures are logged and also end as
//! skipped; a bad message never surfaces an error to the listener that
//! delivered it. Redelivery of the same id is safe because the store
//! upsert replaces the existing entry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingProvider;
use crate::models::MessageRecord;
use crate::store::VectorStore;

/// Default bound on stored message content, in characters.
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 1000;

/// Scope label used when a message has no channel or guild.
pub const DIRECT_MESSAGE_SCOPE: &str = "DM";

/// A raw message event as delivered by a chat-platform listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub id: String,
    pub author: String,
    /// Set when the author is a bot or other non-human agent.
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub guild: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Why a message was not indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    BotAuthor,
    EmptyContent,
    EmbeddingFailed,
    StoreFailed,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SkipReason::BotAuthor => "bot author",
            SkipReason::EmptyContent => "empty content",
            SkipReason::EmbeddingFailed => "embedding failed",
            SkipReason::StoreFailed => "store failed",
        };
        f.write_str(label)
    }
}

/// Terminal state of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Stored { id: String },
    Skipped { id: String, reason: SkipReason },
}

impl IngestOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, IngestOutcome::Stored { .. })
    }
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Embeds validated messages and writes them to the index.
pub struct IngestPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    max_content_chars: usize,
}

impl IngestPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        max_content_chars: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            max_content_chars,
        }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// `received → validated`, or the reason the message is skipped.
    pub fn validate(&self, event: MessageEvent) -> Result<MessageRecord, SkipReason> {
        if event.bot {
            return Err(SkipReason::BotAuthor);
        }
        if event.content.trim().is_empty() {
            return Err(SkipReason::EmptyContent);
        }
        Ok(MessageRecord {
            content: truncate_chars(&event.content, self.max_content_chars),
            channel: event
                .channel
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DIRECT_MESSAGE_SCOPE.to_string()),
            guild: event
                .guild
                .filter(|g| !g.is_empty())
                .unwrap_or_else(|| DIRECT_MESSAGE_SCOPE.to_string()),
            id: event.id,
            author: event.author,
            created_at: event.created_at,
        })
    }

    /// `validated → embedded → stored`. Failures end as skipped.
    pub async fn process(&self, record: &MessageRecord) -> IngestOutcome {
        let vector = match self.embedder.embed(&record.content).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(id = %record.id, error = %e, "embedding failed, message skipped");
                return IngestOutcome::Skipped {
                    id: record.id.clone(),
                    reason: SkipReason::EmbeddingFailed,
                };
            }
        };

        if let Err(e) = self
            .store
            .upsert(&record.id, &vector, &record.metadata())
            .await
        {
            tracing::warn!(id = %record.id, error = %e, "upsert failed, message skipped");
            return IngestOutcome::Skipped {
                id: record.id.clone(),
                reason: SkipReason::StoreFailed,
            };
        }

        tracing::info!(
            id = %record.id,
            author = %record.author,
            channel = %record.channel,
            "stored message"
        );
        IngestOutcome::Stored {
            id: record.id.clone(),
        }
    }

    /// Run one event through the whole state machine.
    pub async fn handle(&self, event: MessageEvent) -> IngestOutcome {
        let id = event.id.clone();
        match self.validate(event) {
            Ok(record) => self.process(&record).await,
            Err(reason) => {
                tracing::debug!(id = %id, %reason, "message skipped");
                IngestOutcome::Skipped { id, reason }
            }
        }
    }
}
