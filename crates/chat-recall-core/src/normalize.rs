//! Metadata normalization.
//!
//! Entries in one index may have been written by different ingestion
//! versions, each with its own metadata field names. [`normalize`] maps a
//! [`CandidateMatch`] to a [`ContextRecord`] by walking an ordered alias
//! list per canonical field and taking the first non-empty value. Missing
//! fields degrade to a default; normalization never fails.
//!
//! To accept a new legacy field name, add it to the relevant alias table.

use serde_json::Value;

use crate::models::{CandidateMatch, ContextRecord, Metadata};

/// Ordered aliases for one canonical field, plus its fallback.
#[derive(Debug, Clone, Copy)]
pub struct FieldAliases {
    pub aliases: &'static [&'static str],
    pub default: &'static str,
}

pub const CONTENT: FieldAliases = FieldAliases {
    aliases: &["content", "text", "message", "message_content"],
    default: "",
};

pub const AUTHOR: FieldAliases = FieldAliases {
    aliases: &["author", "author_name", "username", "user"],
    default: "Unknown",
};

pub const CHANNEL: FieldAliases = FieldAliases {
    aliases: &["channel", "channel_name", "channel_id"],
    default: "Unknown",
};

pub const TIMESTAMP: FieldAliases = FieldAliases {
    aliases: &["timestamp", "created_at"],
    default: "",
};

/// First non-empty value among `aliases`, in priority order.
///
/// Strings are taken as-is; numbers are rendered in decimal. Empty strings,
/// nulls, booleans, and nested values are skipped.
pub fn resolve_field(metadata: &Metadata, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|key| match metadata.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

impl FieldAliases {
    pub fn resolve(&self, metadata: &Metadata) -> String {
        resolve_field(metadata, self.aliases).unwrap_or_else(|| self.default.to_string())
    }
}

/// Build the canonical context record for a match.
pub fn normalize(candidate: &CandidateMatch) -> ContextRecord {
    let meta = &candidate.metadata;
    ContextRecord {
        content: CONTENT.resolve(meta),
        author: AUTHOR.resolve(meta),
        channel: CHANNEL.resolve(meta),
        timestamp: TIMESTAMP.resolve(meta),
        score: candidate.score,
    }
}
