//! # Chat Recall Core
//!
//! Runtime-independent logic for Chat Recall: data models, the error
//! taxonomy, the embedding / vector-store / language-model traits, metadata
//! normalization, relevance filtering, prompt assembly, and the query and
//! ingestion pipelines built on top of them.
//!
//! This crate contains no tokio, sqlx, HTTP clients, or filesystem I/O.
//! Concrete providers and the persistent store live in the `chat-recall`
//! app crate and are injected as trait objects.

pub mod embedding;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod query;
pub mod store;
pub mod synthesis;

pub use error::{RecallError, Result};
