//! # Chat Recall
//!
//! **Retrieval-augmented question answering over a community chat archive.**
//!
//! Messages are captured, embedded, and indexed as they arrive; questions
//! are answered by retrieving semantically related prior messages and
//! synthesizing a grounded response with citations.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────┐
//! │  Listeners   │──▶│ Ingest queue │──▶│ Embed+Upsert │──┐
//! │ HTTP / JSONL │   │   (mpsc)     │   │   worker     │  │
//! └──────────────┘   └─────────────┘   └──────────────┘  ▼
//!                                                   ┌──────────┐
//! ┌──────────────┐   ┌─────────────────────────┐    │  SQLite  │
//! │ /api/chat    │──▶│ embed → top-k → filter  │◀───│  vectors │
//! │ recall ask   │   │ → normalize → synthesize│    └──────────┘
//! └──────────────┘   └─────────────────────────┘
//! ```
//!
//! The pipelines themselves live in [`chat_recall_core`]; this crate
//! provides the concrete providers, persistence, and the CLI/HTTP surfaces.
//!
//! ## Quick Start
//!
//! ```bash
//! recall init                        # create database
//! recall ingest messages.jsonl       # import an archive export
//! recall ask "What is the team working on?"
//! recall serve                       # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`app`] | Builds the service graph from configuration |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite implementation of the vector store |
//! | [`embedding`] | OpenAI / Ollama embedding providers |
//! | [`llm`] | Chat-completions client for synthesis |
//! | [`http`] | Provider HTTP calls with retry and backoff |
//! | [`ingest`] | Ingestion queue, worker, and JSONL import |
//! | [`server`] | HTTP API |
//! | [`ask`] | One-shot question from the CLI |
//! | [`stats`] | Index statistics |
//! | [`logging`] | Tracing subscriber setup |

pub mod app;
pub mod ask;
pub mod config;
pub mod db;
pub mod embedding;
pub mod http;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod migrate;
pub mod server;
pub mod sqlite_store;
pub mod stats;
