//! Integration tests for the query and ingestion pipelines over the SQLite
//! store and the HTTP API.
//!
//! The embedding and language models are replaced with deterministic
//! doubles; everything else (schema, upsert, cosine ranking, queue,
//! router) is the production code path.

use async_trait::async_trait;
use chat_recall::app::Services;
use chat_recall::ingest::{import_events, spawn};
use chat_recall::server::{router, AppState, StatsResponse};
use chat_recall::sqlite_store::SqliteVectorStore;
use chat_recall::{db, migrate};
use chat_recall_core::embedding::{vec_to_blob, EmbeddingProvider};
use chat_recall_core::ingest::MessageEvent;
use chat_recall_core::query::{QueryParams, NO_CONTEXT_RESPONSE};
use chat_recall_core::store::VectorStore;
use chat_recall_core::synthesis::{CompletionRequest, LanguageModel, SynthesisSettings};
use chat_recall_core::{RecallError, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

// ─── Test doubles ───────────────────────────────────────────────────

/// Embeds text onto three topic axes by keyword.
struct TopicEmbedder;

#[async_trait]
impl EmbeddingProvider for TopicEmbedder {
    fn model_name(&self) -> &str {
        "topic"
    }
    fn dims(&self) -> usize {
        3
    }
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.to_lowercase();
        if text.contains("explode") {
            return Err(RecallError::embedding("model overloaded"));
        }
        let v = if text.contains("suspension") {
            vec![1.0, 0.0, 0.0]
        } else if text.contains("pizza") {
            vec![0.0, 1.0, 0.0]
        } else if text.contains("car") {
            vec![0.6, 0.0, 0.8]
        } else {
            vec![0.0, 0.0, 1.0]
        };
        Ok(v)
    }
}

/// Fails every call with a detail that must never reach HTTP clients.
struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn model_name(&self) -> &str {
        "failing"
    }
    fn dims(&self) -> usize {
        3
    }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RecallError::embedding("quota exceeded for key sk-test-123"))
    }
}

/// Answers long after any reasonable request timeout.
struct SlowEmbedder;

#[async_trait]
impl EmbeddingProvider for SlowEmbedder {
    fn model_name(&self) -> &str {
        "slow"
    }
    fn dims(&self) -> usize {
        3
    }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(vec![1.0, 0.0, 0.0])
    }
}

/// Records every prompt it receives and answers with a fixed string.
#[derive(Default)]
struct RecordingModel {
    calls: AtomicUsize,
    last_user: Mutex<Option<String>>,
}

#[async_trait]
impl LanguageModel for RecordingModel {
    fn model_name(&self) -> &str {
        "recording"
    }
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_user.lock().unwrap() = Some(request.user.clone());
        Ok("The suspension geometry was finalized last week.".to_string())
    }
}

struct Harness {
    _tmp: TempDir,
    store: Arc<SqliteVectorStore>,
    model: Arc<RecordingModel>,
    services: Services,
}

async fn harness() -> Harness {
    harness_with(Arc::new(TopicEmbedder)).await
}

async fn harness_with(embedder: Arc<dyn EmbeddingProvider>) -> Harness {
    let tmp = TempDir::new().unwrap();
    let pool = db::connect_path(&tmp.path().join("recall.sqlite"))
        .await
        .unwrap();
    migrate::apply_schema(&pool).await.unwrap();

    let store = Arc::new(SqliteVectorStore::new(pool, 3));
    let model = Arc::new(RecordingModel::default());
    let services = Services::from_parts(
        embedder,
        store.clone(),
        model.clone(),
        SynthesisSettings::default(),
        QueryParams::default(),
        1000,
        "test-archive".to_string(),
    );

    Harness {
        _tmp: tmp,
        store,
        model,
        services,
    }
}

fn event(id: &str, author: &str, channel: Option<&str>, content: &str) -> MessageEvent {
    serde_json::from_value(json!({
        "id": id,
        "author": author,
        "channel": channel,
        "guild": channel.map(|_| "Racing"),
        "content": content,
        "created_at": "2024-03-01T10:00:00Z",
    }))
    .unwrap()
}

// ─── Ingestion ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_ingested_message_is_retrievable_with_metadata() {
    let h = harness().await;
    let outcome = h
        .services
        .ingest
        .handle(event(
            "m1",
            "alice",
            Some("engineering"),
            "Suspension geometry is final",
        ))
        .await;
    assert!(outcome.is_stored());

    let meta = h.store.metadata("m1").await.unwrap().unwrap();
    assert_eq!(meta["message_id"], "m1");
    assert_eq!(meta["author"], "alice");
    assert_eq!(meta["channel"], "engineering");
    assert_eq!(meta["guild"], "Racing");
    assert_eq!(meta["content"], "Suspension geometry is final");
    assert!(meta["timestamp"].as_str().unwrap().starts_with("2024-03-01T10:00:00"));
}

#[tokio::test]
async fn test_direct_messages_use_dm_scope() {
    let h = harness().await;
    h.services
        .ingest
        .handle(event("m1", "bob", None, "ordering pizza tonight"))
        .await;

    let meta = h.store.metadata("m1").await.unwrap().unwrap();
    assert_eq!(meta["channel"], "DM");
    assert_eq!(meta["guild"], "DM");
}

#[tokio::test]
async fn test_redelivery_keeps_single_entry() {
    let h = harness().await;
    h.services
        .ingest
        .handle(event("m1", "alice", Some("general"), "first draft about pizza"))
        .await;
    h.services
        .ingest
        .handle(event("m1", "alice", Some("general"), "edited: suspension notes"))
        .await;

    let stats = h.store.describe().await.unwrap();
    assert_eq!(stats.total_count, 1);
    assert_eq!(stats.dimension, 3);

    let meta = h.store.metadata("m1").await.unwrap().unwrap();
    assert_eq!(meta["content"], "edited: suspension notes");

    // The vector was replaced too: the entry now ranks for suspension.
    let matches = h.store.query(&[1.0, 0.0, 0.0], 5).await.unwrap();
    assert_eq!(matches[0].id, "m1");
    assert!(matches[0].score > 0.99);
}

#[tokio::test]
async fn test_import_reports_each_outcome() {
    let h = harness().await;
    let input = [
        json!({"id": "1", "author": "alice", "channel": "engineering", "content": "suspension is done", "created_at": "2024-03-01T10:00:00Z"}).to_string(),
        json!({"id": "2", "author": "bot", "bot": true, "content": "beep", "created_at": "2024-03-01T10:00:00Z"}).to_string(),
        json!({"id": "3", "author": "carol", "content": "this will explode", "created_at": "2024-03-01T10:00:00Z"}).to_string(),
        "{broken".to_string(),
        json!({"id": "4", "author": "dave", "channel": "food", "content": "pizza on friday", "created_at": "2024-03-01T10:00:00Z"}).to_string(),
    ]
    .join("\n");

    let report = import_events(h.services.ingest.clone(), input.as_bytes(), 8, 2)
        .await
        .unwrap();

    assert_eq!(report.lines, 5);
    assert_eq!(report.invalid, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.queued, 3);
    assert_eq!(report.stored, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(h.store.describe().await.unwrap().total_count, 2);
}

// ─── Query ──────────────────────────────────────────────────────────

async fn insert_raw(store: &SqliteVectorStore, id: &str, vector: &[f32], metadata_json: &str) {
    sqlx::query(
        "INSERT INTO vectors (id, embedding, dims, metadata_json, updated_at) VALUES (?, ?, ?, ?, 0)",
    )
    .bind(id)
    .bind(vec_to_blob(vector))
    .bind(vector.len() as i64)
    .bind(metadata_json)
    .execute(store.pool())
    .await
    .unwrap();
}

#[tokio::test]
async fn test_unreadable_metadata_degrades_to_defaults() {
    let h = harness().await;
    h.services
        .ingest
        .handle(event("m1", "alice", Some("engineering"), "Suspension geometry is final"))
        .await;
    insert_raw(&h.store, "legacy", &[1.0, 0.0, 0.0], "null").await;

    let matches = h.store.query(&[1.0, 0.0, 0.0], 5).await.unwrap();
    assert_eq!(matches.len(), 2);
    let legacy = matches.iter().find(|m| m.id == "legacy").unwrap();
    assert!(legacy.metadata.is_empty());

    let answer = h.services.query.answer("suspension?").await.unwrap();
    assert_eq!(answer.sources.len(), 2);
    assert!(answer
        .sources
        .iter()
        .any(|s| s.author == "Unknown" && s.channel == "Unknown"));
    assert!(answer.sources.iter().any(|s| s.author == "alice"));
}

#[tokio::test]
async fn test_describe_ignores_rows_of_other_dimensions() {
    let h = harness().await;
    h.services
        .ingest
        .handle(event("m1", "alice", Some("engineering"), "Suspension geometry is final"))
        .await;
    insert_raw(&h.store, "old-model", &[1.0, 0.0], "{}").await;

    let stats = h.store.describe().await.unwrap();
    assert_eq!(stats.total_count, 1);
    let matches = h.store.query(&[1.0, 0.0, 0.0], 5).await.unwrap();
    assert_eq!(matches.len(), 1);
}

#[tokio::test]
async fn test_answer_cites_ranked_relevant_sources() {
    let h = harness().await;
    let ingest = &h.services.ingest;
    ingest
        .handle(event("m1", "alice", Some("engineering"), "Suspension geometry is final"))
        .await;
    ingest
        .handle(event("m2", "bob", Some("garage"), "The car chassis is welded"))
        .await;
    ingest
        .handle(event("m3", "carol", Some("food"), "Pizza order for the meetup"))
        .await;

    let answer = h.services.query.answer("how is the suspension going?").await.unwrap();

    assert_eq!(answer.text, "The suspension geometry was finalized last week.");
    assert_eq!(answer.sources.len(), 2);
    assert_eq!(answer.sources[0].author, "alice");
    assert_eq!(answer.sources[0].channel, "engineering");
    assert_eq!(answer.sources[0].relevance, 100.0);
    assert_eq!(answer.sources[1].author, "bob");
    assert_eq!(answer.sources[1].relevance, 60.0);

    let prompt = h.model.last_user.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("From alice in #engineering:\nSuspension geometry is final"));
    assert!(prompt.contains("From bob in #garage:\nThe car chassis is welded"));
    assert!(!prompt.contains("Pizza"));
}

#[tokio::test]
async fn test_empty_index_returns_fallback_without_synthesis() {
    let h = harness().await;

    let answer = h.services.query.answer("anything about suspension?").await.unwrap();

    assert_eq!(answer.text, NO_CONTEXT_RESPONSE);
    assert!(answer.sources.is_empty());
    assert_eq!(h.model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_orthogonal_matches_are_filtered_out() {
    let h = harness().await;
    h.services
        .ingest
        .handle(event("m1", "carol", Some("food"), "Pizza order for the meetup"))
        .await;

    let answer = h.services.query.answer("suspension status").await.unwrap();
    assert_eq!(answer.text, NO_CONTEXT_RESPONSE);
    assert_eq!(h.model.calls.load(Ordering::SeqCst), 0);
}

// ─── HTTP API ───────────────────────────────────────────────────────

async fn serve(h: &Harness) -> String {
    serve_with_timeout(h, Duration::from_secs(10)).await
}

async fn serve_with_timeout(h: &Harness, request_timeout: Duration) -> String {
    let (queue, _worker) = spawn(h.services.ingest.clone(), 16, 2);
    let state = AppState::new(&h.services, queue, request_timeout);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_health_endpoint() {
    let h = harness().await;
    let base = serve(&h).await;

    let body: Value = reqwest::get(format!("{}/api/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_chat_rejects_missing_and_blank_messages() {
    let h = harness().await;
    let base = serve(&h).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/chat", base))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "No message provided");

    let resp = client
        .post(format!("{}/api/chat", base))
        .json(&json!({ "message": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Empty message");
    assert_eq!(h.model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_messages_then_chat_round_trip() {
    let h = harness().await;
    let base = serve(&h).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/messages", base))
        .json(&json!({
            "id": "m1",
            "author": "alice",
            "channel": "engineering",
            "guild": "Racing",
            "content": "Suspension geometry is final",
            "created_at": "2024-03-01T10:00:00Z",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "queued");

    // The worker stores asynchronously; poll stats until it lands.
    let mut total = 0;
    for _ in 0..50 {
        let stats: StatsResponse = client
            .get(format!("{}/api/stats", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(stats.index_name, "test-archive");
        assert_eq!(stats.dimension, 3);
        total = stats.total_vectors;
        if total == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(total, 1);

    let resp = client
        .post(format!("{}/api/chat", base))
        .json(&json!({ "message": "suspension?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["response"], "The suspension geometry was finalized last week.");
    assert_eq!(body["sources"][0]["author"], "alice");
    assert_eq!(body["sources"][0]["channel"], "engineering");
    assert_eq!(body["sources"][0]["relevance"], 100.0);
}

#[tokio::test]
async fn test_bot_message_is_acknowledged_and_skipped() {
    let h = harness().await;
    let base = serve(&h).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/messages", base))
        .json(&json!({
            "id": "b1",
            "author": "helper",
            "bot": true,
            "content": "automated reply",
            "created_at": "2024-03-01T10:00:00Z",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "skipped");
    assert_eq!(body["reason"], "bot_author");
}

#[tokio::test]
async fn test_chat_with_empty_index_returns_fallback() {
    let h = harness().await;
    let base = serve(&h).await;

    let body: Value = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({ "message": "who won the race?" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["response"], NO_CONTEXT_RESPONSE);
    assert_eq!(body["sources"], json!([]));
}

#[tokio::test]
async fn test_chat_pipeline_failure_returns_generic_500() {
    let h = harness_with(Arc::new(FailingEmbedder)).await;
    let base = serve(&h).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({ "message": "what happened?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let text = resp.text().await.unwrap();
    assert!(!text.contains("quota"));
    assert!(!text.contains("sk-test"));
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        body,
        json!({ "error": "An error occurred processing your request. Please try again." })
    );
    assert_eq!(h.model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_chat_timeout_returns_504() {
    let h = harness_with(Arc::new(SlowEmbedder)).await;
    let base = serve_with_timeout(&h, Duration::from_millis(100)).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({ "message": "anyone there?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 504);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "request timed out");
}
