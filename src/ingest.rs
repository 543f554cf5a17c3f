//! Queue-based ingestion.
//!
//! Listeners (the HTTP webhook, the JSONL importer) validate a message and
//! enqueue it on a bounded channel; a worker task embeds and stores queued
//! messages with bounded concurrency. Delivery latency is therefore
//! independent of embedding latency, and a failed message is logged and
//! counted without affecting the listener.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use chat_recall_core::ingest::{IngestOutcome, IngestPipeline, MessageEvent, SkipReason};
use chat_recall_core::models::MessageRecord;

use crate::app::Services;
use crate::config::Config;

/// Result of handing one event to [`IngestQueue::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Queued,
    Skipped(SkipReason),
}

/// Counts reported by the worker when it drains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub stored: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    stored: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn record(&self, outcome: &IngestOutcome) {
        if outcome.is_stored() {
            self.stored.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn summary(&self) -> IngestSummary {
        IngestSummary {
            stored: self.stored.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Sending half of the ingestion queue. Cheap to clone.
#[derive(Clone)]
pub struct IngestQueue {
    tx: mpsc::Sender<MessageRecord>,
    pipeline: Arc<IngestPipeline>,
}

/// Handle to the background worker.
pub struct IngestWorker {
    handle: JoinHandle<IngestSummary>,
}

/// Start a worker and return the queue that feeds it.
pub fn spawn(
    pipeline: Arc<IngestPipeline>,
    capacity: usize,
    concurrency: usize,
) -> (IngestQueue, IngestWorker) {
    let (tx, rx) = mpsc::channel(capacity);
    let handle = tokio::spawn(run_worker(pipeline.clone(), rx, concurrency));
    (IngestQueue { tx, pipeline }, IngestWorker { handle })
}

impl IngestQueue {
    /// Validate `event` and enqueue it, waiting if the queue is full.
    ///
    /// # Errors
    ///
    /// Fails only when the worker has stopped.
    pub async fn submit(&self, event: MessageEvent) -> Result<Submission> {
        let id = event.id.clone();
        match self.pipeline.validate(event) {
            Ok(record) => {
                self.tx
                    .send(record)
                    .await
                    .map_err(|_| anyhow::anyhow!("ingestion worker is not running"))?;
                tracing::debug!(%id, "message queued");
                Ok(Submission::Queued)
            }
            Err(reason) => {
                tracing::debug!(%id, %reason, "message skipped");
                Ok(Submission::Skipped(reason))
            }
        }
    }
}

impl IngestWorker {
    /// Wait for the worker to drain. Returns once every [`IngestQueue`]
    /// clone has been dropped and all queued messages are processed.
    pub async fn finish(self) -> Result<IngestSummary> {
        self.handle.await.context("ingestion worker panicked")
    }
}

async fn run_worker(
    pipeline: Arc<IngestPipeline>,
    mut rx: mpsc::Receiver<MessageRecord>,
    concurrency: usize,
) -> IngestSummary {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let counters = Arc::new(Counters::default());
    let mut tasks = JoinSet::new();

    while let Some(record) = rx.recv().await {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => break,
        };
        let pipeline = pipeline.clone();
        let counters = counters.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let outcome = pipeline.process(&record).await;
            counters.record(&outcome);
            if outcome.is_stored() {
                if let Ok(stats) = pipeline.store().describe().await {
                    tracing::debug!(total_vectors = stats.total_count, "index size after upsert");
                }
            }
        });

        while let Some(res) = tasks.try_join_next() {
            log_join_error(res);
        }
    }

    while let Some(res) = tasks.join_next().await {
        log_join_error(res);
    }

    let summary = counters.summary();
    tracing::info!(stored = summary.stored, failed = summary.failed, "ingestion worker stopped");
    summary
}

fn log_join_error(res: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = res {
        tracing::error!(error = %e, "ingestion task aborted");
    }
}

/// Totals from a JSONL import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub lines: u64,
    pub invalid: u64,
    pub skipped: u64,
    pub queued: u64,
    pub stored: u64,
    pub failed: u64,
}

/// Feed every JSON line from `reader` through a fresh queue and wait for
/// the worker to drain. Malformed lines are logged and counted.
pub async fn import_events<R: AsyncBufRead + Unpin>(
    pipeline: Arc<IngestPipeline>,
    reader: R,
    capacity: usize,
    concurrency: usize,
) -> Result<ImportReport> {
    let (queue, worker) = spawn(pipeline, capacity, concurrency);
    let mut report = ImportReport::default();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        report.lines += 1;
        match serde_json::from_str::<MessageEvent>(line) {
            Ok(event) => match queue.submit(event).await? {
                Submission::Queued => report.queued += 1,
                Submission::Skipped(_) => report.skipped += 1,
            },
            Err(e) => {
                tracing::warn!(line = report.lines, error = %e, "invalid message event");
                report.invalid += 1;
            }
        }
    }

    drop(queue);
    let summary = worker.finish().await?;
    report.stored = summary.stored;
    report.failed = summary.failed;
    Ok(report)
}

/// `recall ingest <path>`: import a JSONL file (or `-` for stdin).
pub async fn run_ingest(config: &Config, path: &Path) -> Result<()> {
    let services = Services::from_config(config).await?;

    let report = if path == Path::new("-") {
        import_events(
            services.ingest.clone(),
            BufReader::new(tokio::io::stdin()),
            config.ingest.queue_capacity,
            config.ingest.concurrency,
        )
        .await?
    } else {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        import_events(
            services.ingest.clone(),
            BufReader::new(file),
            config.ingest.queue_capacity,
            config.ingest.concurrency,
        )
        .await?
    };

    println!("ingest {}", path.display());
    println!("  lines read: {}", report.lines);
    println!("  invalid: {}", report.invalid);
    println!("  skipped: {}", report.skipped);
    println!("  queued: {}", report.queued);
    println!("  stored: {}", report.stored);
    println!("  failed: {}", report.failed);
    println!("ok");
    Ok(())
}
