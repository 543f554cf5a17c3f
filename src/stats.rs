//! Index statistics.
//!
//! Prints a short summary of what is indexed so operators can confirm the
//! ingestion worker is writing. Used by `recall stats`.

use anyhow::Result;

use chat_recall_core::store::VectorStore;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteVectorStore;

/// Run the stats command: query the index and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteVectorStore::new(pool, config.index.dims);
    let stats = store.describe().await?;

    let last_write: Option<i64> = sqlx::query_scalar("SELECT MAX(updated_at) FROM vectors")
        .fetch_one(store.pool())
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Chat Recall — Index Stats");
    println!("=========================");
    println!();
    println!("  Index:       {}", config.index.name);
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Vectors:     {}", stats.total_count);
    println!("  Dimension:   {}", stats.dimension);
    println!(
        "  Last write:  {}",
        last_write.map(format_ts_iso).unwrap_or_else(|| "never".to_string())
    );
    println!();

    store.pool().close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
