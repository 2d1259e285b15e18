//! Stored-document retrieval by key.

use anyhow::Result;

use crate::config::Config;
use crate::store::SqliteStore;

/// CLI entry point — prints a stored lint document.
pub async fn run_get(config: &Config, key: &str) -> Result<()> {
    let store = SqliteStore::connect(config).await?;
    let doc = store.get(key).await?;
    store.close().await;

    let Some(doc) = doc else {
        eprintln!("Error: no document stored under key '{key}'");
        std::process::exit(1);
    };

    println!("--- Document ---");
    println!("key:        {}", doc.key);
    println!("dedup_hash: {}", doc.dedup_hash);
    println!("created_at: {}", format_ts_iso(doc.created_at));
    println!("updated_at: {}", format_ts_iso(doc.updated_at));
    println!();
    println!("{}", serde_json::to_string_pretty(&doc.value)?);

    Ok(())
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
