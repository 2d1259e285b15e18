use anyhow::Result;

use crate::config::Config;
use crate::store::SqliteStore;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let store = SqliteStore::connect(config).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lint_results (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            dedup_hash TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(store.pool())
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_lint_results_updated_at ON lint_results(updated_at DESC)",
    )
    .execute(store.pool())
    .await?;

    store.close().await;
    Ok(())
}
