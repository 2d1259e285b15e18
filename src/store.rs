//! SQLite-backed document store for validated lint results.
//!
//! One row per repository, keyed by the lowercased `path_with_namespace`.
//! Writes are upsert-only: repeating a key overwrites the stored document
//! idempotently while preserving its original `created_at`.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;

use crate::config::Config;

/// Accepts `(key, typed document)` pairs and persists them.
///
/// Mirrors what the crawler needs from the store and nothing more, so tests
/// can substitute an in-memory sink.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Persist `value` under `key`, overwriting any previous document.
    async fn upsert(&self, key: &str, value: &Value) -> Result<()>;
}

/// A stored lint document with its bookkeeping columns.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub key: String,
    pub value: Value,
    pub dedup_hash: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// SQLite-backed [`DocumentSink`].
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (and create if missing) the database at the configured path.
    pub async fn connect(config: &Config) -> Result<Self> {
        let db_path = &config.db.path;

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Fetch a stored document by key.
    pub async fn get(&self, key: &str) -> Result<Option<StoredDocument>> {
        let row = sqlx::query(
            "SELECT key, value, dedup_hash, created_at, updated_at FROM lint_results WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row.get("value");
        let value: Value = serde_json::from_str(&raw).unwrap_or(Value::Null);

        Ok(Some(StoredDocument {
            key: row.get("key"),
            value,
            dedup_hash: row.get("dedup_hash"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }

    /// Number of stored documents.
    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lint_results")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

#[async_trait]
impl DocumentSink for SqliteStore {
    async fn upsert(&self, key: &str, value: &Value) -> Result<()> {
        let serialized = serde_json::to_string(value)?;

        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hasher.update(serialized.as_bytes());
        let dedup_hash = format!("{:x}", hasher.finalize());

        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO lint_results (key, value, dedup_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                dedup_hash = excluded.dedup_hash,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(&serialized)
        .bind(&dedup_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlConfig, DbConfig, GitlabConfig};
    use serde_json::json;

    fn test_config(dir: &std::path::Path) -> Config {
        Config {
            gitlab: GitlabConfig {
                endpoint: "https://gitlab.example.com/api/v4/".to_string(),
                per_page: 100,
                min_access_level: 30,
            },
            db: DbConfig {
                path: dir.join("cih.sqlite"),
            },
            crawl: CrawlConfig::default(),
        }
    }

    #[tokio::test]
    async fn upsert_overwrites_on_repeat_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());

        crate::migrate::run_migrations(&config).await.unwrap();
        let store = SqliteStore::connect(&config).await.unwrap();

        store
            .upsert("group/project", &json!({"valid": true}))
            .await
            .unwrap();
        store
            .upsert("group/project", &json!({"valid": false}))
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let doc = store.get("group/project").await.unwrap().unwrap();
        assert_eq!(doc.value, json!({"valid": false}));
        store.close().await;
    }

    #[tokio::test]
    async fn get_returns_none_for_unknown_key() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());

        crate::migrate::run_migrations(&config).await.unwrap();
        let store = SqliteStore::connect(&config).await.unwrap();
        assert!(store.get("nope/nothing").await.unwrap().is_none());
        store.close().await;
    }
}
