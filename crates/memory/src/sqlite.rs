//! SQLite store: the durable record of every run.
//!
//! Uses a single SQLite database file with two append-only tables:
//! - `observations (id, target, tool, output)`
//! - `findings (id, target, vulnerability, details)` where `details` is JSON
//!
//! Each insert commits on its own, so a crash mid-cycle leaves a
//! partial-but-consistent history. The pool holds one connection: the store
//! has a single writer and no internal concurrency control beyond that.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info, warn};
use watchtower_core::error::MemoryError;
use watchtower_core::memory::{FindingStore, StoredFinding, StoredObservation};

/// A durable SQLite finding store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// Accepts a plain file path or a `sqlite:` URL; `"sqlite::memory:"`
    /// gives an ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite finding store initialized at {path}");
        Ok(store)
    }

    /// An ephemeral in-process database.
    pub async fn in_memory() -> Result<Self, MemoryError> {
        Self::new("sqlite::memory:").await
    }

    /// Close the pool, flushing everything to disk.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Create both tables if missing. The schema matches databases written by
    /// earlier releases, so existing history stays readable.
    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS observations (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                target  TEXT,
                tool    TEXT,
                output  TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("observations table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS findings (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                target        TEXT,
                vulnerability TEXT,
                details       TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("findings table: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn text(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<String, MemoryError> {
        let value: Option<String> = row
            .try_get(column)
            .map_err(|e| MemoryError::QueryFailed(format!("{column} column: {e}")))?;
        Ok(value.unwrap_or_default())
    }

    fn row_to_observation(row: &sqlx::sqlite::SqliteRow) -> Result<StoredObservation, MemoryError> {
        Ok(StoredObservation {
            id: row
                .try_get("id")
                .map_err(|e| MemoryError::QueryFailed(format!("id column: {e}")))?,
            target: Self::text(row, "target")?,
            tool: Self::text(row, "tool")?,
            output: Self::text(row, "output")?,
        })
    }

    fn row_to_finding(row: &sqlx::sqlite::SqliteRow) -> Result<StoredFinding, MemoryError> {
        let id: i64 = row
            .try_get("id")
            .map_err(|e| MemoryError::QueryFailed(format!("id column: {e}")))?;
        let raw = Self::text(row, "details")?;
        let details = serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(id, "Finding details are not valid JSON: {e}");
            serde_json::Value::Object(serde_json::Map::new())
        });

        Ok(StoredFinding {
            id,
            target: Self::text(row, "target")?,
            vulnerability: Self::text(row, "vulnerability")?,
            details,
        })
    }
}

#[async_trait]
impl FindingStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn record_observation(&self, target: &str, tool: &str, output: &str) -> Result<i64, MemoryError> {
        let result = sqlx::query("INSERT INTO observations (target, tool, output) VALUES (?1, ?2, ?3)")
            .bind(target)
            .bind(tool)
            .bind(output)
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::Storage(format!("INSERT observation failed: {e}")))?;

        let id = result.last_insert_rowid();
        debug!(id, tool = %tool, "Recorded observation");
        Ok(id)
    }

    async fn record_finding(
        &self,
        target: &str,
        title: &str,
        details: &serde_json::Value,
    ) -> Result<i64, MemoryError> {
        let details_json = serde_json::to_string(details)
            .map_err(|e| MemoryError::Storage(format!("Details serialization: {e}")))?;

        let result = sqlx::query("INSERT INTO findings (target, vulnerability, details) VALUES (?1, ?2, ?3)")
            .bind(target)
            .bind(title)
            .bind(&details_json)
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::Storage(format!("INSERT finding failed: {e}")))?;

        let id = result.last_insert_rowid();
        debug!(id, title = %title, "Recorded finding");
        Ok(id)
    }

    async fn all_observations(&self) -> Result<Vec<StoredObservation>, MemoryError> {
        let rows = sqlx::query("SELECT id, target, tool, output FROM observations ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("Observation scan: {e}")))?;

        rows.iter().map(Self::row_to_observation).collect()
    }

    async fn all_findings(&self) -> Result<Vec<StoredFinding>, MemoryError> {
        let rows = sqlx::query("SELECT id, target, vulnerability, details FROM findings ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("Finding scan: {e}")))?;

        rows.iter().map(Self::row_to_finding).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteStore {
        SqliteStore::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn record_and_scan_observations() {
        let db = test_store().await;
        let id = db.record_observation("example.com", "nmap", "22/tcp open ssh").await.unwrap();
        assert!(id > 0);

        let all = db.all_observations().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, id);
        assert_eq!(all[0].tool, "nmap");
        assert_eq!(all[0].output, "22/tcp open ssh");
    }

    #[tokio::test]
    async fn same_observation_twice_is_two_rows() {
        let db = test_store().await;
        let before = db.all_observations().await.unwrap().len();
        db.record_observation("example.com", "httpx", "200 OK").await.unwrap();
        db.record_observation("example.com", "httpx", "200 OK").await.unwrap();

        let all = db.all_observations().await.unwrap();
        assert_eq!(all.len(), before + 2);
        assert_ne!(all[0].id, all[1].id);
    }

    #[tokio::test]
    async fn finding_details_round_trip_as_json() {
        let db = test_store().await;
        let details = serde_json::json!({
            "title": "Exposed .git directory",
            "severity": "High",
            "description": "Repository metadata is downloadable",
            "evidence": "GET /.git/HEAD 200",
            "target": "example.com",
        });
        db.record_finding("example.com", "Exposed .git directory", &details).await.unwrap();

        let all = db.all_findings().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].vulnerability, "Exposed .git directory");
        assert_eq!(all[0].detail("severity"), Some("High"));
        assert_eq!(all[0].details, details);
    }

    #[tokio::test]
    async fn scans_preserve_insertion_order() {
        let db = test_store().await;
        for tool in ["nmap", "httpx", "nuclei"] {
            db.record_observation("example.com", tool, "out").await.unwrap();
        }
        let tools: Vec<_> = db
            .all_observations()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.tool)
            .collect();
        assert_eq!(tools, vec!["nmap", "httpx", "nuclei"]);
    }

    #[tokio::test]
    async fn invalid_details_json_reads_as_empty_object() {
        let db = test_store().await;
        sqlx::query("INSERT INTO findings (target, vulnerability, details) VALUES ('t', 'v', 'not json')")
            .execute(&db.pool)
            .await
            .unwrap();
        let all = db.all_findings().await.unwrap();
        assert_eq!(all[0].details, serde_json::json!({}));
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pentest_memory.db");
        let path = path.to_str().unwrap();

        let db = SqliteStore::new(path).await.unwrap();
        db.record_observation("10.0.0.1", "masscan", "open port 80").await.unwrap();
        db.record_finding("10.0.0.1", "Telnet enabled", &serde_json::json!({"severity": "Medium"}))
            .await
            .unwrap();
        db.close().await;

        let reopened = SqliteStore::new(path).await.unwrap();
        assert_eq!(reopened.all_observations().await.unwrap().len(), 1);
        assert_eq!(reopened.all_findings().await.unwrap()[0].vulnerability, "Telnet enabled");
    }

    #[tokio::test]
    async fn backend_name() {
        let db = test_store().await;
        assert_eq!(db.name(), "sqlite");
    }
}
