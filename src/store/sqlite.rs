//! SQLite-backed analysis store.
//!
//! Records are stored as JSON blobs keyed by video id; there is no
//! cross-key querying beyond listing cached results, so a schema per
//! field would buy nothing.

use super::{AnalysisResult, AnalysisStore, ProgressRecord, ProgressUpdate};
use crate::error::{InnsiktError, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS progress (
        video_id TEXT PRIMARY KEY,
        record_json TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS analyses (
        video_id TEXT PRIMARY KEY,
        result_json TEXT NOT NULL,
        completed_at TEXT NOT NULL
    );
"#;

/// SQLite-backed analysis store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL lets observers read progress while a run is writing
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized analysis store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn load_progress(conn: &Connection, video_id: &str) -> Result<Option<ProgressRecord>> {
        let json: Option<String> = conn
            .query_row(
                "SELECT record_json FROM progress WHERE video_id = ?1",
                params![video_id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AnalysisStore for SqliteStore {
    async fn update_progress(&self, video_id: &str, update: ProgressUpdate) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| InnsiktError::Store(format!("Failed to acquire lock: {}", e)))?;
        let existing = Self::load_progress(&conn, video_id)?;
        let record = update.apply(video_id, existing);

        conn.execute(
            "INSERT INTO progress (video_id, record_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(video_id) DO UPDATE SET
                record_json = excluded.record_json,
                updated_at = excluded.updated_at",
            params![
                video_id,
                serde_json::to_string(&record)?,
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn get_progress(&self, video_id: &str) -> Result<Option<ProgressRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| InnsiktError::Store(format!("Failed to acquire lock: {}", e)))?;
        Self::load_progress(&conn, video_id)
    }

    async fn put_result(&self, result: &AnalysisResult) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| InnsiktError::Store(format!("Failed to acquire lock: {}", e)))?;
        conn.execute(
            "INSERT INTO analyses (video_id, result_json, completed_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(video_id) DO UPDATE SET
                result_json = excluded.result_json,
                completed_at = excluded.completed_at",
            params![
                result.video_id,
                serde_json::to_string(result)?,
                result.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn get_result(&self, video_id: &str) -> Result<Option<AnalysisResult>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| InnsiktError::Store(format!("Failed to acquire lock: {}", e)))?;
        let json: Option<String> = conn
            .query_row(
                "SELECT result_json FROM analyses WHERE video_id = ?1",
                params![video_id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn list_results(&self) -> Result<Vec<AnalysisResult>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| InnsiktError::Store(format!("Failed to acquire lock: {}", e)))?;
        let mut stmt =
            conn.prepare("SELECT result_json FROM analyses ORDER BY completed_at DESC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(serde_json::from_str(&row?)?);
        }
        Ok(results)
    }

    async fn clear(&self, video_id: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| InnsiktError::Store(format!("Failed to acquire lock: {}", e)))?;
        conn.execute("DELETE FROM progress WHERE video_id = ?1", params![video_id])?;
        conn.execute("DELETE FROM analyses WHERE video_id = ?1", params![video_id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AnalysisStatus, VideoMetadata};
    use chrono::Utc;

    fn sample_result(video_id: &str) -> AnalysisResult {
        AnalysisResult {
            video_id: video_id.to_string(),
            title: "Test Video".to_string(),
            metadata: VideoMetadata {
                channel: Some("Test Channel".to_string()),
                ..VideoMetadata::default()
            },
            summary: "A summary.".to_string(),
            revelations: vec!["R1".to_string(), "R2".to_string()],
            takeaways: vec!["T1".to_string()],
            completed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_progress_merge_persists() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .update_progress(
                "vid1",
                ProgressUpdate::running("Fetching transcript...").with_title("A Video"),
            )
            .await
            .unwrap();
        store
            .update_progress(
                "vid1",
                ProgressUpdate::running("Generating analysis...")
                    .with_streaming_text("partial text"),
            )
            .await
            .unwrap();

        let record = store.get_progress("vid1").await.unwrap().unwrap();
        assert_eq!(record.status, AnalysisStatus::Running);
        assert_eq!(record.progress, "Generating analysis...");
        assert_eq!(record.streaming_text, "partial text");
        assert_eq!(record.title.as_deref(), Some("A Video"));
    }

    #[tokio::test]
    async fn test_result_roundtrip_with_metadata() {
        let store = SqliteStore::in_memory().unwrap();
        store.put_result(&sample_result("vid1")).await.unwrap();

        let result = store.get_result("vid1").await.unwrap().unwrap();
        assert_eq!(result.title, "Test Video");
        assert_eq!(result.metadata.channel.as_deref(), Some("Test Channel"));
        assert_eq!(result.revelations.len(), 2);

        assert!(store.get_result("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_both_records() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .update_progress("vid1", ProgressUpdate::completed())
            .await
            .unwrap();
        store.put_result(&sample_result("vid1")).await.unwrap();

        store.clear("vid1").await.unwrap();

        assert!(store.get_progress("vid1").await.unwrap().is_none());
        assert!(store.get_result("vid1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_result_replaced_on_reanalysis() {
        let store = SqliteStore::in_memory().unwrap();
        store.put_result(&sample_result("vid1")).await.unwrap();

        let mut updated = sample_result("vid1");
        updated.summary = "A better summary.".to_string();
        store.put_result(&updated).await.unwrap();

        let result = store.get_result("vid1").await.unwrap().unwrap();
        assert_eq!(result.summary, "A better summary.");
        assert_eq!(store.list_results().await.unwrap().len(), 1);
    }
}
