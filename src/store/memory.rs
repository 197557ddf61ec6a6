//! In-memory analysis store.
//!
//! Useful for testing and one-shot runs that don't need persistence.

use super::{AnalysisResult, AnalysisStore, ProgressRecord, ProgressUpdate};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory analysis store.
#[derive(Default)]
pub struct MemoryStore {
    progress: RwLock<HashMap<String, ProgressRecord>>,
    results: RwLock<HashMap<String, AnalysisResult>>,
}

impl MemoryStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn update_progress(&self, video_id: &str, update: ProgressUpdate) -> Result<()> {
        let mut progress = self.progress.write().unwrap();
        let existing = progress.get(video_id).cloned();
        progress.insert(video_id.to_string(), update.apply(video_id, existing));
        Ok(())
    }

    async fn get_progress(&self, video_id: &str) -> Result<Option<ProgressRecord>> {
        Ok(self.progress.read().unwrap().get(video_id).cloned())
    }

    async fn put_result(&self, result: &AnalysisResult) -> Result<()> {
        let mut results = self.results.write().unwrap();
        results.insert(result.video_id.clone(), result.clone());
        Ok(())
    }

    async fn get_result(&self, video_id: &str) -> Result<Option<AnalysisResult>> {
        Ok(self.results.read().unwrap().get(video_id).cloned())
    }

    async fn list_results(&self) -> Result<Vec<AnalysisResult>> {
        let mut all: Vec<AnalysisResult> =
            self.results.read().unwrap().values().cloned().collect();
        all.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(all)
    }

    async fn clear(&self, video_id: &str) -> Result<()> {
        self.progress.write().unwrap().remove(video_id);
        self.results.write().unwrap().remove(video_id);
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
            metadata: VideoMetadata::default(),
            summary: "A summary.".to_string(),
            revelations: vec!["R1".to_string()],
            takeaways: vec!["T1".to_string()],
            completed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_progress_roundtrip() {
        let store = MemoryStore::new();

        store
            .update_progress("vid1", ProgressUpdate::running("Starting analysis..."))
            .await
            .unwrap();

        let record = store.get_progress("vid1").await.unwrap().unwrap();
        assert_eq!(record.status, AnalysisStatus::Running);
        assert_eq!(record.progress, "Starting analysis...");

        assert!(store.get_progress("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_updated_at_monotonic() {
        let store = MemoryStore::new();
        store
            .update_progress("vid1", ProgressUpdate::running("one"))
            .await
            .unwrap();
        let first = store.get_progress("vid1").await.unwrap().unwrap();

        store
            .update_progress("vid1", ProgressUpdate::running("two"))
            .await
            .unwrap();
        let second = store.get_progress("vid1").await.unwrap().unwrap();

        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn test_clear_removes_both_records() {
        let store = MemoryStore::new();
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
    async fn test_list_results_most_recent_first() {
        let store = MemoryStore::new();
        let mut older = sample_result("vid1");
        older.completed_at = Utc::now() - chrono::Duration::hours(1);
        store.put_result(&older).await.unwrap();
        store.put_result(&sample_result("vid2")).await.unwrap();

        let all = store.list_results().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].video_id, "vid2");
    }
}
