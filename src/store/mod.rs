//! Analysis state storage for Innsikt.
//!
//! Two keyed records per video id: a progress record (ephemeral,
//! superseded freely while a run is active) and an analysis result
//! (durable cache, kept until explicitly cleared). Backends are
//! trait-based so tests run against the in-memory store and the CLI
//! against SQLite.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Status of an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Running,
    Error,
    Completed,
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisStatus::Running => write!(f, "running"),
            AnalysisStatus::Error => write!(f, "error"),
            AnalysisStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Structured video attributes carried alongside a transcript.
///
/// Everything here is best-effort; missing fields are tolerated at every
/// layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoMetadata {
    pub channel: Option<String>,
    pub publish_date: Option<String>,
    pub duration: Option<String>,
    pub view_count: Option<String>,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Observable state of one analysis run, overwritten in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub video_id: String,
    pub status: AnalysisStatus,
    /// Human-readable progress message ("Fetching transcript...").
    pub progress: String,
    /// Cleaned partial model output, display-only.
    pub streaming_text: String,
    /// Terminal error message when status is `Error`.
    pub error: Option<String>,
    pub title: Option<String>,
    pub metadata: Option<VideoMetadata>,
    pub updated_at: DateTime<Utc>,
}

/// Partial progress state. Set fields are merged into the existing record
/// (last-write-wins per field); unset fields keep their previous values.
#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    pub status: Option<AnalysisStatus>,
    pub progress: Option<String>,
    pub streaming_text: Option<String>,
    pub error: Option<String>,
    pub title: Option<String>,
    pub metadata: Option<VideoMetadata>,
}

impl ProgressUpdate {
    /// A running-state update with a progress message.
    pub fn running(message: impl Into<String>) -> Self {
        Self {
            status: Some(AnalysisStatus::Running),
            progress: Some(message.into()),
            ..Self::default()
        }
    }

    /// A terminal error update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(AnalysisStatus::Error),
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// A terminal completed update.
    pub fn completed() -> Self {
        Self {
            status: Some(AnalysisStatus::Completed),
            ..Self::default()
        }
    }

    pub fn with_streaming_text(mut self, text: impl Into<String>) -> Self {
        self.streaming_text = Some(text.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_metadata(mut self, metadata: VideoMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Merge into an existing record (or a fresh one), stamping
    /// `updated_at`.
    pub fn apply(self, video_id: &str, existing: Option<ProgressRecord>) -> ProgressRecord {
        let mut record = existing.unwrap_or_else(|| ProgressRecord {
            video_id: video_id.to_string(),
            status: AnalysisStatus::Running,
            progress: String::new(),
            streaming_text: String::new(),
            error: None,
            title: None,
            metadata: None,
            updated_at: Utc::now(),
        });

        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(progress) = self.progress {
            record.progress = progress;
        }
        if let Some(text) = self.streaming_text {
            record.streaming_text = text;
        }
        if let Some(error) = self.error {
            record.error = Some(error);
        }
        if let Some(title) = self.title {
            record.title = Some(title);
        }
        if let Some(metadata) = self.metadata {
            record.metadata = Some(metadata);
        }
        record.updated_at = Utc::now();
        record
    }
}

/// Terminal artifact of a successful analysis. Immutable once created;
/// cached until explicitly cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub video_id: String,
    pub title: String,
    #[serde(default)]
    pub metadata: VideoMetadata,
    pub summary: String,
    pub revelations: Vec<String>,
    pub takeaways: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Trait for analysis state storage backends.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Merge a partial update into the progress record for a video.
    async fn update_progress(&self, video_id: &str, update: ProgressUpdate) -> Result<()>;

    /// Latest progress record for a video.
    async fn get_progress(&self, video_id: &str) -> Result<Option<ProgressRecord>>;

    /// Cache a completed analysis.
    async fn put_result(&self, result: &AnalysisResult) -> Result<()>;

    /// Cached analysis for a video.
    async fn get_result(&self, video_id: &str) -> Result<Option<AnalysisResult>>;

    /// All cached analyses, most recent first.
    async fn list_results(&self) -> Result<Vec<AnalysisResult>>;

    /// Remove both progress and cached result, forcing re-analysis.
    async fn clear(&self, video_id: &str) -> Result<()>;
}

/// Wall-clock write throttle for streaming progress updates.
///
/// Rapid small fragments must not turn into one store write each; `ready`
/// answers at most once per interval. The final write at stream end is
/// unconditional and bypasses this.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True if the interval has elapsed since the last accepted write.
    pub fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_merges_fields() {
        let first = ProgressUpdate::running("Fetching transcript...")
            .with_title("A Video")
            .apply("vid1", None);
        assert_eq!(first.status, AnalysisStatus::Running);
        assert_eq!(first.progress, "Fetching transcript...");
        assert_eq!(first.title.as_deref(), Some("A Video"));

        let second = ProgressUpdate::running("Generating analysis...")
            .with_streaming_text("partial")
            .apply("vid1", Some(first.clone()));
        // Untouched fields survive the merge.
        assert_eq!(second.title.as_deref(), Some("A Video"));
        assert_eq!(second.progress, "Generating analysis...");
        assert_eq!(second.streaming_text, "partial");
        assert!(second.updated_at >= first.updated_at);
    }

    #[test]
    fn test_failed_update_carries_message() {
        let record = ProgressUpdate::failed("Request timed out. Please try again.")
            .apply("vid1", None);
        assert_eq!(record.status, AnalysisStatus::Error);
        assert!(!record.error.as_deref().unwrap_or_default().is_empty());
    }

    #[test]
    fn test_throttle_first_call_ready() {
        let mut t = Throttle::new(Duration::from_secs(3600));
        assert!(t.ready());
        assert!(!t.ready());
        assert!(!t.ready());
    }

    #[test]
    fn test_throttle_zero_interval_always_ready() {
        let mut t = Throttle::new(Duration::ZERO);
        assert!(t.ready());
        assert!(t.ready());
    }

    #[test]
    fn test_throttle_bounds_write_count() {
        // Simulated 300ms of fragments every 5ms against a 50ms interval:
        // at most ceil(300/50) + 1 writes.
        let mut t = Throttle::new(Duration::from_millis(50));
        let mut writes = 0;
        let start = Instant::now();
        while start.elapsed() < Duration::from_millis(300) {
            if t.ready() {
                writes += 1;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(writes <= 300 / 50 + 1, "writes = {}", writes);
        assert!(writes >= 2);
    }
}
