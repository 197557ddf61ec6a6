//! Transcript source abstraction for Innsikt.
//!
//! The analysis pipeline only needs "the transcript text plus whatever
//! video attributes you have" — where it comes from (a local file, a
//! browser, a caption API) is behind this trait.

mod local;

pub use local::LocalTranscriptSource;

use crate::error::Result;
use crate::store::VideoMetadata;
use async_trait::async_trait;
use std::path::PathBuf;

/// What the caller knows about the video it wants analyzed.
#[derive(Debug, Clone)]
pub struct TranscriptRequest {
    /// Unique video identifier, the primary key for all stored state.
    pub video_id: String,
    /// Caller context for locating the transcript. For the local source
    /// this is a file path.
    pub source: Option<PathBuf>,
}

/// A transcript plus the video attributes that came with it.
#[derive(Debug, Clone)]
pub struct TranscriptBundle {
    pub text: String,
    pub title: String,
    pub metadata: VideoMetadata,
}

/// Trait for transcript providers.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the transcript for a request. Fails with `NoTranscript`
    /// when the video has no usable transcript.
    async fn fetch(&self, request: &TranscriptRequest) -> Result<TranscriptBundle>;
}
