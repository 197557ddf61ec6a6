//! Local file transcript source.
//!
//! Reads a transcript from a plain-text file. A first line of the form
//! `# Some Title` is taken as the video title; otherwise the file stem
//! is used.

use super::{TranscriptBundle, TranscriptRequest, TranscriptSource};
use crate::error::{InnsiktError, Result};
use crate::store::VideoMetadata;
use async_trait::async_trait;

/// Transcript source backed by local text files.
#[derive(Default)]
pub struct LocalTranscriptSource;

impl LocalTranscriptSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TranscriptSource for LocalTranscriptSource {
    async fn fetch(&self, request: &TranscriptRequest) -> Result<TranscriptBundle> {
        let path = request.source.as_ref().ok_or_else(|| {
            InnsiktError::NoTranscript(format!(
                "no transcript file given for video {}",
                request.video_id
            ))
        })?;

        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            InnsiktError::NoTranscript(format!("failed to read {}: {}", path.display(), e))
        })?;

        let (title, text) = split_title(&raw, path, &request.video_id);

        if text.trim().is_empty() {
            return Err(InnsiktError::NoTranscript(format!(
                "transcript file {} is empty",
                path.display()
            )));
        }

        Ok(TranscriptBundle {
            text: text.to_string(),
            title,
            metadata: VideoMetadata {
                url: Some(format!(
                    "https://www.youtube.com/watch?v={}",
                    request.video_id
                )),
                ..VideoMetadata::default()
            },
        })
    }
}

/// Split an optional `# Title` header off the transcript body.
fn split_title<'a>(
    raw: &'a str,
    path: &std::path::Path,
    video_id: &str,
) -> (String, &'a str) {
    if let Some(rest) = raw.strip_prefix("# ") {
        if let Some((title, body)) = rest.split_once('\n') {
            let title = title.trim();
            if !title.is_empty() {
                return (title.to_string(), body);
            }
        }
    }

    let fallback = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(video_id)
        .to_string();
    (fallback, raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn request(path: Option<PathBuf>) -> TranscriptRequest {
        TranscriptRequest {
            video_id: "dQw4w9WgXcQ".to_string(),
            source: path,
        }
    }

    #[tokio::test]
    async fn test_reads_transcript_with_title_header() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# My Video Title").unwrap();
        writeln!(file, "so today we are talking about birds").unwrap();

        let source = LocalTranscriptSource::new();
        let bundle = source
            .fetch(&request(Some(file.path().to_path_buf())))
            .await
            .unwrap();

        assert_eq!(bundle.title, "My Video Title");
        assert!(bundle.text.contains("birds"));
        assert!(bundle.metadata.url.as_deref().unwrap().contains("dQw4w9WgXcQ"));
    }

    #[tokio::test]
    async fn test_title_falls_back_to_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lecture-notes.txt");
        std::fs::write(&path, "content without header").unwrap();

        let source = LocalTranscriptSource::new();
        let bundle = source.fetch(&request(Some(path))).await.unwrap();
        assert_eq!(bundle.title, "lecture-notes");
    }

    #[tokio::test]
    async fn test_empty_file_is_no_transcript() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = LocalTranscriptSource::new();
        let err = source
            .fetch(&request(Some(file.path().to_path_buf())))
            .await
            .unwrap_err();
        assert!(matches!(err, InnsiktError::NoTranscript(_)));
    }

    #[tokio::test]
    async fn test_missing_path_is_no_transcript() {
        let source = LocalTranscriptSource::new();
        let err = source.fetch(&request(None)).await.unwrap_err();
        assert!(matches!(err, InnsiktError::NoTranscript(_)));
    }
}
