//! Analysis orchestrator for Innsikt.
//!
//! Coordinates one analysis run per video id: dedup, transcript fetch,
//! provider streaming under a deadline, throttled progress writes, result
//! extraction, and terminal persistence.

use crate::config::{Prompts, Settings};
use crate::credentials::{ConfigCredentials, CredentialSource};
use crate::error::{InnsiktError, Result};
use crate::extract::{self, clean_streaming_text};
use crate::provider::{self, ProviderDescriptor};
use crate::store::{
    AnalysisResult, AnalysisStore, MemoryStore, ProgressRecord, ProgressUpdate, SqliteStore,
    Throttle,
};
use crate::stream::{HttpStreamOpener, StreamOpener};
use crate::transcript::{LocalTranscriptSource, TranscriptRequest, TranscriptSource};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

/// Outcome of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new run was accepted and is executing in the background.
    Started,
    /// A run for this video id is already active; nothing was changed.
    AlreadyRunning,
}

/// Current knowledge about a video's analysis.
#[derive(Debug, Clone)]
pub enum AnalysisState {
    /// A completed result exists. Always preferred over progress state,
    /// so a stale record from an earlier attempt can never shadow it.
    Completed(AnalysisResult),
    /// A run is active (or ended in error) with this progress record.
    Pending(ProgressRecord),
    /// Nothing is known about this video.
    NotFound,
}

/// The main orchestrator for analysis runs.
pub struct Orchestrator {
    store: Arc<dyn AnalysisStore>,
    transcripts: Arc<dyn TranscriptSource>,
    credentials: Arc<dyn CredentialSource>,
    opener: Arc<dyn StreamOpener>,
    prompts: Prompts,
    max_tokens: u32,
    deadline: Duration,
    progress_interval: Duration,
    /// In-flight video ids. Insert and membership check happen inside
    /// one critical section, and the entry is removed on every terminal
    /// path. Kept in memory only, so a crashed process never leaves a
    /// video id permanently blocked.
    active: Mutex<HashSet<String>>,
}

impl Orchestrator {
    /// Create a new orchestrator with default components.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;

        let store: Arc<dyn AnalysisStore> = match settings.store.provider.as_str() {
            "memory" => Arc::new(MemoryStore::new()),
            "sqlite" => Arc::new(SqliteStore::new(&settings.sqlite_path())?),
            other => {
                return Err(InnsiktError::Config(format!(
                    "Unknown store provider '{}' (expected sqlite or memory)",
                    other
                )))
            }
        };

        Ok(Self {
            store,
            transcripts: Arc::new(LocalTranscriptSource::new()),
            credentials: Arc::new(ConfigCredentials::new(&settings)),
            opener: Arc::new(HttpStreamOpener::new()),
            prompts,
            max_tokens: settings.analysis.max_tokens,
            deadline: Duration::from_secs(settings.analysis.timeout_seconds),
            progress_interval: Duration::from_millis(settings.analysis.progress_interval_ms),
            active: Mutex::new(HashSet::new()),
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: &Settings,
        store: Arc<dyn AnalysisStore>,
        transcripts: Arc<dyn TranscriptSource>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            store,
            transcripts,
            credentials,
            opener: Arc::new(HttpStreamOpener::new()),
            prompts: Prompts::default(),
            max_tokens: settings.analysis.max_tokens,
            deadline: Duration::from_secs(settings.analysis.timeout_seconds),
            progress_interval: Duration::from_millis(settings.analysis.progress_interval_ms),
            active: Mutex::new(HashSet::new()),
        }
    }

    /// Replace the stream opener, e.g. to drive runs from a non-HTTP
    /// source.
    pub fn with_opener(mut self, opener: Arc<dyn StreamOpener>) -> Self {
        self.opener = opener;
        self
    }

    /// Get a reference to the analysis store.
    pub fn store(&self) -> Arc<dyn AnalysisStore> {
        self.store.clone()
    }

    /// Start an analysis run for a video.
    ///
    /// Idempotent per video id: if a run is already active this is a
    /// no-op. Otherwise the pipeline executes on a background task and
    /// this returns immediately; observe completion via [`status`].
    ///
    /// [`status`]: Orchestrator::status
    #[instrument(skip(self, request), fields(video_id = %request.video_id))]
    pub async fn start(self: &Arc<Self>, request: TranscriptRequest) -> Result<StartOutcome> {
        let video_id = request.video_id.clone();

        {
            let mut active = self
                .active
                .lock()
                .map_err(|e| InnsiktError::Analysis(format!("Failed to acquire lock: {}", e)))?;
            if !active.insert(video_id.clone()) {
                info!("Analysis for {} already running", video_id);
                return Ok(StartOutcome::AlreadyRunning);
            }
        }

        self.progress(&video_id, ProgressUpdate::running("Starting analysis..."))
            .await;

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run(request).await;
        });

        Ok(StartOutcome::Started)
    }

    /// Current state for a video. A completed result wins over any
    /// progress record; only then the latest progress record is
    /// consulted.
    pub async fn status(&self, video_id: &str) -> Result<AnalysisState> {
        if let Some(result) = self.store.get_result(video_id).await? {
            return Ok(AnalysisState::Completed(result));
        }
        if let Some(record) = self.store.get_progress(video_id).await? {
            return Ok(AnalysisState::Pending(record));
        }
        Ok(AnalysisState::NotFound)
    }

    /// Remove all stored state for a video, forcing re-analysis.
    pub async fn clear(&self, video_id: &str) -> Result<()> {
        self.store.clear(video_id).await
    }

    /// Background task body. Every failure funnels into the terminal
    /// `Error` write here; nothing escapes unobserved, and the dedup
    /// entry is released on both terminal paths.
    async fn run(self: Arc<Self>, request: TranscriptRequest) {
        let video_id = request.video_id.clone();

        if let Err(e) = self.pipeline(&request).await {
            warn!("Analysis for {} failed: {}", video_id, e);
            if let Err(write_err) = self
                .write_terminal(&video_id, ProgressUpdate::failed(e.user_message()))
                .await
            {
                tracing::error!(
                    "Could not persist failure state for {}: {}",
                    video_id,
                    write_err
                );
            }
        }

        if let Ok(mut active) = self.active.lock() {
            active.remove(&video_id);
        }
    }

    /// The pipeline proper. Any error here becomes a terminal `Error`
    /// record in [`run`](Orchestrator::run).
    async fn pipeline(&self, request: &TranscriptRequest) -> Result<()> {
        let video_id = &request.video_id;

        self.progress(video_id, ProgressUpdate::running("Fetching transcript..."))
            .await;

        let bundle = self.fetch_transcript(request).await?;
        if bundle.text.trim().is_empty() {
            return Err(InnsiktError::NoTranscript(video_id.clone()));
        }

        let credential = self
            .credentials
            .resolve()
            .ok_or(InnsiktError::MissingCredential)?;
        let descriptor = provider::descriptor(credential.provider);

        self.progress(
            video_id,
            ProgressUpdate::running(format!("Analyzing with {}...", descriptor.display_name))
                .with_title(bundle.title.clone())
                .with_metadata(bundle.metadata.clone()),
        )
        .await;

        let prompt = self.prompts.analysis_prompt(&bundle.text);
        let full_text = self
            .stream_analysis(video_id, descriptor, &credential.secret, &prompt)
            .await?;

        // Unconditional final streaming write, regardless of throttle
        // state.
        self.progress(
            video_id,
            ProgressUpdate::running("Finalizing...")
                .with_streaming_text(clean_streaming_text(&full_text)),
        )
        .await;

        let analysis = extract::parse_analysis(&full_text);
        let result = AnalysisResult {
            video_id: video_id.clone(),
            title: bundle.title,
            metadata: bundle.metadata,
            summary: analysis.summary,
            revelations: analysis.revelations,
            takeaways: analysis.takeaways,
            completed_at: Utc::now(),
        };

        // Terminal writes are not best-effort: a completed analysis with
        // no persisted record is data loss, so failures propagate.
        self.store.put_result(&result).await?;
        self.write_terminal(video_id, ProgressUpdate::completed())
            .await?;

        info!("Analysis for {} completed", video_id);
        Ok(())
    }

    /// Fetch the transcript, retrying once on a connection-level failure.
    /// A definitive "no transcript" answer is not retried.
    async fn fetch_transcript(
        &self,
        request: &TranscriptRequest,
    ) -> Result<crate::transcript::TranscriptBundle> {
        match self.transcripts.fetch(request).await {
            Ok(bundle) => Ok(bundle),
            Err(e @ InnsiktError::NoTranscript(_)) => Err(e),
            Err(first) => {
                warn!(
                    "Transcript fetch for {} failed ({}), retrying once",
                    request.video_id, first
                );
                self.transcripts.fetch(request).await
            }
        }
    }

    /// Drive the provider stream to completion under the run deadline,
    /// writing throttled progress updates with cleaned partial text.
    async fn stream_analysis(
        &self,
        video_id: &str,
        descriptor: &ProviderDescriptor,
        secret: &str,
        prompt: &str,
    ) -> Result<String> {
        let deadline = Instant::now() + self.deadline;

        let mut stream = tokio::time::timeout_at(
            deadline,
            self.opener.open(descriptor, secret, prompt, self.max_tokens),
        )
        .await
        .map_err(|_| InnsiktError::Timeout)??;

        let mut full_text = String::new();
        let mut throttle = Throttle::new(self.progress_interval);

        loop {
            // Hitting the deadline drops the stream, which aborts the
            // in-flight connection.
            let fragment = tokio::time::timeout_at(deadline, stream.next_fragment())
                .await
                .map_err(|_| InnsiktError::Timeout)??;

            let Some(text) = fragment else {
                break;
            };
            full_text.push_str(&text);

            if throttle.ready() {
                self.progress(
                    video_id,
                    ProgressUpdate::running("Generating analysis...")
                        .with_streaming_text(clean_streaming_text(&full_text)),
                )
                .await;
            }
        }

        Ok(full_text)
    }

    /// Best-effort progress write: mid-run store failures are logged and
    /// do not fail the run.
    async fn progress(&self, video_id: &str, update: ProgressUpdate) {
        if let Err(e) = self.store.update_progress(video_id, update).await {
            warn!("Failed to write progress for {}: {}", video_id, e);
        }
    }

    /// Terminal progress write, retried once before surfacing the
    /// failure.
    async fn write_terminal(&self, video_id: &str, update: ProgressUpdate) -> Result<()> {
        if let Err(first) = self
            .store
            .update_progress(video_id, update.clone())
            .await
        {
            warn!(
                "Terminal write for {} failed ({}), retrying once",
                video_id, first
            );
            self.store.update_progress(video_id, update).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{Credential, StaticCredentials};
    use crate::provider::{Dialect, ProviderId};
    use crate::store::{AnalysisStatus, VideoMetadata};
    use crate::stream::TextStream;
    use crate::transcript::TranscriptBundle;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream::{self, StreamExt};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingTranscript;

    #[async_trait]
    impl TranscriptSource for FailingTranscript {
        async fn fetch(&self, request: &TranscriptRequest) -> Result<TranscriptBundle> {
            Err(InnsiktError::NoTranscript(request.video_id.clone()))
        }
    }

    struct SlowFailingTranscript {
        delay: Duration,
    }

    #[async_trait]
    impl TranscriptSource for SlowFailingTranscript {
        async fn fetch(&self, request: &TranscriptRequest) -> Result<TranscriptBundle> {
            tokio::time::sleep(self.delay).await;
            Err(InnsiktError::NoTranscript(request.video_id.clone()))
        }
    }

    struct FlakyTranscript {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TranscriptSource for FlakyTranscript {
        async fn fetch(&self, _request: &TranscriptRequest) -> Result<TranscriptBundle> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(InnsiktError::Network("connection reset".to_string()));
            }
            Ok(TranscriptBundle {
                text: "hello world transcript".to_string(),
                title: "A Video".to_string(),
                metadata: VideoMetadata::default(),
            })
        }
    }

    /// Opener whose stream yields the given chunks and then hangs,
    /// never closing the connection.
    struct StalledOpener {
        preamble: Vec<&'static str>,
    }

    #[async_trait]
    impl StreamOpener for StalledOpener {
        async fn open(
            &self,
            _descriptor: &ProviderDescriptor,
            _secret: &str,
            _prompt: &str,
            _max_tokens: u32,
        ) -> Result<TextStream> {
            let chunks: Vec<reqwest::Result<Bytes>> =
                self.preamble.iter().map(|s| Ok(Bytes::from(*s))).collect();
            Ok(TextStream::from_stream(
                stream::iter(chunks).chain(stream::pending()),
                Dialect::AnthropicSse,
            ))
        }
    }

    fn credential() -> Arc<StaticCredentials> {
        Arc::new(StaticCredentials(Some(Credential {
            provider: ProviderId::Anthropic,
            secret: "test-key".to_string(),
        })))
    }

    fn request(video_id: &str) -> TranscriptRequest {
        TranscriptRequest {
            video_id: video_id.to_string(),
            source: None,
        }
    }

    fn orchestrator(
        store: Arc<dyn AnalysisStore>,
        transcripts: Arc<dyn TranscriptSource>,
    ) -> Arc<Orchestrator> {
        Arc::new(Orchestrator::with_components(
            &Settings::default(),
            store,
            transcripts,
            Arc::new(StaticCredentials(None)),
        ))
    }

    /// Poll until the run for a video id reaches a terminal state.
    async fn wait_for_terminal(orch: &Arc<Orchestrator>, video_id: &str) -> ProgressRecord {
        for _ in 0..200 {
            if let AnalysisState::Pending(record) = orch.status(video_id).await.unwrap() {
                if record.status != AnalysisStatus::Running {
                    return record;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("run for {} never reached a terminal state", video_id);
    }

    #[tokio::test]
    async fn test_failed_run_writes_terminal_error_and_releases_dedup() {
        let orch = orchestrator(Arc::new(MemoryStore::new()), Arc::new(FailingTranscript));

        let outcome = orch.start(request("vid1")).await.unwrap();
        assert_eq!(outcome, StartOutcome::Started);

        let record = wait_for_terminal(&orch, "vid1").await;
        assert_eq!(record.status, AnalysisStatus::Error);
        assert!(!record.error.unwrap().is_empty());

        // Terminal state released the dedup entry, so a fresh start is
        // accepted, not rejected as already running.
        let outcome = orch.start(request("vid1")).await.unwrap();
        assert_eq!(outcome, StartOutcome::Started);
    }

    #[tokio::test]
    async fn test_second_start_is_idempotent_noop() {
        let orch = orchestrator(
            Arc::new(MemoryStore::new()),
            Arc::new(SlowFailingTranscript {
                delay: Duration::from_millis(300),
            }),
        );

        assert_eq!(
            orch.start(request("vid1")).await.unwrap(),
            StartOutcome::Started
        );
        assert_eq!(
            orch.start(request("vid1")).await.unwrap(),
            StartOutcome::AlreadyRunning
        );

        // A different video id is unaffected.
        assert_eq!(
            orch.start(request("vid2")).await.unwrap(),
            StartOutcome::Started
        );

        wait_for_terminal(&orch, "vid1").await;
        wait_for_terminal(&orch, "vid2").await;
    }

    #[tokio::test]
    async fn test_missing_credential_is_terminal() {
        let orch = orchestrator(
            Arc::new(MemoryStore::new()),
            Arc::new(FlakyTranscript {
                calls: AtomicUsize::new(1), // skip the flaky first call
            }),
        );

        orch.start(request("vid1")).await.unwrap();
        let record = wait_for_terminal(&orch, "vid1").await;
        assert_eq!(record.status, AnalysisStatus::Error);
        assert!(record.error.unwrap().contains("API key"));
    }

    #[tokio::test]
    async fn test_transcript_fetch_retried_once() {
        let transcripts = Arc::new(FlakyTranscript {
            calls: AtomicUsize::new(0),
        });
        let orch = orchestrator(Arc::new(MemoryStore::new()), transcripts.clone());

        orch.start(request("vid1")).await.unwrap();
        // Run ends at MissingCredential, after the transcript succeeded
        // on the retry.
        wait_for_terminal(&orch, "vid1").await;
        assert_eq!(transcripts.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_completed_result_shadows_stale_progress() {
        let store: Arc<dyn AnalysisStore> = Arc::new(MemoryStore::new());

        // Stale failed record from an earlier attempt.
        store
            .update_progress("vid1", ProgressUpdate::failed("old failure"))
            .await
            .unwrap();
        store
            .put_result(&AnalysisResult {
                video_id: "vid1".to_string(),
                title: "A Video".to_string(),
                metadata: VideoMetadata::default(),
                summary: "S".to_string(),
                revelations: vec![],
                takeaways: vec![],
                completed_at: Utc::now(),
            })
            .await
            .unwrap();

        let orch = orchestrator(store, Arc::new(FailingTranscript));
        match orch.status("vid1").await.unwrap() {
            AnalysisState::Completed(result) => assert_eq!(result.summary, "S"),
            other => panic!("expected completed result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_not_found() {
        let orch = orchestrator(Arc::new(MemoryStore::new()), Arc::new(FailingTranscript));
        assert!(matches!(
            orch.status("nope").await.unwrap(),
            AnalysisState::NotFound
        ));
    }

    #[tokio::test]
    async fn test_clear_forces_fresh_state() {
        let orch = orchestrator(Arc::new(MemoryStore::new()), Arc::new(FailingTranscript));

        orch.start(request("vid1")).await.unwrap();
        wait_for_terminal(&orch, "vid1").await;

        orch.clear("vid1").await.unwrap();
        assert!(matches!(
            orch.status("vid1").await.unwrap(),
            AnalysisState::NotFound
        ));
    }

    #[tokio::test]
    async fn test_deadline_mid_stream_is_timeout_and_releases_dedup() {
        let mut settings = Settings::default();
        settings.analysis.timeout_seconds = 1;

        let orch = Arc::new(
            Orchestrator::with_components(
                &settings,
                Arc::new(MemoryStore::new()),
                Arc::new(FlakyTranscript {
                    calls: AtomicUsize::new(1), // skip the flaky first call
                }),
                credential(),
            )
            .with_opener(Arc::new(StalledOpener {
                preamble: vec![
                    "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"partial answer\"}}\n",
                ],
            })),
        );

        orch.start(request("vid1")).await.unwrap();
        let record = wait_for_terminal(&orch, "vid1").await;
        assert_eq!(record.status, AnalysisStatus::Error);
        assert!(record.error.unwrap().contains("timed out"));
        // Partial output written before the deadline survives the merge.
        assert!(record.streaming_text.contains("partial answer"));

        // Deadline released the dedup entry, so a fresh start is accepted.
        assert_eq!(
            orch.start(request("vid1")).await.unwrap(),
            StartOutcome::Started
        );
    }

    #[tokio::test]
    async fn test_unknown_store_provider_rejected() {
        let mut settings = Settings::default();
        settings.store.provider = "memroy".to_string();

        let err = Orchestrator::new(settings)
            .err()
            .expect("unknown store provider must be rejected");
        assert!(matches!(err, InnsiktError::Config(_)));
        assert!(err.to_string().contains("memroy"));

        let mut settings = Settings::default();
        settings.store.provider = "memory".to_string();
        assert!(Orchestrator::new(settings).is_ok());
    }
}
