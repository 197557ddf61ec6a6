//! Analyze command.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::{InnsiktError, Result};
use crate::orchestrator::{AnalysisState, Orchestrator, StartOutcome};
use crate::store::AnalysisStatus;
use crate::transcript::TranscriptRequest;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub async fn run_analyze(
    video_id: &str,
    transcript: &str,
    provider: Option<String>,
    force: bool,
    no_wait: bool,
    mut settings: Settings,
) -> Result<()> {
    if let Some(name) = provider {
        settings.analysis.provider = name.parse()?;
    }

    let orchestrator = Arc::new(Orchestrator::new(settings)?);

    if force {
        orchestrator.clear(video_id).await?;
    } else if let AnalysisState::Completed(result) = orchestrator.status(video_id).await? {
        Output::info("Using cached analysis (pass --force to re-analyze)");
        Output::analysis(&result);
        return Ok(());
    }

    let request = TranscriptRequest {
        video_id: video_id.to_string(),
        source: Some(PathBuf::from(transcript)),
    };

    match orchestrator.start(request).await? {
        StartOutcome::Started => Output::info("Analysis started"),
        StartOutcome::AlreadyRunning => {
            Output::warning("An analysis for this video is already running");
        }
    }

    if no_wait {
        Output::info("Running in background; check progress with `innsikt status`");
        return Ok(());
    }

    let spinner = Output::spinner("Starting analysis...");
    loop {
        match orchestrator.status(video_id).await? {
            AnalysisState::Completed(result) => {
                spinner.finish_and_clear();
                Output::success("Analysis complete");
                Output::analysis(&result);
                return Ok(());
            }
            AnalysisState::Pending(record) => {
                if record.status == AnalysisStatus::Error {
                    spinner.finish_and_clear();
                    let message = record
                        .error
                        .unwrap_or_else(|| "Analysis failed".to_string());
                    Output::error(&message);
                    return Err(InnsiktError::Analysis(message));
                }
                spinner.set_message(record.progress.clone());
            }
            AnalysisState::NotFound => {}
        }

        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}
