//! Status command.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::Result;
use crate::orchestrator::{AnalysisState, Orchestrator};
use std::sync::Arc;

pub async fn run_status(video_id: &str, settings: Settings) -> Result<()> {
    let orchestrator = Arc::new(Orchestrator::new(settings)?);

    match orchestrator.status(video_id).await? {
        AnalysisState::Completed(result) => {
            Output::analysis(&result);
        }
        AnalysisState::Pending(record) => {
            Output::header(&format!("Analysis for {}", video_id));
            Output::kv("Status", &record.status.to_string());
            if !record.progress.is_empty() {
                Output::kv("Progress", &record.progress);
            }
            if let Some(error) = &record.error {
                Output::kv("Error", error);
            }
            if !record.streaming_text.is_empty() {
                Output::header("Partial output");
                println!("{}", record.streaming_text);
            }
            Output::kv(
                "Updated",
                &record.updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            );
        }
        AnalysisState::NotFound => {
            Output::info(&format!("No analysis found for {}", video_id));
        }
    }

    Ok(())
}
