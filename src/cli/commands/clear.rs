//! Clear command.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::Result;
use crate::orchestrator::Orchestrator;
use std::sync::Arc;

pub async fn run_clear(video_id: &str, settings: Settings) -> Result<()> {
    let orchestrator = Arc::new(Orchestrator::new(settings)?);
    orchestrator.clear(video_id).await?;
    Output::success(&format!("Cleared stored state for {}", video_id));
    Ok(())
}
