//! List command.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::Result;
use crate::orchestrator::Orchestrator;
use std::sync::Arc;

pub async fn run_list(settings: Settings) -> Result<()> {
    let orchestrator = Arc::new(Orchestrator::new(settings)?);
    let results = orchestrator.store().list_results().await?;

    if results.is_empty() {
        Output::info("No cached analyses. Run `innsikt analyze` to create one.");
        return Ok(());
    }

    Output::header(&format!("Cached analyses ({})", results.len()));
    for result in results {
        Output::list_item(&format!(
            "{} ({}, {})",
            result.title,
            result.video_id,
            result.completed_at.format("%Y-%m-%d")
        ));
    }

    Ok(())
}
