//! Innsikt CLI entry point.

use anyhow::Result;
use clap::Parser;
use innsikt::cli::{commands, Cli, Commands};
use innsikt::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("innsikt={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Ensure data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::Analyze {
            video_id,
            transcript,
            provider,
            force,
            no_wait,
        } => {
            commands::run_analyze(
                video_id,
                transcript,
                provider.clone(),
                *force,
                *no_wait,
                settings,
            )
            .await?;
        }

        Commands::Status { video_id } => {
            commands::run_status(video_id, settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Clear { video_id } => {
            commands::run_clear(video_id, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings)?;
        }
    }

    Ok(())
}
