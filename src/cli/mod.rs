//! CLI module for Innsikt.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Innsikt - AI video transcript analysis
///
/// A local-first CLI tool for analyzing video transcripts with an LLM.
/// The name "Innsikt" comes from the Norwegian/Scandinavian word for
/// "insight."
#[derive(Parser, Debug)]
#[command(name = "innsikt")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a video transcript
    Analyze {
        /// Video ID the analysis is keyed by
        video_id: String,

        /// Path to the transcript text file
        transcript: String,

        /// LLM provider (anthropic, openai, google)
        #[arg(short, long)]
        provider: Option<String>,

        /// Clear any cached analysis and re-analyze
        #[arg(short, long)]
        force: bool,

        /// Start the run and exit without waiting for completion
        #[arg(long)]
        no_wait: bool,
    },

    /// Show analysis status or result for a video
    Status {
        /// Video ID to look up
        video_id: String,
    },

    /// List cached analyses
    List,

    /// Remove stored state for a video
    Clear {
        /// Video ID to clear
        video_id: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
