//! Innsikt - AI Video Transcript Analysis
//!
//! A local-first CLI tool for analyzing video transcripts with an LLM.
//!
//! The name "Innsikt" comes from the Norwegian/Scandinavian word for
//! "insight."
//!
//! # Overview
//!
//! Innsikt allows you to:
//! - Send a video transcript to Anthropic, OpenAI, or Google for analysis
//! - Watch the model's answer stream in as it is generated
//! - Keep a durable, structured result (summary, key revelations,
//!   takeaways) per video, cached until explicitly cleared
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `provider` - Provider registry (endpoints, models, wire dialects)
//! - `stream` - Streaming response normalization
//! - `store` - Progress and result storage
//! - `extract` - Structured result extraction from model output
//! - `transcript` - Transcript source abstraction
//! - `credentials` - API key resolution
//! - `orchestrator` - Analysis run coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use innsikt::config::Settings;
//! use innsikt::orchestrator::{AnalysisState, Orchestrator};
//! use innsikt::transcript::TranscriptRequest;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Arc::new(Orchestrator::new(settings)?);
//!
//!     orchestrator
//!         .start(TranscriptRequest {
//!             video_id: "dQw4w9WgXcQ".to_string(),
//!             source: Some("transcript.txt".into()),
//!         })
//!         .await?;
//!
//!     // The run executes in the background; poll for the result.
//!     loop {
//!         if let AnalysisState::Completed(result) =
//!             orchestrator.status("dQw4w9WgXcQ").await?
//!         {
//!             println!("{}", result.summary);
//!             break;
//!         }
//!         tokio::time::sleep(std::time::Duration::from_millis(500)).await;
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod provider;
pub mod store;
pub mod stream;
pub mod transcript;

pub use error::{InnsiktError, Result};
