//! Configuration module for Innsikt.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnalysisPrompts, Prompts};
pub use settings::{AnalysisSettings, GeneralSettings, PromptSettings, Settings, StoreSettings};
