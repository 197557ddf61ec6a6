//! Prompt templates for Innsikt.
//!
//! Prompts can be customized by placing TOML files in the custom prompts
//! directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub analysis: AnalysisPrompts,
}

/// Prompt for transcript analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisPrompts {
    pub user: String,
}

impl Default for AnalysisPrompts {
    fn default() -> Self {
        Self {
            user: r#"You are analyzing a YouTube video transcript to extract the most valuable insights. Please provide:

1. A concise summary (2-3 paragraphs) explaining what the video is about and its main thesis
2. Key Revelations - the most important, surprising, or actionable insights that viewers shouldn't miss. These are the transformative gems that make the video worth watching
3. Main Takeaways - 3-5 bullet points for quick reference

Transcript:
{{transcript}}

Please respond with a JSON object in this exact format:
{
  "summary": "A 2-3 paragraph summary...",
  "revelations": [
    "First key revelation...",
    "Second key revelation...",
    "Third key revelation..."
  ],
  "takeaways": [
    "First takeaway...",
    "Second takeaway...",
    "Third takeaway..."
  ]
}"#
            .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom
    /// directory.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let analysis_path = custom_path.join("analysis.toml");
            if analysis_path.exists() {
                let content = std::fs::read_to_string(&analysis_path)?;
                prompts.analysis = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render the analysis prompt for a transcript.
    pub fn analysis_prompt(&self, transcript: &str) -> String {
        let mut vars = std::collections::HashMap::new();
        vars.insert("transcript".to_string(), transcript.to_string());
        Self::render(&self.analysis.user, &vars)
    }
}
