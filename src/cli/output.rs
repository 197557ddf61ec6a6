//! CLI output formatting utilities.

use crate::store::AnalysisResult;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }

    /// Render a completed analysis.
    pub fn analysis(result: &AnalysisResult) {
        Self::header(&result.title);
        Self::kv("Video", &result.video_id);
        if let Some(url) = &result.metadata.url {
            Self::kv("URL", url);
        }
        if let Some(channel) = &result.metadata.channel {
            Self::kv("Channel", channel);
        }
        Self::kv(
            "Completed",
            &result.completed_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        );

        Self::header("Summary");
        println!("{}", result.summary);

        if !result.revelations.is_empty() {
            Self::header("Key Revelations");
            for revelation in &result.revelations {
                Self::list_item(revelation);
            }
        }

        if !result.takeaways.is_empty() {
            Self::header("Main Takeaways");
            for takeaway in &result.takeaways {
                Self::list_item(takeaway);
            }
        }
    }
}
