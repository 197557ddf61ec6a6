//! Error types for Innsikt.

use thiserror::Error;

/// Library-level error type for Innsikt operations.
#[derive(Error, Debug)]
pub enum InnsiktError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("No API key configured")]
    MissingCredential,

    #[error("No transcript available: {0}")]
    NoTranscript(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: {0}")]
    RateLimit(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider API error: {0}")]
    Api(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Analysis failed: {0}")]
    Analysis(String),
}

impl InnsiktError {
    /// User-facing message for a failed analysis run.
    ///
    /// Internal detail (stack context, raw bodies) goes to the logs;
    /// this is what lands in the terminal progress record.
    pub fn user_message(&self) -> String {
        match self {
            InnsiktError::UnknownProvider(name) => {
                format!("Unknown AI provider '{}'. Check your configuration.", name)
            }
            InnsiktError::MissingCredential => {
                "No API key configured. Set one in the config file or environment.".to_string()
            }
            InnsiktError::NoTranscript(_) => {
                "No transcript available for this video.".to_string()
            }
            InnsiktError::Auth(_) => "Authentication failed. Check your API key.".to_string(),
            InnsiktError::RateLimit(_) => {
                "The provider is rate limiting requests. Try again in a moment.".to_string()
            }
            InnsiktError::Timeout => "Request timed out. Please try again.".to_string(),
            InnsiktError::Api(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for Innsikt operations.
pub type Result<T> = std::result::Result<T, InnsiktError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_never_empty() {
        let errors = [
            InnsiktError::UnknownProvider("foo".to_string()),
            InnsiktError::MissingCredential,
            InnsiktError::NoTranscript("abc".to_string()),
            InnsiktError::Auth("401".to_string()),
            InnsiktError::RateLimit("429".to_string()),
            InnsiktError::Timeout,
            InnsiktError::Network("reset".to_string()),
            InnsiktError::Api("overloaded".to_string()),
        ];
        for e in errors {
            assert!(!e.user_message().is_empty());
        }
    }

    #[test]
    fn test_api_message_passed_through() {
        let e = InnsiktError::Api("invalid x-api-key".to_string());
        assert_eq!(e.user_message(), "invalid x-api-key");
    }
}
