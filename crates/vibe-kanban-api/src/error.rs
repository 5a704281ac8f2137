use std::time::Duration;

/// The single error type of the task API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid API URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Request timeout after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("HTTP {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Http {
        status: u16,
        message: Option<String>,
    },
    #[error("API Error: {message}")]
    Api {
        message: String,
        error_data: Option<serde_json::Value>,
    },
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// True for 404 answers, used to tell "task not found" apart from outages.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Http { status: 404, .. })
    }
}
