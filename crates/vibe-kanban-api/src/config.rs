use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:9091";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const API_URL_ENV: &str = "VIBE_KANBAN_API_URL";
pub const API_TIMEOUT_ENV: &str = "VIBE_KANBAN_API_TIMEOUT_MS";

/// Connection settings for the task API. Built once at startup and handed
/// to [`TaskApiClient::new`](crate::TaskApiClient::new).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ApiConfig {
    /// Defaults overridden by `VIBE_KANBAN_API_URL` / `VIBE_KANBAN_API_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup(API_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.timeout = Duration::from_millis(ms),
                _ => tracing::warn!(value = %raw, "ignoring invalid {API_TIMEOUT_ENV}"),
            }
        }
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
