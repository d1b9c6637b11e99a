use std::time::Duration;

use crate::locale::Locale;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

pub const BASE_URL_ENV: &str = "ANALYZER_BASE_URL";
pub const TIMEOUT_ENV: &str = "ANALYZER_TIMEOUT_SECS";
pub const LANG_ENV: &str = "ANALYZER_LANG";

/// Connection settings for the analyzer backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Origin the `/api/...` paths are resolved against.
    pub base_url: String,
    /// Per-request timeout. `None` leaves reqwest's default (no timeout).
    pub timeout: Option<Duration>,
    pub locale: Locale,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            locale: Locale::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Reads `ANALYZER_BASE_URL`, `ANALYZER_TIMEOUT_SECS` and `ANALYZER_LANG`,
    /// falling back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let base_url = lookup(BASE_URL_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.base_url);

        let timeout = lookup(TIMEOUT_ENV)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let locale = lookup(LANG_ENV)
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.locale);

        Self {
            base_url,
            timeout,
            locale,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
