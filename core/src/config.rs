//! Base URL configuration.
//!
//! The base URL is fixed when the binary is built (`ROAMLY_API_BASE_URL` at
//! compile time) and may be overridden at runtime through the same variable
//! via `ApiConfig::from_env`.

use url::Url;

/// Environment variable naming the API base URL.
pub const BASE_URL_ENV: &str = "ROAMLY_API_BASE_URL";

/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: String,
}

impl ApiConfig {
    /// Configuration pointing at `base_url`. A trailing `/` is appended to
    /// the path when missing so operation paths resolve beneath it rather
    /// than replacing its last segment. Any query or fragment is left in
    /// place for `ApiClient` to reject.
    pub fn new(base_url: &str) -> Self {
        let trimmed = base_url.trim();
        let base_url = match Url::parse(trimmed) {
            Ok(mut url) if !url.cannot_be_a_base() => {
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().push("");
                }
                String::from(url)
            }
            // Unparseable input is kept close to verbatim so the error that
            // `ApiClient` reports still names what was configured.
            _ if trimmed.ends_with('/') => trimmed.to_string(),
            _ => format!("{trimmed}/"),
        };
        Self { base_url }
    }

    /// The build-time base URL, or `DEFAULT_BASE_URL`.
    pub fn build_time() -> Self {
        Self::new(option_env!("ROAMLY_API_BASE_URL").unwrap_or(DEFAULT_BASE_URL))
    }

    /// The runtime value of `ROAMLY_API_BASE_URL` if set and non-empty,
    /// else the build-time configuration.
    pub fn from_env() -> Self {
        match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::new(&url),
            _ => Self::build_time(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::build_time()
    }
}
