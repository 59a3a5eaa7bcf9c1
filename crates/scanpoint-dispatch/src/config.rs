//! Lookup collaborator configuration.
//!
//! A single setting: the backend base URL, loaded from the environment.
//! Absence is a configuration error raised at construction — before any
//! scan is attempted — never discovered mid-scan.

use std::env;

use url::Url;

/// Environment variable naming the inventory backend base URL.
pub const BACKEND_URL_ENV: &str = "SCANPOINT_BACKEND_URL";

/// Configuration for the inventory lookup client.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    base_url: Url,
}

impl LookupConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = env::var(BACKEND_URL_ENV)
            .map_err(|_| ConfigError::MissingRequired(BACKEND_URL_ENV.to_string()))?;
        LookupConfig::from_base_url(&raw)
    }

    /// Builds configuration from an explicit base URL.
    pub fn from_base_url(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingRequired(BACKEND_URL_ENV.to_string()));
        }

        let base_url = Url::parse(raw)
            .map_err(|_| ConfigError::InvalidValue(BACKEND_URL_ENV.to_string()))?;

        // Reject schemes that cannot host REST endpoints and URLs that
        // cannot take path segments (e.g. `mailto:`).
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue(BACKEND_URL_ENV.to_string()));
        }

        Ok(LookupConfig { base_url })
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of the asset-tag resolve endpoint, with the tag
    /// percent-encoded as a single path segment.
    pub fn lookup_url(&self, asset_tag: &str) -> Url {
        let mut url = self.base_url.clone();
        // Construction rejected cannot-be-a-base URLs, so segments are
        // always available.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "inventory", "lookup", asset_tag]);
        }
        url
    }

    /// URL of the assignment detail endpoint.
    pub fn detail_url(&self, assignment_id: i64) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "inventory", &assignment_id.to_string()]);
        }
        url
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

// =============================================================================
// Unit Tests
// =============================================================================
