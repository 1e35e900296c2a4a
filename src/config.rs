//! Store configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::remote::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_MS, RateLimitConfig};

pub const DEFAULT_DATA_DIR: &str = "./clarity-data";
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3001/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Browser local storage gives an origin roughly 5 MiB.
pub const DEFAULT_LOCAL_QUOTA_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid API base URL '{0}' (expected http:// or https://)")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub api_base_url: String,
    pub timeouts: Timeouts,
    pub rate_limit: RateLimitConfig,
    pub local_quota_bytes: usize,
}

impl StoreConfig {
    /// Build typed store config from environment variables.
    ///
    /// Optional:
    /// - `CLARITY_DATA_DIR`: default `./clarity-data`
    /// - `CLARITY_API_BASE_URL`: default `http://127.0.0.1:3001/api`
    /// - `CLARITY_REQUEST_TIMEOUT_SECS`: default 30
    /// - `CLARITY_CONNECT_TIMEOUT_SECS`: default 10
    /// - `CLARITY_RATE_LIMIT_MAX`: default 30
    /// - `CLARITY_RATE_LIMIT_WINDOW_MS`: default 60000
    /// - `CLARITY_LOCAL_QUOTA_BYTES`: default 5 MiB
    ///
    /// # Errors
    ///
    /// Returns `InvalidBaseUrl` when the base URL is not http(s).
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = std::env::var("CLARITY_DATA_DIR").map_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);
        let api_base_url = normalize_base_url(
            &std::env::var("CLARITY_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
        )?;
        let timeouts = Timeouts {
            request_secs: env_parse("CLARITY_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("CLARITY_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let rate_limit = RateLimitConfig {
            max_requests: env_parse("CLARITY_RATE_LIMIT_MAX", DEFAULT_MAX_REQUESTS),
            window: Duration::from_millis(env_parse("CLARITY_RATE_LIMIT_WINDOW_MS", DEFAULT_WINDOW_MS)),
        };
        let local_quota_bytes = env_parse("CLARITY_LOCAL_QUOTA_BYTES", DEFAULT_LOCAL_QUOTA_BYTES);

        Ok(Self { data_dir, api_base_url, timeouts, rate_limit, local_quota_bytes })
    }

    /// Apply command-line overrides on top of the environment config.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBaseUrl` when the override is not http(s).
    pub fn with_overrides(mut self, data_dir: Option<PathBuf>, api_base_url: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        if let Some(url) = api_base_url {
            self.api_base_url = normalize_base_url(url)?;
        }
        Ok(self)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeouts: Timeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            rate_limit: RateLimitConfig::default(),
            local_quota_bytes: DEFAULT_LOCAL_QUOTA_BYTES,
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Err(ConfigError::InvalidBaseUrl(raw.to_string()))
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
