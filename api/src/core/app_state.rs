//! Runtime configuration and shared handler state.

use std::time::Duration;

use thiserror::Error;

use crate::{core::backend::BackendClient, error_handler::AppError};

pub const DEFAULT_BACKEND_BASE: &str = "http://127.0.0.1:8000";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Value had the wrong format (e.g., invalid URL).
    #[error("invalid format in {var}: {reason}")]
    InvalidFormat {
        var: &'static str,
        reason: &'static str,
    },

    /// A number failed to parse.
    #[error("invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },
}

/// Proxy settings. All fields have defaults via [`ProxyConfig::from_env`].
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// Base URL of the RAG backend (`RAG_API_BASE`).
    pub backend_base: String,
    /// Listen address (`API_ADDRESS`).
    pub bind_addr: String,
    /// Outbound connect timeout. Streams are long-lived, so there is no
    /// overall request timeout.
    pub connect_timeout: Duration,
    /// Largest accepted transcription upload.
    pub max_upload_bytes: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            backend_base: DEFAULT_BACKEND_BASE.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ProxyConfig {
    /// Load from environment variables, falling back to defaults when unset.
    ///
    /// # Errors
    /// [`ConfigError`] when a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend_base = env("RAG_API_BASE", DEFAULT_BACKEND_BASE);
        validate_http_endpoint("RAG_API_BASE", &backend_base)?;

        Ok(Self {
            backend_base: backend_base.trim_end_matches('/').to_string(),
            bind_addr: env("API_ADDRESS", DEFAULT_BIND_ADDR),
            connect_timeout: Duration::from_secs(parse(
                "RAG_PROXY_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
                "expected seconds as u64",
            )?),
            max_upload_bytes: parse(
                "RAG_PROXY_MAX_UPLOAD_BYTES",
                DEFAULT_MAX_UPLOAD_BYTES,
                "expected byte count",
            )?,
        })
    }
}

/// Shared state for all HTTP handlers.
pub struct AppState {
    pub config: ProxyConfig,
    pub backend: BackendClient,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Result<Self, AppError> {
        let backend = BackendClient::new(&config)?;
        Ok(Self { config, backend })
    }
}

fn env(k: &str, dflt: &str) -> String {
    match std::env::var(k) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => dflt.to_string(),
    }
}

fn parse<T: std::str::FromStr>(
    var: &'static str,
    dflt: T,
    reason: &'static str,
) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, reason }),
        _ => Ok(dflt),
    }
}

fn validate_http_endpoint(var: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_scheme_is_checked() {
        assert!(validate_http_endpoint("RAG_API_BASE", "http://127.0.0.1:8000").is_ok());
        assert!(validate_http_endpoint("RAG_API_BASE", "https://rag.internal").is_ok());
        let err = validate_http_endpoint("RAG_API_BASE", "127.0.0.1:8000").unwrap_err();
        assert!(err.to_string().contains("RAG_API_BASE"));
    }

    #[test]
    fn defaults_point_at_local_backend() {
        let cfg = ProxyConfig::default();
        assert_eq!(cfg.backend_base, "http://127.0.0.1:8000");
        assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
    }
}
