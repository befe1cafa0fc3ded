//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; defaults target the public ShopMart API.
//!
//! - `SHOPMART_API_BASE_URL` - Remote API root (default: <https://ecommerce.routemisr.com>)
//! - `SHOPMART_RETURN_URL` - Origin the hosted payment page returns to (default: <http://localhost:3000>)
//! - `SHOPMART_PAGE_SIZE` - Products per catalog page, 1-100 (default: 40)
//! - `SHOPMART_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `SHOPMART_CACHE_TTL_SECS` - Catalog cache TTL (default: 300)
//! - `SHOPMART_SESSION_FILE` - Where the CLI persists the signed-in session
//!   (default: `$HOME/.shopmart/session.json`)
//! - `SHOPMART_LOG_FORMAT` - `pretty` or `json` (default: pretty)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "https://ecommerce.routemisr.com";
const DEFAULT_RETURN_URL: &str = "http://localhost:3000";
const MAX_PAGE_SIZE: u32 = 100;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, multi-field lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Remote API root.
    pub api_base_url: Url,
    /// Origin handed to the hosted payment session as its return address.
    pub return_url: Url,
    /// Products requested per catalog page.
    pub page_size: u32,
    /// Timeout applied to every remote request.
    pub http_timeout: Duration,
    /// Lifetime of cached catalog responses.
    pub cache_ttl: Duration,
    /// Session persistence path used by the CLI.
    pub session_file: PathBuf,
    /// Tracing output format.
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking.
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag.
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = parse_url(
            "SHOPMART_API_BASE_URL",
            &get_or_default(&lookup, "SHOPMART_API_BASE_URL", DEFAULT_API_BASE_URL),
        )?;
        let return_url = parse_url(
            "SHOPMART_RETURN_URL",
            &get_or_default(&lookup, "SHOPMART_RETURN_URL", DEFAULT_RETURN_URL),
        )?;

        let page_size = parse_number::<u32>(&lookup, "SHOPMART_PAGE_SIZE", 40)?;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPMART_PAGE_SIZE".to_string(),
                format!("must be between 1 and {MAX_PAGE_SIZE} (got {page_size})"),
            ));
        }

        let timeout_secs = parse_number::<u64>(&lookup, "SHOPMART_HTTP_TIMEOUT_SECS", 30)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPMART_HTTP_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let cache_ttl_secs = parse_number::<u64>(&lookup, "SHOPMART_CACHE_TTL_SECS", 300)?;

        let session_file = lookup("SHOPMART_SESSION_FILE").map_or_else(
            || default_session_file(lookup("HOME")),
            PathBuf::from,
        );

        let log_format = match get_or_default(&lookup, "SHOPMART_LOG_FORMAT", "pretty")
            .to_ascii_lowercase()
            .as_str()
        {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "SHOPMART_LOG_FORMAT".to_string(),
                    format!("expected 'pretty' or 'json', got '{other}'"),
                ));
            }
        };

        Ok(Self {
            api_base_url,
            return_url,
            page_size,
            http_timeout: Duration::from_secs(timeout_secs),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            session_file,
            log_format,
            sentry_dsn: lookup("SENTRY_DSN").filter(|v| !v.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT").filter(|v| !v.is_empty()),
        })
    }

    /// Origin string sent with online checkout (no trailing slash).
    #[must_use]
    pub fn return_origin(&self) -> String {
        self.return_url.as_str().trim_end_matches('/').to_string()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a variable with a default value.
fn get_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// Parse a numeric variable, falling back to `default` when unset.
fn parse_number<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse an absolute http(s) URL.
fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

fn default_session_file(home: Option<String>) -> PathBuf {
    home.map_or_else(PathBuf::new, PathBuf::from)
        .join(".shopmart")
        .join("session.json")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_vars(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("HOME", "/home/shopper")]).unwrap();
        assert_eq!(config.api_base_url.as_str(), "https://ecommerce.routemisr.com/");
        assert_eq!(config.page_size, 40);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(
            config.session_file,
            PathBuf::from("/home/shopper/.shopmart/session.json")
        );
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SHOPMART_API_BASE_URL", "http://127.0.0.1:8080"),
            ("SHOPMART_PAGE_SIZE", "12"),
            ("SHOPMART_LOG_FORMAT", "JSON"),
            ("SHOPMART_SESSION_FILE", "/tmp/s.json"),
            ("SENTRY_DSN", ""),
        ])
        .unwrap();
        assert_eq!(config.api_base_url.port(), Some(8080));
        assert_eq!(config.page_size, 12);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.session_file, PathBuf::from("/tmp/s.json"));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_invalid_page_size() {
        assert!(matches!(
            load(&[("SHOPMART_PAGE_SIZE", "0")]),
            Err(ConfigError::InvalidEnvVar(..))
        ));
        assert!(matches!(
            load(&[("SHOPMART_PAGE_SIZE", "101")]),
            Err(ConfigError::InvalidEnvVar(..))
        ));
        assert!(matches!(
            load(&[("SHOPMART_PAGE_SIZE", "many")]),
            Err(ConfigError::InvalidEnvVar(..))
        ));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let err = load(&[("SHOPMART_API_BASE_URL", "ftp://example.com")]).unwrap_err();
        assert!(err.to_string().contains("SHOPMART_API_BASE_URL"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(load(&[("SHOPMART_HTTP_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn test_return_origin_trims_slash() {
        let config = load(&[("SHOPMART_RETURN_URL", "https://shop.example.com/")]).unwrap();
        assert_eq!(config.return_origin(), "https://shop.example.com");
    }
}
