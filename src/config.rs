//! Static configuration for the API client and storage selection.
//!
//! Values are resolved once at startup from the environment (after `.env`
//! has been loaded by `dotenvy`) and may be overridden by CLI flags.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use thiserror::Error;

/// Fallback API base URL when nothing is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Default whole-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default TCP/TLS connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Directory name under the platform data dir.
const APP_DIR_NAME: &str = "superapp";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Invalid value for {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("Invalid header {0}")]
    InvalidHeader(String),
    #[error("Unknown storage backend: {0} (expected auto, local or keychain)")]
    UnknownStorage(String),
    #[error("No data directory available; set SUPERAPP_DATA_DIR")]
    NoDataDir,
}

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageChoice {
    /// Detect platform capability at startup.
    #[default]
    Auto,
    /// Force the local storage namespace.
    Local,
    /// Force the platform keychain.
    Keychain,
}

impl FromStr for StorageChoice {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(StorageChoice::Auto),
            "local" => Ok(StorageChoice::Local),
            "keychain" => Ok(StorageChoice::Keychain),
            other => Err(ConfigError::UnknownStorage(other.to_string())),
        }
    }
}

/// HTTP client configuration, fixed for the lifetime of an `ApiClient`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL without trailing slash; request paths are appended verbatim.
    pub base_url: String,
    /// Deadline for a whole exchange (send + body read).
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Headers sent with every request unless overridden per call.
    pub headers: HeaderMap,
}

impl ClientConfig {
    /// Build a config with the default JSON headers.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(base_url.to_string()));
        }

        Ok(Self {
            base_url: trimmed.to_string(),
            timeout,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            headers: default_headers(),
        })
    }

    /// Add or replace a default header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ConfigError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(name.to_string()))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ConfigError::InvalidHeader(format!("{}: {}", name, value)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Resolve from the environment.
    ///
    /// API base URL: SUPERAPP_API_URL > API_URL > localhost default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(None, None, |name| std::env::var(name).ok())
    }

    /// Resolve with explicit overrides taking precedence over `lookup`.
    ///
    /// An override replaces the environment value before it is validated, so
    /// a malformed variable is ignored when the caller supplies its own value.
    pub fn resolve<F>(
        base_url: Option<&str>,
        timeout: Option<Duration>,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = match base_url {
            Some(url) => url.to_string(),
            None => lookup("SUPERAPP_API_URL")
                .or_else(|| lookup("API_URL"))
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        };

        let timeout = match timeout {
            Some(timeout) => timeout,
            None => lookup_millis(&lookup, "SUPERAPP_API_TIMEOUT_MS")?.unwrap_or(DEFAULT_TIMEOUT),
        };
        let connect_timeout = lookup_millis(&lookup, "SUPERAPP_CONNECT_TIMEOUT_MS")?
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT);

        Ok(Self::new(&base_url, timeout)?.with_connect_timeout(connect_timeout))
    }
}

/// Content negotiation defaults: JSON in, JSON out.
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub choice: StorageChoice,
    /// Directory holding the local storage namespace file.
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let choice = match std::env::var("SUPERAPP_STORAGE") {
            Ok(value) => value.parse()?,
            Err(_) => StorageChoice::Auto,
        };

        let data_dir = match std::env::var("SUPERAPP_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::data_dir()
                .map(|d| d.join(APP_DIR_NAME))
                .ok_or(ConfigError::NoDataDir)?,
        };

        Ok(Self { choice, data_dir })
    }
}

fn lookup_millis<F>(lookup: &F, name: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).map(|value| parse_millis(name, &value)).transpose()
}

pub fn parse_millis(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .ok_or_else(|| ConfigError::InvalidNumber {
            name,
            value: value.to_string(),
        })
}
