//! Configuration types for API access, downloads and retries.
//!
//! Values come from, in increasing precedence: defaults, the TOML config
//! file, the `UPTOBOX_TOKEN` environment variable, and command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::retry::{RetryOn, RetryPolicy};

/// Environment variable holding the user token.
pub const TOKEN_ENV: &str = "UPTOBOX_TOKEN";

/// Uptobox API access settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// URL scheme, `https` unless testing against a plain HTTP endpoint.
    pub scheme: String,
    /// Service hostname.
    pub hostname: String,
    /// User API token.
    pub token: Option<String>,
    /// Timeout for a single API request, in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            hostname: "uptobox.com".to_string(),
            token: None,
            timeout_secs: 60,
        }
    }
}

impl ApiConfig {
    /// Returns `scheme://hostname`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.hostname)
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Sets the user token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the hostname.
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Switches between `https` and plain `http`.
    #[must_use]
    pub fn with_https(mut self, https: bool) -> Self {
        self.scheme = if https { "https" } else { "http" }.to_string();
        self
    }
}

/// Configuration for download operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Directory where downloaded files are saved.
    pub output_dir: PathBuf,
    /// Whether to overwrite existing files.
    pub force_overwrite: bool,
    /// Whether to clean up `.part` files on download error.
    pub cleanup_on_error: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            force_overwrite: false,
            cleanup_on_error: true,
        }
    }
}

impl DownloadConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets whether to force overwrite existing files.
    #[must_use]
    pub const fn with_force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    /// Sets whether to clean up `.part` files on download error.
    #[must_use]
    pub const fn with_cleanup_on_error(mut self, cleanup: bool) -> Self {
        self.cleanup_on_error = cleanup;
        self
    }
}

/// Retry settings applied around API calls and downloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per operation, the first one included.
    pub max_attempts: u32,
    /// Pause before retrying an API call, in seconds.
    pub api_delay_secs: u64,
    /// Pause before retrying a download, in seconds.
    pub download_delay_secs: u64,
    /// Retry only network and decoding failures, never service errors.
    pub transport_only: bool,
    /// Cap on waiting-token requests per file; unbounded when unset.
    pub waiting_token_max_attempts: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            api_delay_secs: 0,
            download_delay_secs: 60,
            transport_only: false,
            waiting_token_max_attempts: None,
        }
    }
}

impl RetryConfig {
    const fn retry_on(&self) -> RetryOn {
        if self.transport_only {
            RetryOn::TransportOnly
        } else {
            RetryOn::Any
        }
    }

    /// Policy wrapped around each API call.
    #[must_use]
    pub fn api_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_secs(self.api_delay_secs),
            self.retry_on(),
        )
    }

    /// Policy wrapped around each file download.
    #[must_use]
    pub fn download_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_secs(self.download_delay_secs),
            self.retry_on(),
        )
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// API access.
    pub api: ApiConfig,
    /// Download behaviour.
    pub download: DownloadConfig,
    /// Retry behaviour.
    pub retry: RetryConfig,
}

impl AppConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location, `<config dir>/uptobox-dl/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("uptobox-dl").join("config.toml"))
    }

    /// Parses a TOML document; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document is not valid.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
    }

    /// Loads configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used when present and defaults otherwise. The `UPTOBOX_TOKEN`
    /// environment variable overrides the file's token.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };
        let config = match path {
            Some(p) => {
                let contents = std::fs::read_to_string(&p)
                    .map_err(|e| Error::Config(format!("cannot read {}: {e}", p.display())))?;
                log::debug!("Loaded config from {}", p.display());
                Self::from_toml_str(&contents)?
            }
            None => Self::default(),
        };
        Ok(config.with_env_token(std::env::var(TOKEN_ENV).ok()))
    }

    /// Overrides the token with a non-empty environment value.
    #[must_use]
    pub fn with_env_token(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.api.token = Some(token);
        }
        self
    }
}
