//! Configuration data structures

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One year
pub const MAX_REPORT_TTL_HOURS: u64 = 24 * 366;
/// One week
pub const MAX_QUERY_TTL_MINUTES: u64 = 7 * 24 * 60;

/// Errors raised while loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Logging level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogLevel {
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "info")]
    Info,
    #[serde(rename = "debug")]
    #[default]
    Debug,
    #[serde(rename = "trace")]
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Domain of the wiki the bot edits
    pub domain: String,
    /// Domain of Wikimedia Commons, queried anonymously
    pub commons_domain: String,
    /// Base URL of the toolforge report service
    pub reports_url: String,
    /// Directory holding downloaded reports and cached queries
    pub cache_dir: PathBuf,
    /// Credential store written by `--wgen`
    pub credentials_file: Option<PathBuf>,
    /// Hours before a downloaded report is considered stale
    pub report_ttl_hours: u64,
    /// Minutes before a cached query is considered stale
    pub query_ttl_minutes: u64,
    /// Timeout for a single HTTP request in seconds
    pub request_timeout_secs: u64,
    /// User agent sent with every request
    pub user_agent: String,
    /// Logging verbosity level
    pub log_level: LogLevel,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            domain: "en.wikipedia.org".to_string(),
            commons_domain: "commons.wikimedia.org".to_string(),
            reports_url: "https://fastilybot-reports.toolforge.org".to_string(),
            cache_dir: std::env::temp_dir().join("fastilybot"),
            credentials_file: None,
            report_ttl_hours: 24,
            query_ttl_minutes: 10,
            request_timeout_secs: 120,
            user_agent: format!("fastilybot/{}", env!("CARGO_PKG_VERSION")),
            log_level: LogLevel::Debug,
        }
    }
}

impl Configuration {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
        } else {
            // Return default configuration if file doesn't exist
            Ok(Configuration::default())
        }
    }

    /// Get the XDG config directory path
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("fastilybot").join("config.toml"))
    }

    /// Location of the credential store, falling back to the config directory
    pub fn credentials_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.credentials_file {
            Some(path) => Ok(path.clone()),
            None => {
                let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
                Ok(config_dir.join("fastilybot").join("px.toml"))
            }
        }
    }

    /// API endpoint of `domain`
    pub fn api_endpoint(domain: &str) -> String {
        format!("https://{}/w/api.php", domain)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !is_valid_domain(&self.domain) {
            errors.push(format!("domain '{}' is not a valid host name", self.domain));
        }

        if !is_valid_domain(&self.commons_domain) {
            errors.push(format!(
                "commons_domain '{}' is not a valid host name",
                self.commons_domain
            ));
        }

        if url::Url::parse(&self.reports_url).is_err() {
            errors.push(format!("reports_url '{}' is not a valid URL", self.reports_url));
        }

        if self.cache_dir.as_os_str().is_empty() {
            errors.push("cache_dir cannot be empty".to_string());
        }

        if self.report_ttl_hours == 0 {
            errors.push("report_ttl_hours must be at least 1".to_string());
        } else if self.report_ttl_hours > MAX_REPORT_TTL_HOURS {
            errors.push(format!(
                "report_ttl_hours must be at most {}",
                MAX_REPORT_TTL_HOURS
            ));
        }

        if self.query_ttl_minutes > MAX_QUERY_TTL_MINUTES {
            errors.push(format!(
                "query_ttl_minutes must be at most {}",
                MAX_QUERY_TTL_MINUTES
            ));
        }

        if self.request_timeout_secs == 0 || self.request_timeout_secs > 3600 {
            errors.push("request_timeout_secs must be between 1 and 3600".to_string());
        }

        if self.user_agent.trim().is_empty() {
            errors.push("user_agent cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn is_valid_domain(domain: &str) -> bool {
    !domain.is_empty()
        && domain.len() <= 253
        && domain
            .split('.')
            .all(|label| {
                !label.is_empty()
                    && !label.starts_with('-')
                    && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            })
}
