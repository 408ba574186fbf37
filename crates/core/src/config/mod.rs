//! Application configuration with layered loading.
//!
//! Sources, lowest to highest precedence:
//!
//! 1. Built-in defaults
//! 2. TOML config file (if RPTRBOOK_CONFIG_FILE set)
//! 3. Environment variables (RPTRBOOK_*)

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// What a download does when one of several endpoints fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialFailurePolicy {
    /// Any endpoint failure fails the whole download.
    #[default]
    FailFast,
    /// Log the failure and keep the records of the endpoints that succeeded.
    BestEffort,
}

/// What a download does with a record that fails normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidRecordPolicy {
    /// The first invalid record fails the download.
    #[default]
    Abort,
    /// Log and drop invalid records.
    Skip,
}

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the cache directory and the local database.
    ///
    /// Set via RPTRBOOK_WORKING_DIR environment variable.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Maximum age of a cached response before it is refetched.
    ///
    /// Set via RPTRBOOK_MAX_CACHE_AGE_SECS environment variable.
    #[serde(default = "default_max_cache_age_secs")]
    pub max_cache_age_secs: u64,

    /// Record count a full export is expected to reach, used for progress.
    #[serde(default = "default_expected_count")]
    pub expected_count: u64,

    /// Upstream base URL.
    ///
    /// Set via RPTRBOOK_BASE_URL environment variable.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Application name sent in the User-Agent.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Contact email sent in the User-Agent.
    ///
    /// Set via RPTRBOOK_APP_EMAIL environment variable. Required to download.
    #[serde(default)]
    pub app_email: Option<String>,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via RPTRBOOK_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub partial_failure: PartialFailurePolicy,

    #[serde(default)]
    pub invalid_records: InvalidRecordPolicy,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_cache_age_secs() -> u64 {
    3600
}

fn default_expected_count() -> u64 {
    3500
}

fn default_base_url() -> String {
    "https://repeaterbook.com".into()
}

fn default_app_name() -> String {
    "rptrbook".into()
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            max_cache_age_secs: default_max_cache_age_secs(),
            expected_count: default_expected_count(),
            base_url: default_base_url(),
            app_name: default_app_name(),
            app_email: None,
            timeout_ms: default_timeout_ms(),
            partial_failure: PartialFailurePolicy::default(),
            invalid_records: InvalidRecordPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn max_cache_age(&self) -> Duration {
        Duration::from_secs(self.max_cache_age_secs)
    }

    /// Directory of cached responses.
    pub fn cache_dir(&self) -> PathBuf {
        self.working_dir.join("cache")
    }

    /// Path of the local repeater database.
    pub fn database_path(&self) -> PathBuf {
        self.working_dir.join("repeaterbook.sqlite")
    }

    /// User-Agent header value, `"{app_name} <{app_email}>"` when an email is set.
    pub fn user_agent(&self) -> String {
        match self.app_email.as_deref() {
            Some(email) if !email.is_empty() => format!("{} <{email}>", self.app_name),
            _ => self.app_name.clone(),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config file cannot be read, an environment
    /// variable cannot be parsed, or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("RPTRBOOK_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(Env::prefixed("RPTRBOOK_").map(|key| key.as_str().to_lowercase().into()).split("__"));

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The contact email, required before talking to the upstream.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no email is configured.
    pub fn require_app_email(&self) -> Result<&str, ConfigError> {
        self.app_email.as_deref().filter(|e| !e.is_empty()).ok_or_else(|| ConfigError::Missing {
            field: "app_email".into(),
            hint: "Set RPTRBOOK_APP_EMAIL environment variable".into(),
        })
    }
}
