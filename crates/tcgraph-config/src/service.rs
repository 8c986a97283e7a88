//! Service configuration.
//!
//! Loaded once at process start from an optional YAML file layered under
//! `TCGRAPH__*` environment variables (`TCGRAPH__SCHEDULER__BASE_URL`, ...).
//! A `.env` file is read first when present.

use crate::project::TryConfig;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tcgraph_core::ConfigError;
use tracing::{debug, warn};

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "tcgraph";

const ENV_PREFIX: &str = "TCGRAPH";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub pushlog: PushlogSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(rename = "try")]
    pub try_config: TryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default = "default_scheduler_url")]
    pub base_url: String,
    #[serde(default)]
    pub credentials: Credentials,
}

/// Opaque scheduler credentials, passed through untouched.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub access_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("access_token", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushlogSettings {
    #[serde(default = "default_pushlog_timeout")]
    pub timeout_secs: u64,
}

/// Retry discipline for graph template fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_interval_ms")]
    pub base_interval_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_scheduler_url() -> String {
    "https://scheduler.taskcluster.net/v1".to_string()
}

fn default_pushlog_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_interval_ms() -> u64 {
    5000
}

fn default_timeout_ms() -> u64 {
    30000
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            base_url: default_scheduler_url(),
            credentials: Credentials::default(),
        }
    }
}

impl Default for PushlogSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_pushlog_timeout(),
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_interval_ms: default_base_interval_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from `path` (or `tcgraph.yaml` if present) and the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(env_file) => debug!(path = %env_file.display(), "Loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => warn!(error = %e, "Ignoring unreadable .env"),
        }

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        Self::from_settings(settings)
    }

    /// Parse configuration from YAML text alone.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        Self::from_settings(settings)
    }

    fn from_settings(settings: Config) -> Result<Self, ConfigError> {
        let config: Self = settings
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.scheduler.base_url).map_err(|e| {
            ConfigError::Invalid(format!(
                "scheduler.base_url {}: {e}",
                self.scheduler.base_url
            ))
        })?;
        if self.fetch.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "fetch.max_retries must be at least 1".to_string(),
            ));
        }
        self.try_config.validate()
    }
}
