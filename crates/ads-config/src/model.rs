use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub const API_URL_VAR: &str = "RENDICONTI_API_URL";
pub const TIMEOUT_VAR: &str = "RENDICONTI_TIMEOUT_SECS";
pub const EXPORT_DIR_VAR: &str = "RENDICONTI_EXPORT_DIR";

const APP_DIR: &str = "rendiconti";

/// Where the backend lives and where local files go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "ClientConfig::default_api_url")]
    pub api_url: String,
    #[serde(default = "ClientConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    /// Directory for exported PDFs. Defaults to the user's documents folder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,
    /// Directory for the session file. Defaults to the local data folder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: Self::default_api_url(),
            timeout_secs: Self::default_timeout_secs(),
            export_dir: None,
            data_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn default_api_url() -> String {
        "http://localhost:5000/api".into()
    }

    pub fn default_timeout_secs() -> u64 {
        30
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, typically the environment.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if let Some(url) = value(API_URL_VAR) {
            self.api_url = url;
        }
        if let Some(raw) = value(TIMEOUT_VAR) {
            self.timeout_secs = raw.parse().map_err(|_| {
                ConfigError::Invalid(format!("{TIMEOUT_VAR} must be a number of seconds, got `{raw}`"))
            })?;
        }
        if let Some(dir) = value(EXPORT_DIR_VAR) {
            self.export_dir = Some(PathBuf::from(dir));
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "backend URL must start with http:// or https://, got `{url}`"
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout must be at least one second".into()));
        }
        Ok(())
    }

    /// Base URL without trailing slashes, ready for path joins.
    pub fn base_url(&self) -> &str {
        self.api_url.trim().trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(path) = &self.data_dir {
            return path.clone();
        }
        dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    pub fn resolve_export_dir(&self) -> PathBuf {
        if let Some(path) = &self.export_dir {
            return path.clone();
        }
        dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Rendiconti")
    }
}
