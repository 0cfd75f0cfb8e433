//! Bridge configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/proclaim-bridge/bridge.toml`
//! - Windows: `%APPDATA%/proclaim-bridge/bridge.toml`
//!
//! `PROCLAIM_BRIDGE_CONFIG` overrides the location.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use proclaim_connection::ControlConfig;
use proclaim_protocol::auth_required;
use serde::{Deserialize, Serialize};

/// Environment variable pointing at an alternative config file.
const CONFIG_ENV: &str = "PROCLAIM_BRIDGE_CONFIG";

/// Validation failures for user-entered settings.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("'{0}' is not a valid IPv4 address")]
    InvalidHost(String),

    #[error("a password is required when Proclaim is not on this machine")]
    MissingPassword,
}

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// IPv4 address of the machine running Proclaim.
    #[serde(default = "default_host")]
    pub host: String,

    /// Remote control password (ignored for 127.0.0.1).
    #[serde(default)]
    pub password: String,
}

fn default_host() -> String {
    proclaim_protocol::LOOPBACK_HOST.into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            password: String::new(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, writing defaults if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save_to(path)?;
            config
        };
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // The file holds a password.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Checks the two user fields.
    ///
    /// An empty host passes: it is reported as a bad configuration through
    /// the connection status instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Ok(());
        }
        if self.host.parse::<Ipv4Addr>().is_err() {
            return Err(ConfigError::InvalidHost(self.host.clone()));
        }
        if auth_required(&self.host) && self.password.is_empty() {
            return Err(ConfigError::MissingPassword);
        }
        Ok(())
    }

    pub fn to_control(&self) -> ControlConfig {
        ControlConfig::new(self.host.trim(), self.password.clone())
    }
}

/// Returns the configuration file path.
pub fn config_path() -> anyhow::Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV)
        && !path.is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("proclaim-bridge")
            .join("bridge.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata)
            .join("proclaim-bridge")
            .join("bridge.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/proclaim-bridge/bridge.toml"))
    }
}
