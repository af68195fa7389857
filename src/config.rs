//! Configuration loading and management
//!
//! Handles parsing of `taskdesk.toml` from the config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File name of the configuration file inside the config directory
pub const CONFIG_FILE: &str = "taskdesk.toml";

/// Environment variable that overrides the config directory
pub const CONFIG_DIR_ENV: &str = "TASKDESK_CONFIG_DIR";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Hosted backend connection
    #[serde(default)]
    pub backend: BackendConfig,

    /// Dashboard behaviour
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Route gate behaviour
    #[serde(default)]
    pub gate: GateConfig,
}

/// Hosted backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`
    #[serde(default)]
    pub url: Option<String>,

    /// Public (anon) API key sent with every request
    #[serde(default)]
    pub anon_key: Option<String>,

    /// Table holding task records
    #[serde(default = "default_table")]
    pub table: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_table() -> String {
    "tasks".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            table: default_table(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Dashboard settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Size of the recent window in days
    #[serde(default = "default_recent_days")]
    pub recent_days: u32,

    /// How long the "Saved successfully" flash stays visible
    #[serde(default = "default_flash_ms")]
    pub flash_ms: u64,
}

fn default_recent_days() -> u32 {
    30
}

fn default_flash_ms() -> u64 {
    2500
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            recent_days: default_recent_days(),
            flash_ms: default_flash_ms(),
        }
    }
}

/// Gate settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// What to do when the session lookup itself fails: `deny` or `admit`
    #[serde(default = "default_on_lookup_error")]
    pub on_lookup_error: String,
}

fn default_on_lookup_error() -> String {
    "deny".to_string()
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            on_lookup_error: default_on_lookup_error(),
        }
    }
}

impl Config {
    /// Load configuration from a `taskdesk.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a config directory, or return defaults when
    /// no file exists there
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply command-line / environment overrides on top of the file values
    pub fn with_overrides(mut self, url: Option<String>, anon_key: Option<String>) -> Result<Self> {
        if let Some(url) = url.filter(|value| !value.trim().is_empty()) {
            self.backend.url = Some(url);
        }
        if let Some(key) = anon_key.filter(|value| !value.trim().is_empty()) {
            self.backend.anon_key = Some(key);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn gate_policy(&self) -> crate::gate::GatePolicy {
        if self.gate.on_lookup_error.trim() == "admit" {
            crate::gate::GatePolicy::FailOpen
        } else {
            crate::gate::GatePolicy::FailClosed
        }
    }

    fn validate(&self) -> Result<()> {
        self.backend.validate()?;
        self.dashboard.validate()?;
        self.gate.validate()?;
        Ok(())
    }
}

impl BackendConfig {
    /// Both the URL and key, or an error naming what is missing
    pub fn endpoint(&self) -> Result<(url::Url, String)> {
        let raw = self
            .url
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig("backend.url is not set".to_string()))?;
        let key = self
            .anon_key
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig("backend.anon_key is not set".to_string()))?;
        Ok((parse_base_url(raw)?, key.trim().to_string()))
    }

    fn validate(&self) -> Result<()> {
        if let Some(raw) = self.url.as_deref().filter(|value| !value.trim().is_empty()) {
            parse_base_url(raw)?;
        }
        let table = self.table.trim();
        if table.is_empty() {
            return Err(Error::InvalidConfig(
                "backend.table cannot be empty".to_string(),
            ));
        }
        if !table
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        {
            return Err(Error::InvalidConfig(format!(
                "backend.table '{table}' must be alphanumeric or '_'"
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "backend.timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl DashboardConfig {
    fn validate(&self) -> Result<()> {
        if self.recent_days == 0 {
            return Err(Error::InvalidConfig(
                "dashboard.recent_days must be >= 1".to_string(),
            ));
        }
        if self.recent_days > 3650 {
            return Err(Error::InvalidConfig(
                "dashboard.recent_days must be <= 3650".to_string(),
            ));
        }
        Ok(())
    }
}

impl GateConfig {
    fn validate(&self) -> Result<()> {
        match self.on_lookup_error.trim() {
            "admit" | "deny" => Ok(()),
            other => Err(Error::InvalidConfig(format!(
                "gate.on_lookup_error: invalid value '{other}' (expected admit|deny)"
            ))),
        }
    }
}

fn parse_base_url(raw: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|err| Error::InvalidConfig(format!("backend.url '{raw}': {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::InvalidConfig(format!(
            "backend.url: unsupported scheme '{other}' (expected http|https)"
        ))),
    }
}

/// Resolve the config directory: explicit flag, then `TASKDESK_CONFIG_DIR`,
/// then the platform config dir.
pub fn resolve_config_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    directories::ProjectDirs::from("", "", "taskdesk")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| {
            Error::InvalidConfig("cannot determine a config directory; set TASKDESK_CONFIG_DIR".to_string())
        })
}
