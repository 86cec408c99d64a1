use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_CONFIG_FILE: &str = ".arc14/config.toml";
const DEFAULT_DB_FILE: &str = ".arc14/arc14.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arc14Config {
    pub log_level: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    /// Origins allowed by CORS. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: home_dir().join(DEFAULT_DB_FILE),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Local hour (0-24) at which task mutations close for the day.
    #[serde(default = "default_cutoff_hour")]
    pub cutoff_hour: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            cutoff_hour: default_cutoff_hour(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Six-field cron expression (seconds first) driving the reminder scan.
    #[serde(default = "default_scan_schedule")]
    pub scan_schedule: String,
    #[serde(default = "default_lead_minutes")]
    pub lead_minutes: i64,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_schedule: default_scan_schedule(),
            lead_minutes: default_lead_minutes(),
            sender: None,
            recipient: None,
            api_key: None,
            api_base: default_api_base(),
        }
    }
}

impl NotificationConfig {
    pub fn has_credentials(&self) -> bool {
        non_blank(self.api_key.as_deref()) && non_blank(self.sender.as_deref())
    }
}

impl Default for Arc14Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            scheduling: SchedulingConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cutoff_hour() -> u32 {
    21
}

fn default_scan_schedule() -> String {
    "0 */5 * * * *".to_string()
}

fn default_lead_minutes() -> i64 {
    30
}

fn default_api_base() -> String {
    "https://api.sendgrid.com".to_string()
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn non_blank(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write config at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize default config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("environment override {key}={value} is invalid")]
    InvalidOverride { key: String, value: String },
    #[error("config has invalid value: {0}")]
    ValidationFailed(String),
}

impl Arc14Config {
    pub fn resolve_path() -> PathBuf {
        if let Ok(path) = env::var("ARC14_CONFIG") {
            return PathBuf::from(path);
        }
        home_dir().join(DEFAULT_CONFIG_FILE)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::WriteFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, raw).map_err(|source| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    pub fn load_or_create() -> Result<(Self, PathBuf, bool), ConfigError> {
        let path = Self::resolve_path();
        if path.exists() {
            let cfg = Self::load(&path)?;
            return Ok((cfg, path, false));
        }

        let cfg = Self::default();
        cfg.save(&path)?;
        Ok((cfg, path, true))
    }

    /// Applies process environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| env::var(key).ok())
    }

    pub fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bind) = get("ARC14_BIND") {
            self.server.bind = bind.trim().to_string();
        }
        if let Some(port) = get("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOverride {
                    key: "PORT".to_string(),
                    value: port.clone(),
                })?;
            let host = self
                .server
                .bind
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            self.server.bind = format!("{host}:{port}");
        }
        if let Some(origins) = get("ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(db) = get("DATABASE_URL") {
            let trimmed = db.trim();
            let path = trimmed.strip_prefix("sqlite://").unwrap_or(trimmed);
            self.database.path = PathBuf::from(path);
        }
        if let Some(hour) = get("TASK_SCHEDULING_START_HOUR") {
            self.scheduling.cutoff_hour = hour.trim().parse().map_err(|_| {
                ConfigError::InvalidOverride {
                    key: "TASK_SCHEDULING_START_HOUR".to_string(),
                    value: hour.clone(),
                }
            })?;
        }
        if let Some(key) = get("SENDGRID_API_KEY") {
            self.notifications.api_key = Some(key);
        }
        if let Some(sender) = get("SENDER_EMAIL") {
            self.notifications.sender = Some(sender);
        }
        if let Some(recipient) = get("REMINDER_EMAIL") {
            self.notifications.recipient = Some(recipient);
        }
        if let Some(level) = get("ARC14_LOG") {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn validate_and_prepare(&self) -> Result<(), ConfigError> {
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "log_level cannot be empty".to_string(),
            ));
        }
        if self.server.bind.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "server.bind cannot be empty".to_string(),
            ));
        }
        if self.scheduling.cutoff_hour > 24 {
            return Err(ConfigError::ValidationFailed(format!(
                "scheduling.cutoff_hour must be between 0 and 24, got {}",
                self.scheduling.cutoff_hour
            )));
        }
        if self.notifications.lead_minutes <= 0 {
            return Err(ConfigError::ValidationFailed(
                "notifications.lead_minutes must be positive".to_string(),
            ));
        }
        if let Err(err) = cron::Schedule::from_str(&self.notifications.scan_schedule) {
            return Err(ConfigError::ValidationFailed(format!(
                "notifications.scan_schedule is not a valid cron expression: {err}"
            )));
        }
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "database.path cannot be empty".to_string(),
            ));
        }
        if let Some(parent) = self.database.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| ConfigError::WriteFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}
