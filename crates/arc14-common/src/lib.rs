pub mod config;
pub mod logging;

pub const APP_NAME: &str = "ARC-14";

pub use config::{
    Arc14Config, ConfigError, DatabaseConfig, NotificationConfig, SchedulingConfig, ServerConfig,
};
