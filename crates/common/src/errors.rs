//! Ошибки конфигурации, общие для всех крейтов workspace.

use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required config: {config_key}")]
    MissingRequired { config_key: String },

    #[error("Invalid config value: {config_key} = '{value}' - {reason}")]
    InvalidValue {
        config_key: String,
        value: String,
        reason: String,
    },

    #[error("Config file not found: {file_path}")]
    FileNotFound { file_path: String },

    #[error("Config parsing failed: {format} - {reason}")]
    ParsingFailed { format: String, reason: String },

    #[error("Environment variable error: {var_name} - {reason}")]
    EnvVarError { var_name: String, reason: String },

    #[error("Config validation failed: {reason}")]
    ValidationFailed { reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    pub fn invalid(config_key: impl Into<String>, value: impl ToString, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            config_key: config_key.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
