use crate::{ConfigError, ConfigResult};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Общий Config trait для конфигураций workspace
pub trait ConfigTrait: Default + Clone + Send + Sync {
    /// Валидация конфигурации
    fn validate(&self) -> ConfigResult<()> {
        Ok(())
    }

    /// Загрузить конфигурацию из TOML файла и провалидировать её
    fn from_toml_file(path: &Path) -> ConfigResult<Self>
    where
        Self: DeserializeOwned,
    {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                file_path: path.display().to_string(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ParsingFailed {
            format: "toml".to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        let config: Self = toml::from_str(&raw).map_err(|e| ConfigError::ParsingFailed {
            format: "toml".to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }
}

/// Значение переменной окружения, если она задана и не пустая
pub fn env_override(var_name: &str) -> Option<String> {
    std::env::var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Булев флаг из окружения: "1" | "true" | "yes" | "y"
pub fn env_flag(var_name: &str) -> Option<bool> {
    env_override(var_name).map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "y"))
}
