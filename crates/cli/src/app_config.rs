//! TOML конфигурация приложения.
//!
//! Порядок приоритета: флаг CLI > переменная окружения > файл > значения по
//! умолчанию. Флаги и `TOOLREC_ARTIFACTS` / `TOOLREC_MODEL` / `TOOLREC_CONFIG`
//! разбирает clap, остальные переменные читаются в [`AppConfig::apply_env`].

use anyhow::{Context, Result};
use common::{env_flag, env_override, ConfigError, ConfigResult, ConfigTrait, LoggingConfig};
use recommender::config::{BaseConfig, Device, RecommendationSettings};
use recommender::validator::{ValidatorOptions, CANDIDATES_TO_SHOW};
use recommender::ArtifactPaths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::Level;

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub json: bool,
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            json: false,
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub artifacts_dir: PathBuf,
    pub model_name: String,
    pub tools_to_recommend: usize,
    pub candidates_to_show: usize,
    pub match_interactively: bool,
    pub device: Device,
    pub logging: LogSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from("out"),
            model_name: "model".to_string(),
            tools_to_recommend: recommender::config::TOOLS_TO_RECOMMEND,
            candidates_to_show: CANDIDATES_TO_SHOW,
            match_interactively: true,
            device: Device::Cuda,
            logging: LogSection::default(),
        }
    }
}

impl ConfigTrait for AppConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.model_name.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                config_key: "model_name".to_string(),
            });
        }
        self.settings().validate()?;
        parse_level(&self.logging.level)?;
        Ok(())
    }
}

impl AppConfig {
    /// Explicit file, else `<config dir>/toolrec/config.toml` if present, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        let mut config = match path {
            Some(path) => Self::from_toml_file(&path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// `TOOLREC_DEVICE`, `TOOLREC_TOOLS_TO_RECOMMEND`, `TOOLREC_CANDIDATES`,
    /// `TOOLREC_INTERACTIVE`, `TOOLREC_LOG_JSON`, `TOOLREC_LOG_LEVEL`
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        if let Some(device) = env_override("TOOLREC_DEVICE") {
            self.device = device.parse()?;
        }
        if let Some(k) = env_override("TOOLREC_TOOLS_TO_RECOMMEND") {
            self.tools_to_recommend = parse_count("TOOLREC_TOOLS_TO_RECOMMEND", &k)?;
        }
        if let Some(n) = env_override("TOOLREC_CANDIDATES") {
            self.candidates_to_show = parse_count("TOOLREC_CANDIDATES", &n)?;
        }
        if let Some(interactive) = env_flag("TOOLREC_INTERACTIVE") {
            self.match_interactively = interactive;
        }
        if let Some(json) = env_flag("TOOLREC_LOG_JSON") {
            self.logging.json = json;
        }
        if let Some(level) = env_override("TOOLREC_LOG_LEVEL") {
            self.logging.level = level;
        }
        self.validate()
    }

    pub fn artifacts(&self) -> ArtifactPaths {
        ArtifactPaths::new(&self.artifacts_dir, &self.model_name)
    }

    pub fn settings(&self) -> RecommendationSettings {
        RecommendationSettings {
            tools_to_recommend: self.tools_to_recommend,
            validator: ValidatorOptions {
                candidates_to_show: self.candidates_to_show,
                match_interactively: self.match_interactively,
            },
        }
    }

    /// Base scorer config for this deployment
    pub fn base_config(&self) -> BaseConfig {
        BaseConfig {
            device: self.device,
            model_path: self.artifacts().optimize_dir(),
            ..BaseConfig::default()
        }
    }

    /// `verbose` поднимает уровень: -v → info, -vv → debug
    pub fn logging_config(&self, verbose: u8) -> ConfigResult<LoggingConfig> {
        let configured = parse_level(&self.logging.level)?;
        let level = match verbose {
            0 => configured,
            1 => configured.max(Level::INFO),
            _ => configured.max(Level::DEBUG),
        };
        Ok(LoggingConfig {
            level,
            json_output: self.logging.json,
            color_output: console::colors_enabled_stderr(),
            ..LoggingConfig::default()
        })
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("toolrec").join(CONFIG_FILE_NAME))
}

fn parse_count(key: &str, raw: &str) -> ConfigResult<usize> {
    raw.parse()
        .map_err(|_| ConfigError::invalid(key, raw, "expected a positive integer"))
}

fn parse_level(raw: &str) -> ConfigResult<Level> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::invalid("logging.level", raw, "expected trace|debug|info|warn|error"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "model_name = \"gnn\"\ntools_to_recommend = 3\n[logging]\nlevel = \"info\"").unwrap();

        let config = AppConfig::from_toml_file(file.path()).unwrap();

        assert_eq!(config.model_name, "gnn");
        assert_eq!(config.tools_to_recommend, 3);
        assert_eq!(config.candidates_to_show, CANDIDATES_TO_SHOW);
        assert!(!config.logging.json);
        assert_eq!(config.artifacts().model_dir(), PathBuf::from("out").join("gnn"));
    }

    #[test]
    fn test_zero_candidates_rejected() {
        let config = AppConfig {
            candidates_to_show: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_verbosity_raises_level() {
        let config = AppConfig::default();

        assert_eq!(config.logging_config(0).unwrap().level, Level::WARN);
        assert_eq!(config.logging_config(1).unwrap().level, Level::INFO);
        assert_eq!(config.logging_config(3).unwrap().level, Level::DEBUG);
    }

    #[test]
    fn test_base_config_points_at_optimize_dir() {
        let config = AppConfig {
            device: Device::Cpu,
            ..AppConfig::default()
        };
        let base = config.base_config();

        assert_eq!(base.device, Device::Cpu);
        assert_eq!(base.model_path, PathBuf::from("out").join("model_optimize"));
    }
}
