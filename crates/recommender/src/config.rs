use crate::catalog::{read_json, ToolCatalog};
use crate::errors::ArtifactError;
use crate::validator::ValidatorOptions;
use common::{ConfigError, ConfigResult, ConfigTrait};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Сколько инструментов рекомендовать по умолчанию
pub const TOOLS_TO_RECOMMEND: usize = 5;
/// K для hit-rate при оценке модели
pub const HITRATE_K: usize = 5;
/// K для MRR при оценке модели
pub const MRR_K: usize = 5;
/// Архитектура scorer'а по умолчанию
pub const MODEL_TYPE: &str = "gcn";

/// Поля, которые после наложения гиперпараметров приводятся к целым
pub const INTEGER_FIELDS: [&str; 4] = ["hidden_channels", "step_size", "batch_size", "epochs"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cuda,
    Cpu,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cuda => write!(f, "cuda"),
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

impl std::str::FromStr for Device {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cuda" | "gpu" => Ok(Device::Cuda),
            "cpu" => Ok(Device::Cpu),
            other => Err(ConfigError::invalid("device", other, "expected 'cuda' or 'cpu'")),
        }
    }
}

/// Базовая конфигурация, под которой обучался scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseConfig {
    pub device: Device,
    pub model_type: String,
    pub hidden_channels: u64,
    pub learning_rate: f64,
    pub l2_penalty: f64,
    pub step_size: u64,
    pub weight_decay: f64,
    pub emb_dropout: f64,
    pub dropout: f64,
    pub epochs: u64,
    pub batch_size: u64,
    pub model_path: PathBuf,
    pub model_name: String,
    /// K для hit-rate
    pub top_k: usize,
    pub mrr_k: usize,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            device: Device::Cuda,
            model_type: MODEL_TYPE.to_string(),
            hidden_channels: 32,
            learning_rate: 0.001,
            l2_penalty: 0.00001,
            step_size: 30,
            weight_decay: 0.1,
            emb_dropout: 0.0,
            dropout: 0.0,
            epochs: 100,
            batch_size: 100,
            model_path: PathBuf::from("out").join("model_optimize"),
            model_name: "model.onnx".to_string(),
            top_k: HITRATE_K,
            mrr_k: MRR_K,
        }
    }
}

impl ConfigTrait for BaseConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.model_name.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                config_key: "model_name".to_string(),
            });
        }
        Ok(())
    }
}

/// Сохранённая запись лучших гиперпараметров: имя → значение
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct BestHyperparameters(pub Map<String, Value>);

impl BestHyperparameters {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let record: Self = read_json(path)?;
        debug!("Loaded {} best hyperparameters from {}", record.0.len(), path.display());
        Ok(record)
    }
}

/// Итоговая конфигурация запроса. Создаётся только через [`ConfigResolver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub device: Device,
    pub model_type: String,
    pub hidden_channels: u64,
    pub learning_rate: f64,
    pub l2_penalty: f64,
    pub step_size: u64,
    pub weight_decay: f64,
    pub emb_dropout: f64,
    pub dropout: f64,
    pub epochs: u64,
    pub batch_size: u64,
    pub model_path: PathBuf,
    pub model_name: String,
    pub top_k: usize,
    pub mrr_k: usize,
    /// Keys from the hyperparameter record the base config does not know
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Builder: base config + best hyperparameters + model path
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    base: BaseConfig,
    best: BestHyperparameters,
    model_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(base: BaseConfig) -> Self {
        Self {
            base,
            best: BestHyperparameters::default(),
            model_path: None,
        }
    }

    pub fn with_best_params(mut self, best: BestHyperparameters) -> Self {
        self.best = best;
        self
    }

    pub fn with_model_path(mut self, model_path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(model_path.into());
        self
    }

    /// Overlays the record on the base config, coerces the integer fields and
    /// attaches the model path.
    pub fn resolve(self) -> ConfigResult<ResolvedConfig> {
        self.base.validate()?;

        let mut record = match serde_json::to_value(&self.base) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                return Err(ConfigError::ValidationFailed {
                    reason: "base config is not representable as a record".to_string(),
                })
            }
        };

        for (key, value) in self.best.0 {
            record.insert(key, value);
        }

        for key in INTEGER_FIELDS {
            if let Some(value) = record.get(key) {
                let coerced = coerce_integer(key, value)?;
                record.insert(key.to_string(), Value::Number(Number::from(coerced)));
            }
        }

        if let Some(model_path) = self.model_path {
            record.insert(
                "model_path".to_string(),
                Value::String(model_path.to_string_lossy().to_string()),
            );
        }

        let resolved: ResolvedConfig =
            serde_json::from_value(Value::Object(record)).map_err(|e| ConfigError::ParsingFailed {
                format: "hyperparameters".to_string(),
                reason: e.to_string(),
            })?;
        debug!(
            model_type = %resolved.model_type,
            hidden_channels = resolved.hidden_channels,
            device = %resolved.device,
            "Resolved scorer configuration"
        );
        Ok(resolved)
    }
}

/// Int, float (усечение к нулю) или строка с числом → неотрицательное целое
fn coerce_integer(key: &str, value: &Value) -> ConfigResult<u64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() && n >= 0.0 => Ok(n.trunc() as u64),
        Some(_) => Err(ConfigError::invalid(key, value, "expected a non-negative integer")),
        None => Err(ConfigError::invalid(key, value, "expected an integer")),
    }
}

/// Дополнение конфигурации данными: размеры входа и выхода модели
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConfig {
    /// 1 + embedding dimensionality
    pub num_node_features: usize,
    /// Output cardinality: one logit per catalog tool
    pub num_tools: usize,
}

impl DataConfig {
    pub fn from_catalog(catalog: &ToolCatalog) -> Self {
        Self {
            num_node_features: catalog.feature_width(),
            num_tools: catalog.len(),
        }
    }
}

/// То, что получает загрузчик scorer'а
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoaderConfig {
    pub model: ResolvedConfig,
    pub data: DataConfig,
}

impl LoaderConfig {
    pub fn new(model: ResolvedConfig, data: DataConfig) -> Self {
        Self { model, data }
    }

    pub fn model_file(&self) -> PathBuf {
        self.model.model_path.join(&self.model.model_name)
    }
}

/// Параметры выдачи рекомендаций
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationSettings {
    pub tools_to_recommend: usize,
    pub validator: ValidatorOptions,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            tools_to_recommend: TOOLS_TO_RECOMMEND,
            validator: ValidatorOptions::default(),
        }
    }
}

impl ConfigTrait for RecommendationSettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.tools_to_recommend == 0 {
            return Err(ConfigError::invalid(
                "tools_to_recommend",
                0,
                "must be greater than 0",
            ));
        }
        if self.validator.candidates_to_show == 0 {
            return Err(ConfigError::invalid(
                "candidates_to_show",
                0,
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}
