use crate::catalog::read_json;
use crate::config::LoaderConfig;
use crate::errors::{ArtifactError, ScorerError};
use crate::graph::GraphBatch;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Pre-trained graph model producing one logit per catalog tool.
///
/// Implementations are inference-only: `forward` never updates parameters.
pub trait GraphScorer: Send + Sync {
    /// Ожидаемая ширина строки признаков узла
    fn input_width(&self) -> usize;

    /// Фиксированная мощность выхода (число инструментов)
    fn output_size(&self) -> usize;

    /// Один forward pass над батчем из одного графа
    fn forward(&self, batch: &GraphBatch) -> Result<Vec<f32>, ScorerError>;
}

/// Загрузчик scorer'а по итоговой конфигурации
pub trait ScorerLoader {
    fn load(&self, config: &LoaderConfig) -> Result<Box<dyn GraphScorer>, ScorerError>;
}

/// Checks the feature width, runs exactly one forward pass and checks the
/// output cardinality.
pub fn score(scorer: &dyn GraphScorer, batch: &GraphBatch) -> Result<Vec<f32>, ScorerError> {
    if batch.feature_width() != scorer.input_width() {
        return Err(ScorerError::FeatureWidthMismatch {
            expected: scorer.input_width(),
            actual: batch.feature_width(),
        });
    }

    let logits = scorer.forward(batch)?;
    if logits.len() != scorer.output_size() {
        return Err(ScorerError::OutputSize {
            expected: scorer.output_size(),
            actual: logits.len(),
        });
    }

    debug!(logits = logits.len(), "Forward pass complete");
    Ok(logits)
}

/// Имена входов ONNX графа
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputNames {
    pub x: String,
    pub edge_index: String,
    pub batch: String,
}

impl Default for InputNames {
    fn default() -> Self {
        Self {
            x: "x".to_string(),
            edge_index: "edge_index".to_string(),
            batch: "batch".to_string(),
        }
    }
}

/// `model.json` рядом с моделью: размеры и имена входов/выхода
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorerManifest {
    pub in_channels: usize,
    pub out_channels: usize,
    #[serde(default)]
    pub input_names: InputNames,
    /// `None`: первый выход модели
    #[serde(default)]
    pub output_name: Option<String>,
}

impl ScorerManifest {
    pub const FILE_NAME: &'static str = "model.json";

    pub fn from_data(config: &LoaderConfig) -> Self {
        Self {
            in_channels: config.data.num_node_features,
            out_channels: config.data.num_tools,
            input_names: InputNames::default(),
            output_name: None,
        }
    }

    /// Manifest next to the model file, falling back to the data config
    pub fn resolve(config: &LoaderConfig) -> Result<Self, ArtifactError> {
        let path = config.model.model_path.join(Self::FILE_NAME);
        if !path.exists() {
            debug!("No {} found, using data config dimensions", Self::FILE_NAME);
            return Ok(Self::from_data(config));
        }
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let manifest: Self = read_json(path)?;
        info!(
            in_channels = manifest.in_channels,
            out_channels = manifest.out_channels,
            "Scorer manifest loaded"
        );
        Ok(manifest)
    }
}

#[cfg(feature = "onnx")]
pub use onnx::{OnnxGraphScorer, OnnxScorerLoader};

#[cfg(feature = "onnx")]
mod onnx {
    use super::{GraphScorer, ScorerLoader, ScorerManifest};
    use crate::config::{Device, LoaderConfig};
    use crate::errors::ScorerError;
    use crate::graph::GraphBatch;
    use crate::ort_setup;
    use ort::{
        inputs,
        session::{builder::GraphOptimizationLevel, Session},
        value::Tensor,
    };
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};
    use tracing::{info, warn};

    /// Scorer на ONNX Runtime: модель экспортирована в режиме eval
    pub struct OnnxGraphScorer {
        session: Mutex<Session>,
        manifest: ScorerManifest,
        model_path: PathBuf,
    }

    impl OnnxGraphScorer {
        pub fn new(model_path: &Path, manifest: ScorerManifest, device: Device) -> Result<Self, ScorerError> {
            if !model_path.exists() {
                return Err(ScorerError::ModelNotFound(model_path.to_path_buf()));
            }
            ort_setup::configure_ort_env();

            let builder = Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .with_intra_threads(1)?;

            #[cfg(feature = "cuda")]
            let builder = if device == Device::Cuda {
                info!("🚀 Using CUDA execution provider");
                builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default().build(),
                ])?
            } else {
                builder
            };

            #[cfg(not(feature = "cuda"))]
            if device == Device::Cuda {
                warn!("⚠️ Device 'cuda' requested but CUDA support is not compiled in, using CPU");
            }

            let session = builder
                .commit_from_file(model_path)
                .map_err(|e| ScorerError::ModelLoad(format!("{}: {}", model_path.display(), e)))?;

            info!("✅ ONNX scorer session created");
            info!("   Model: {}", model_path.display());
            info!("   Inputs: {}", session.inputs.len());
            info!("   Outputs: {}", session.outputs.len());

            Ok(Self {
                session: Mutex::new(session),
                manifest,
                model_path: model_path.to_path_buf(),
            })
        }

        pub fn model_path(&self) -> &Path {
            &self.model_path
        }
    }

    impl GraphScorer for OnnxGraphScorer {
        fn input_width(&self) -> usize {
            self.manifest.in_channels
        }

        fn output_size(&self) -> usize {
            self.manifest.out_channels
        }

        fn forward(&self, batch: &GraphBatch) -> Result<Vec<f32>, ScorerError> {
            let x = Tensor::from_array((
                [batch.num_nodes(), batch.feature_width()],
                batch.x.iter().copied().collect::<Vec<f32>>(),
            ))?;
            let edge_index = Tensor::from_array((
                [2, batch.num_edges()],
                batch.edge_index.iter().copied().collect::<Vec<i64>>(),
            ))?;
            let graph_batch = Tensor::from_array((
                [batch.num_nodes()],
                batch.batch.iter().copied().collect::<Vec<i64>>(),
            ))?;

            let names = &self.manifest.input_names;
            let mut session = self.session.lock();
            let outputs = session.run(inputs![
                names.x.as_str() => x,
                names.edge_index.as_str() => edge_index,
                names.batch.as_str() => graph_batch
            ])?;

            for (name, output) in outputs.iter() {
                if let Some(wanted) = &self.manifest.output_name {
                    if name != wanted.as_str() {
                        continue;
                    }
                }
                let (_shape, data) = output.try_extract_tensor::<f32>()?;
                return Ok(data.to_vec());
            }

            Err(ScorerError::Inference(format!(
                "model output '{}' not found",
                self.manifest.output_name.as_deref().unwrap_or("<first>")
            )))
        }
    }

    /// Загрузчик ONNX модели по `LoaderConfig`
    #[derive(Debug, Default, Clone, Copy)]
    pub struct OnnxScorerLoader;

    impl ScorerLoader for OnnxScorerLoader {
        fn load(&self, config: &LoaderConfig) -> Result<Box<dyn GraphScorer>, ScorerError> {
            let model_file = config.model_file();
            let manifest = ScorerManifest::resolve(config)
                .map_err(|e| ScorerError::ModelLoad(e.to_string()))?;
            if manifest.in_channels != config.data.num_node_features {
                warn!(
                    model = manifest.in_channels,
                    catalog = config.data.num_node_features,
                    "Model input width differs from catalog feature width"
                );
            }
            let scorer = OnnxGraphScorer::new(&model_file, manifest, config.model.device)?;
            Ok(Box::new(scorer))
        }
    }
}

#[cfg(not(feature = "onnx"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedScorerLoader;

#[cfg(not(feature = "onnx"))]
impl ScorerLoader for UnsupportedScorerLoader {
    fn load(&self, _config: &LoaderConfig) -> Result<Box<dyn GraphScorer>, ScorerError> {
        Err(ScorerError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    struct ConstScorer {
        width: usize,
        logits: Vec<f32>,
        output_size: usize,
    }

    impl GraphScorer for ConstScorer {
        fn input_width(&self) -> usize {
            self.width
        }

        fn output_size(&self) -> usize {
            self.output_size
        }

        fn forward(&self, _batch: &GraphBatch) -> Result<Vec<f32>, ScorerError> {
            Ok(self.logits.clone())
        }
    }

    fn batch(width: usize) -> GraphBatch {
        GraphBatch {
            x: Array2::zeros((1, width)),
            edge_index: Array2::zeros((2, 0)),
            batch: Array1::zeros(1),
            num_graphs: 1,
        }
    }

    #[test]
    fn test_score_checks_feature_width() {
        let scorer = ConstScorer {
            width: 4,
            logits: vec![0.0; 3],
            output_size: 3,
        };

        let err = score(&scorer, &batch(3)).unwrap_err();
        assert!(matches!(
            err,
            ScorerError::FeatureWidthMismatch { expected: 4, actual: 3 }
        ));
        assert_eq!(score(&scorer, &batch(4)).unwrap().len(), 3);
    }

    #[test]
    fn test_score_checks_output_size() {
        let scorer = ConstScorer {
            width: 4,
            logits: vec![0.0; 2],
            output_size: 3,
        };

        assert!(matches!(
            score(&scorer, &batch(4)),
            Err(ScorerError::OutputSize { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_manifest_defaults() {
        let manifest: ScorerManifest =
            serde_json::from_str(r#"{"in_channels": 769, "out_channels": 1200}"#).unwrap();

        assert_eq!(manifest.input_names, InputNames::default());
        assert_eq!(manifest.output_name, None);
    }
}
