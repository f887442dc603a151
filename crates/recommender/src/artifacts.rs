use crate::catalog::ToolCatalog;
use crate::config::BestHyperparameters;
use crate::errors::ArtifactError;
use std::path::{Path, PathBuf};

/// Раскладка артефактов обучения на диске.
///
/// ```text
/// <out>/toolbox.json
/// <out>/<model>/info.json
/// <out>/<model>/model.onnx, model.json
/// <out>/<model>_optimize/best_hyperparameters.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    out_dir: PathBuf,
    model_name: String,
}

impl ArtifactPaths {
    pub const INFO_FILE: &'static str = "info.json";
    pub const TOOLBOX_FILE: &'static str = "toolbox.json";
    pub const BEST_PARAMS_FILE: &'static str = "best_hyperparameters.json";

    pub fn new(out_dir: impl Into<PathBuf>, model_name: impl Into<String>) -> Self {
        Self {
            out_dir: out_dir.into(),
            model_name: model_name.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn model_dir(&self) -> PathBuf {
        self.out_dir.join(&self.model_name)
    }

    pub fn optimize_dir(&self) -> PathBuf {
        self.out_dir.join(format!("{}_optimize", self.model_name))
    }

    pub fn info_path(&self) -> PathBuf {
        self.model_dir().join(Self::INFO_FILE)
    }

    pub fn toolbox_path(&self) -> PathBuf {
        self.out_dir.join(Self::TOOLBOX_FILE)
    }

    pub fn best_hyperparameters_path(&self) -> PathBuf {
        self.optimize_dir().join(Self::BEST_PARAMS_FILE)
    }

    pub fn load_catalog(&self) -> Result<ToolCatalog, ArtifactError> {
        ToolCatalog::load(&self.info_path(), &self.toolbox_path())
    }

    pub fn load_best_hyperparameters(&self) -> Result<BestHyperparameters, ArtifactError> {
        BestHyperparameters::load(&self.best_hyperparameters_path())
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::new("out", "model")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let paths = ArtifactPaths::new("/data/out", "gnn");

        assert_eq!(paths.model_dir(), PathBuf::from("/data/out/gnn"));
        assert_eq!(paths.optimize_dir(), PathBuf::from("/data/out/gnn_optimize"));
        assert_eq!(paths.info_path(), PathBuf::from("/data/out/gnn/info.json"));
        assert_eq!(paths.toolbox_path(), PathBuf::from("/data/out/toolbox.json"));
        assert_eq!(
            paths.best_hyperparameters_path(),
            PathBuf::from("/data/out/gnn_optimize/best_hyperparameters.json")
        );
    }

    #[test]
    fn test_missing_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path(), "model");

        assert!(matches!(
            paths.load_catalog(),
            Err(ArtifactError::NotFound { .. })
        ));
    }
}
