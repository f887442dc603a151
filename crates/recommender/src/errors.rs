use crate::catalog::ToolId;
use std::path::PathBuf;
use thiserror::Error;

/// Ошибки загрузки артефактов (каталог, toolbox, гиперпараметры).
/// Всегда фатальны для запроса: они означают сломанный деплой.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Artifact not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed artifact {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("Catalog is empty")]
    EmptyCatalog,

    #[error("Duplicate tool id {id} for '{first}' and '{second}'")]
    DuplicateId {
        id: ToolId,
        first: String,
        second: String,
    },

    #[error("Tool '{0}' has no embedding in the toolbox")]
    MissingEmbedding(String),

    #[error("Embedding of '{name}' has {actual} dims, expected {expected}")]
    EmbeddingDimension {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Model output references unknown tool id {0}")]
    UnknownToolId(ToolId),
}

/// Ошибки построения графа
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Cannot encode an empty sequence")]
    EmptySequence,

    #[error("Step {position} has feature width {actual}, expected {expected}")]
    FeatureWidth {
        position: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Ошибки scorer'а: загрузка модели и forward pass
#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("Model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Feature width mismatch: model expects {expected}, graph has {actual}")]
    FeatureWidthMismatch { expected: usize, actual: usize },

    #[error("Model produced {actual} logits, expected {expected}")]
    OutputSize { expected: usize, actual: usize },

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Scorer support is not compiled in (enable the `onnx` feature)")]
    Unsupported,
}

#[cfg(feature = "onnx")]
impl From<ort::Error> for ScorerError {
    fn from(e: ort::Error) -> Self {
        ScorerError::Inference(e.to_string())
    }
}

/// Некорректный ввод при интерактивном выборе кандидата.
/// Никогда не выходит за пределы валидатора: вызывающий переспрашивает.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("Selection {selection} is out of range 0..={shown}")]
    OutOfRange { selection: i64, shown: usize },

    #[error("No disambiguation request is pending")]
    NothingPending,
}

/// Общая ошибка пайплайна рекомендаций
#[derive(Debug, Error)]
pub enum RecommenderError {
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Configuration error: {0}")]
    Config(#[from] common::ConfigError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Scorer error: {0}")]
    Scorer(#[from] ScorerError),
}

pub type Result<T> = std::result::Result<T, RecommenderError>;
