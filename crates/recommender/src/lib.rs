pub mod artifacts;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod graph;
pub mod pipeline;
pub mod scorer;
pub mod similarity;
pub mod topk;
pub mod validator;

#[cfg(feature = "onnx")]
pub mod ort_setup;

// Core exports (always available)
pub use artifacts::ArtifactPaths;
pub use catalog::{SequenceStep, Tool, ToolCatalog, ToolId};
pub use config::{
    BaseConfig, BestHyperparameters, ConfigResolver, DataConfig, Device, LoaderConfig,
    RecommendationSettings, ResolvedConfig,
};
pub use errors::{ArtifactError, GraphError, RecommenderError, Result, ScorerError, SelectionError};
pub use graph::{encode, EncodedGraph, GraphBatch, PathGraph};
pub use pipeline::{recommend_sequence, Recommendation, RecommendationService, Recommender};
pub use scorer::{GraphScorer, ScorerLoader, ScorerManifest};
pub use validator::{
    rank_candidates, validate_sequence, validate_with_prompt, Candidate, DisambiguationRequest, Selection,
    SelectionPrompt, SequenceValidator, ValidationSession, ValidationStep, ValidatorOptions,
};

// ONNX exports
#[cfg(feature = "onnx")]
pub use scorer::{OnnxGraphScorer, OnnxScorerLoader};

#[cfg(not(feature = "onnx"))]
pub use scorer::UnsupportedScorerLoader;
