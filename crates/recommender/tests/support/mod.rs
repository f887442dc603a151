#![allow(dead_code)]

use recommender::config::LoaderConfig;
use recommender::errors::ScorerError;
use recommender::graph::GraphBatch;
use recommender::scorer::{GraphScorer, ScorerLoader};
use recommender::validator::{DisambiguationRequest, SelectionPrompt};
use recommender::{ArtifactPaths, SelectionError};
use serde_json::json;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// name → id, embedding dim 2
pub const TOOLS: [(&str, u32); 5] = [
    ("umi_tools_extract", 0),
    ("rna_star", 1),
    ("bamFilter", 2),
    ("bam_filter", 3),
    ("featurecounts", 4),
];

pub const MODEL_NAME: &str = "model";

pub fn embedding(id: u32) -> Vec<f32> {
    vec![id as f32 / 10.0, 1.0]
}

/// Temp `out/` dir with toolbox.json and info.json (no hyperparameters)
pub fn artifact_dir() -> (TempDir, ArtifactPaths) {
    let dir = TempDir::new().unwrap();
    let paths = ArtifactPaths::new(dir.path(), MODEL_NAME);

    let toolbox: serde_json::Map<String, serde_json::Value> = TOOLS
        .iter()
        .map(|&(name, id)| {
            (
                name.to_string(),
                json!({ "description": format!("{name} tool"), "embedding": embedding(id) }),
            )
        })
        .collect();
    write_json(&paths.toolbox_path(), &json!(toolbox));

    let name_to_id: serde_json::Map<String, serde_json::Value> =
        TOOLS.iter().map(|&(name, id)| (name.to_string(), json!(id))).collect();
    write_json(&paths.info_path(), &json!({ "tool_name_to_id": name_to_id }));

    (dir, paths)
}

pub fn write_best_params(paths: &ArtifactPaths, params: serde_json::Value) {
    write_json(&paths.best_hyperparameters_path(), &params);
}

pub fn write_json(path: &Path, value: &serde_json::Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

/// Prompt with pre-recorded answers; `None` once they run out
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    pub requests: Vec<DisambiguationRequest>,
    pub retries: Vec<SelectionError>,
}

impl ScriptedPrompt {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }
}

impl SelectionPrompt for ScriptedPrompt {
    fn select(
        &mut self,
        request: &DisambiguationRequest,
        retry: Option<&SelectionError>,
    ) -> Option<String> {
        self.requests.push(request.clone());
        if let Some(err) = retry {
            self.retries.push(err.clone());
        }
        self.answers.pop_front()
    }
}

/// Returns the same logits for every graph
pub struct FixedScorer {
    pub width: usize,
    pub logits: Vec<f32>,
}

impl GraphScorer for FixedScorer {
    fn input_width(&self) -> usize {
        self.width
    }

    fn output_size(&self) -> usize {
        self.logits.len()
    }

    fn forward(&self, _batch: &GraphBatch) -> Result<Vec<f32>, ScorerError> {
        Ok(self.logits.clone())
    }
}

/// Records every config it was asked to load
pub struct RecordingLoader {
    pub logits: Vec<f32>,
    pub loaded: RefCell<Vec<LoaderConfig>>,
}

impl RecordingLoader {
    pub fn new(logits: Vec<f32>) -> Self {
        Self {
            logits,
            loaded: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.loaded.borrow().len()
    }
}

impl ScorerLoader for RecordingLoader {
    fn load(&self, config: &LoaderConfig) -> Result<Box<dyn GraphScorer>, ScorerError> {
        self.loaded.borrow_mut().push(config.clone());
        Ok(Box::new(FixedScorer {
            width: config.data.num_node_features,
            logits: self.logits.clone(),
        }))
    }
}
