use crate::errors::ArtifactError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Целочисленный идентификатор инструмента (позиция в выходе модели)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolId(pub u32);

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Инструмент каталога
#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    pub id: ToolId,
    pub name: String,
    pub embedding: Vec<f32>,
}

/// `info.json`, который пишет обучение модели
#[derive(Debug, Deserialize)]
struct InfoArtifact {
    tool_name_to_id: HashMap<String, u32>,
}

/// Одна запись `toolbox.json`; остальные поля (description, ...) не нужны
#[derive(Debug, Deserialize)]
struct ToolboxEntry {
    embedding: Vec<f32>,
}

/// Шаг провалидированной последовательности: (id, embedding)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceStep<'a> {
    pub id: ToolId,
    pub embedding: &'a [f32],
}

/// Read-only каталог инструментов.
///
/// Tools are stored in ascending id order, which is the "catalog order" used
/// to break similarity ties. Both name and id lookups are O(1).
///
/// The order in which names are written in `info.json` is not kept. When the
/// file lists ids out of order, candidate ties follow the ids, not the file.
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: Vec<Tool>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<ToolId, usize>,
    embedding_dim: usize,
}

impl ToolCatalog {
    /// Собрать каталог из отображения name → id и хранилища эмбеддингов
    pub fn from_parts(
        name_to_id: HashMap<String, u32>,
        mut embeddings: HashMap<String, Vec<f32>>,
    ) -> Result<Self, ArtifactError> {
        if name_to_id.is_empty() {
            return Err(ArtifactError::EmptyCatalog);
        }

        // BTreeMap по id даёт детерминированный порядок каталога
        let mut ordered: BTreeMap<ToolId, String> = BTreeMap::new();
        for (name, id) in name_to_id {
            let id = ToolId(id);
            if let Some(first) = ordered.get(&id) {
                let (first, second) = if *first < name {
                    (first.clone(), name)
                } else {
                    (name, first.clone())
                };
                return Err(ArtifactError::DuplicateId { id, first, second });
            }
            ordered.insert(id, name);
        }

        let mut tools = Vec::with_capacity(ordered.len());
        let mut embedding_dim = None;
        for (id, name) in ordered {
            let embedding = embeddings
                .remove(&name)
                .ok_or_else(|| ArtifactError::MissingEmbedding(name.clone()))?;
            let expected = *embedding_dim.get_or_insert(embedding.len());
            if embedding.is_empty() || embedding.len() != expected {
                return Err(ArtifactError::EmbeddingDimension {
                    name,
                    expected,
                    actual: embedding.len(),
                });
            }
            tools.push(Tool { id, name, embedding });
        }

        let by_name = tools
            .iter()
            .enumerate()
            .map(|(i, tool)| (tool.name.clone(), i))
            .collect();
        let by_id = tools.iter().enumerate().map(|(i, tool)| (tool.id, i)).collect();

        Ok(Self {
            embedding_dim: embedding_dim.unwrap_or(0),
            tools,
            by_name,
            by_id,
        })
    }

    /// Загрузить каталог из `info.json` и `toolbox.json`
    pub fn load(info_path: &Path, toolbox_path: &Path) -> Result<Self, ArtifactError> {
        let info: InfoArtifact = read_json(info_path)?;
        let toolbox: HashMap<String, ToolboxEntry> = read_json(toolbox_path)?;
        debug!(
            "Loaded {} tool ids and {} toolbox entries",
            info.tool_name_to_id.len(),
            toolbox.len()
        );

        let embeddings = toolbox
            .into_iter()
            .map(|(name, entry)| (name, entry.embedding))
            .collect();
        let catalog = Self::from_parts(info.tool_name_to_id, embeddings)?;

        info!(
            tools = catalog.len(),
            embedding_dim = catalog.embedding_dim(),
            "📚 Tool catalog loaded"
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Размерность эмбеддинга инструмента
    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Ширина строки признаков узла: `[id, embedding...]`
    pub fn feature_width(&self) -> usize {
        1 + self.embedding_dim
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.by_name.get(name).map(|&i| &self.tools[i])
    }

    pub fn get_by_id(&self, id: ToolId) -> Option<&Tool> {
        self.by_id.get(&id).map(|&i| &self.tools[i])
    }

    pub fn name_of(&self, id: ToolId) -> Option<&str> {
        self.get_by_id(id).map(|tool| tool.name.as_str())
    }

    /// Все инструменты в порядке каталога
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Имена в порядке каталога
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|tool| tool.name.as_str())
    }

    /// Преобразовать имена в (id, embedding) пары
    pub fn convert_sequence<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<Vec<SequenceStep<'_>>, ArtifactError> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name)
                    .map(|tool| SequenceStep {
                        id: tool.id,
                        embedding: &tool.embedding,
                    })
                    .ok_or_else(|| ArtifactError::UnknownTool(name.to_string()))
            })
            .collect()
    }
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let raw = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|e| ArtifactError::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts() -> (HashMap<String, u32>, HashMap<String, Vec<f32>>) {
        let names = HashMap::from([
            ("rna_star".to_string(), 1),
            ("bamFilter".to_string(), 2),
            ("umi_tools_extract".to_string(), 0),
        ]);
        let embeddings = HashMap::from([
            ("rna_star".to_string(), vec![0.1, 0.2]),
            ("bamFilter".to_string(), vec![0.3, 0.4]),
            ("umi_tools_extract".to_string(), vec![0.5, 0.6]),
            ("unused".to_string(), vec![0.0, 0.0]),
        ]);
        (names, embeddings)
    }

    #[test]
    fn test_catalog_order_is_id_order() {
        let (names, embeddings) = parts();
        let catalog = ToolCatalog::from_parts(names, embeddings).unwrap();

        let ordered: Vec<&str> = catalog.names().collect();
        assert_eq!(ordered, vec!["umi_tools_extract", "rna_star", "bamFilter"]);
        assert_eq!(catalog.embedding_dim(), 2);
        assert_eq!(catalog.feature_width(), 3);
        assert_eq!(catalog.name_of(ToolId(2)), Some("bamFilter"));
        assert_eq!(catalog.get("rna_star").map(|t| t.id), Some(ToolId(1)));
    }

    #[test]
    fn test_load_orders_by_id_not_by_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let info = dir.path().join("info.json");
        let toolbox = dir.path().join("toolbox.json");
        // имена записаны не по порядку id
        std::fs::write(
            &info,
            r#"{"tool_name_to_id": {"featurecounts": 2, "bamFilter": 0, "rna_star": 1}}"#,
        )
        .unwrap();
        std::fs::write(
            &toolbox,
            r#"{"featurecounts": {"embedding": [0.1]}, "bamFilter": {"embedding": [0.2]}, "rna_star": {"embedding": [0.3]}}"#,
        )
        .unwrap();

        let catalog = ToolCatalog::load(&info, &toolbox).unwrap();

        let ordered: Vec<&str> = catalog.names().collect();
        assert_eq!(ordered, vec!["bamFilter", "rna_star", "featurecounts"]);
    }

    #[test]
    fn test_missing_embedding_is_rejected() {
        let (names, mut embeddings) = parts();
        embeddings.remove("rna_star");

        let err = ToolCatalog::from_parts(names, embeddings).unwrap_err();
        assert!(matches!(err, ArtifactError::MissingEmbedding(name) if name == "rna_star"));
    }

    #[test]
    fn test_ragged_embeddings_are_rejected() {
        let (names, mut embeddings) = parts();
        embeddings.insert("bamFilter".to_string(), vec![1.0, 2.0, 3.0]);

        let err = ToolCatalog::from_parts(names, embeddings).unwrap_err();
        assert!(matches!(err, ArtifactError::EmbeddingDimension { .. }));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let (mut names, embeddings) = parts();
        names.insert("bamFilter".to_string(), 1);

        let err = ToolCatalog::from_parts(names, embeddings).unwrap_err();
        assert!(matches!(err, ArtifactError::DuplicateId { id: ToolId(1), .. }));
    }

    #[test]
    fn test_convert_sequence() {
        let (names, embeddings) = parts();
        let catalog = ToolCatalog::from_parts(names, embeddings).unwrap();

        let steps = catalog.convert_sequence(&["rna_star", "bamFilter"]).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].id, ToolId(1));
        assert_eq!(steps[1].embedding, &[0.3, 0.4]);

        let err = catalog.convert_sequence(&["nope"]).unwrap_err();
        assert!(matches!(err, ArtifactError::UnknownTool(_)));
    }
}
