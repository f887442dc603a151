use crate::catalog::{ToolCatalog, ToolId};
use crate::errors::ArtifactError;

/// K highest logits as `(tool id, score)`, best first.
///
/// Logit position `i` is tool id `i`. Equal scores are ordered by ascending
/// id; NaN ranks below every number. Returns `min(k, logits.len())` entries.
pub fn top_k(logits: &[f32], k: usize) -> Vec<(ToolId, f32)> {
    let mut ranked: Vec<(ToolId, f32)> = logits
        .iter()
        .enumerate()
        .map(|(i, &score)| (ToolId(i as u32), score))
        .collect();

    ranked.sort_by(|a, b| {
        let (sa, sb) = (a.1, b.1);
        match (sa.is_nan(), sb.is_nan()) {
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            _ => sb
                .partial_cmp(&sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0)),
        }
    });
    ranked.truncate(k);
    ranked
}

/// Обратное отображение id → имя
pub fn to_names(ranked: &[(ToolId, f32)], catalog: &ToolCatalog) -> Result<Vec<String>, ArtifactError> {
    ranked
        .iter()
        .map(|&(id, _)| {
            catalog
                .name_of(id)
                .map(str::to_string)
                .ok_or(ArtifactError::UnknownToolId(id))
        })
        .collect()
}
