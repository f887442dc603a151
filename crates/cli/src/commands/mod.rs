pub mod candidates;
pub mod catalog;
pub mod config;
pub mod recommend;

pub use candidates::CandidatesCommand;
pub use catalog::CatalogCommand;
pub use config::ConfigCommand;
pub use recommend::RecommendCommand;

use anyhow::{Context, Result};
use recommender::ToolCatalog;
use crate::app_config::AppConfig;

/// Загрузить только каталог (без модели и гиперпараметров)
pub(crate) fn load_catalog(config: &AppConfig) -> Result<ToolCatalog> {
    let artifacts = config.artifacts();
    artifacts
        .load_catalog()
        .with_context(|| format!("Failed to load tool catalog from {}", artifacts.out_dir().display()))
}
