use crate::app_config::AppConfig;
use anyhow::{Context, Result};
use clap::Args;
use recommender::RecommendationService;
use serde_json::json;

#[derive(Debug, Args)]
pub struct ConfigCommand {
    /// Только конфигурация приложения, без артефактов
    #[arg(long)]
    app_only: bool,
}

impl ConfigCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        if self.app_only {
            println!("{}", serde_json::to_string_pretty(config)?);
            return Ok(());
        }

        let service = RecommendationService::open(config.artifacts(), config.base_config(), config.settings())
            .context("Failed to open recommender artifacts")?;
        let scorer = service
            .resolve_config()
            .context("Failed to resolve scorer configuration")?;

        let report = json!({
            "app": config,
            "scorer": scorer,
            "model_file": scorer.model_file(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}
