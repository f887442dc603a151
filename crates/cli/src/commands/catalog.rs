use super::load_catalog;
use crate::app_config::AppConfig;
use anyhow::Result;
use clap::Args;
use console::style;

#[derive(Debug, Args)]
pub struct CatalogCommand {
    /// Только инструменты, содержащие подстроку (без учёта регистра)
    #[arg(short, long, value_name = "SUBSTR")]
    filter: Option<String>,
}

impl CatalogCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let catalog = load_catalog(config)?;
        let needle = self.filter.as_deref().map(str::to_lowercase);

        let mut shown = 0;
        for tool in catalog.tools() {
            if let Some(needle) = &needle {
                if !tool.name.to_lowercase().contains(needle) {
                    continue;
                }
            }
            println!("{}\t{}", tool.id, tool.name);
            shown += 1;
        }

        eprintln!(
            "{}",
            style(format!(
                "{} of {} tools, embedding dimension {}",
                shown,
                catalog.len(),
                catalog.embedding_dim()
            ))
            .for_stderr()
            .dim()
        );
        Ok(())
    }
}
