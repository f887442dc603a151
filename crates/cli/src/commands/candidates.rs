use super::load_catalog;
use crate::app_config::AppConfig;
use anyhow::Result;
use clap::Args;
use console::style;
use recommender::rank_candidates;

#[derive(Debug, Args)]
pub struct CandidatesCommand {
    /// Имя (возможно с опечаткой)
    token: String,

    /// Сколько кандидатов показать
    #[arg(long, value_name = "N")]
    candidates: Option<usize>,

    #[arg(long)]
    json: bool,
}

impl CandidatesCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let catalog = load_catalog(config)?;
        let limit = self.candidates.unwrap_or(config.candidates_to_show);

        let ranked: Vec<_> = rank_candidates(self.token.trim(), &catalog)
            .into_iter()
            .take(limit)
            .collect();

        if self.json {
            println!("{}", serde_json::to_string(&ranked)?);
            return Ok(());
        }

        for (i, candidate) in ranked.iter().enumerate() {
            println!(
                "{}. {} {}",
                i + 1,
                candidate.name,
                style(format!("({})", candidate.score)).dim()
            );
        }
        Ok(())
    }
}
