use crate::app_config::AppConfig;
use crate::prompt::ConsolePrompt;
use anyhow::{Context, Result};
use clap::Args;
use common::ConfigTrait;
use indicatif::{ProgressBar, ProgressStyle};
use recommender::config::LoaderConfig;
use recommender::scorer::{GraphScorer, ScorerLoader};
use recommender::{RecommendationService, ScorerError};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Args)]
pub struct RecommendCommand {
    /// Инструменты последовательности в порядке выполнения
    #[arg(value_name = "TOOL")]
    tools: Vec<String>,

    /// Прочитать последовательность из файла (имена через пробел или по строкам)
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Не спрашивать: неизвестный инструмент даёт пустой результат
    #[arg(long)]
    non_interactive: bool,

    /// Сколько инструментов рекомендовать
    #[arg(short = 'k', long = "top", value_name = "N")]
    top: Option<usize>,

    /// Сколько кандидатов показывать при уточнении
    #[arg(long, value_name = "N")]
    candidates: Option<usize>,

    /// Вывести результат как JSON массив
    #[arg(long)]
    json: bool,
}

impl RecommendCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let tokens = self.tokens()?;

        let mut settings = config.settings();
        if let Some(k) = self.top {
            settings.tools_to_recommend = k;
        }
        if let Some(n) = self.candidates {
            settings.validator.candidates_to_show = n;
        }
        if self.non_interactive {
            settings.validator.match_interactively = false;
        }
        settings.validate()?;

        let tools = if tokens.is_empty() {
            info!("No sequence provided");
            Vec::new()
        } else {
            let service = RecommendationService::open(config.artifacts(), config.base_config(), settings)
                .context("Failed to open recommender artifacts")?;
            let mut prompt = ConsolePrompt::stdin();
            let loader = SpinnerLoader(default_loader());
            service
                .recommend(&tokens, &mut prompt, &loader)
                .context("Recommendation failed")?
                .tools
        };

        print_tools(&tools, self.json)
    }

    fn tokens(&self) -> Result<Vec<String>> {
        let mut tokens = self.tools.clone();
        if let Some(path) = &self.file {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read sequence file {}", path.display()))?;
            tokens.extend(raw.split_whitespace().map(str::to_string));
        }
        Ok(tokens)
    }
}

fn print_tools(tools: &[String], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(tools)?);
    } else {
        for tool in tools {
            println!("{}", tool);
        }
    }
    Ok(())
}

#[cfg(feature = "onnx")]
fn default_loader() -> recommender::OnnxScorerLoader {
    recommender::OnnxScorerLoader
}

#[cfg(not(feature = "onnx"))]
fn default_loader() -> recommender::UnsupportedScorerLoader {
    recommender::UnsupportedScorerLoader
}

/// Показывает спиннер в stderr, пока грузится модель
struct SpinnerLoader<L>(L);

impl<L: ScorerLoader> ScorerLoader for SpinnerLoader<L> {
    fn load(&self, config: &LoaderConfig) -> Result<Box<dyn GraphScorer>, ScorerError> {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(format!("Loading model {}", config.model_file().display()));
        spinner.enable_steady_tick(Duration::from_millis(80));

        let result = self.0.load(config);
        spinner.finish_and_clear();
        result
    }
}
