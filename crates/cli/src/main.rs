use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use common::{ConfigTrait, ExecutionContext};
use recommender::config::Device;
use std::path::PathBuf;
use tracing::debug;

mod app_config;
mod commands;
mod prompt;

use app_config::AppConfig;
use commands::{CandidatesCommand, CatalogCommand, ConfigCommand, RecommendCommand};

#[derive(Parser)]
#[command(name = "toolrec")]
#[command(about = "Рекомендации следующего инструмента workflow по обученной GNN модели")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Каталог артефактов обучения
    #[arg(long, global = true, env = "TOOLREC_ARTIFACTS", value_name = "DIR")]
    artifacts: Option<PathBuf>,

    /// Имя модели (поддиректория артефактов)
    #[arg(long, global = true, env = "TOOLREC_MODEL", value_name = "NAME")]
    model: Option<String>,

    /// TOML файл конфигурации
    #[arg(long, global = true, env = "TOOLREC_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Устройство для инференса (cuda | cpu)
    #[arg(long, global = true)]
    device: Option<Device>,

    /// Логи в JSON (stderr)
    #[arg(long, global = true)]
    log_json: bool,

    /// -v: info, -vv: debug
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Рекомендовать следующие инструменты для последовательности
    #[command(visible_alias = "rec")]
    Recommend(RecommendCommand),
    /// Показать нечёткие совпадения для имени инструмента
    Candidates(CandidatesCommand),
    /// Список инструментов каталога
    #[command(visible_alias = "ls")]
    Catalog(CatalogCommand),
    /// Показать итоговую конфигурацию scorer'а
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli.global)?;

    common::init_structured_logging(config.logging_config(cli.global.verbose)?)
        .context("Failed to initialize logging")?;
    let context = ExecutionContext::default();
    debug!(
        version = %context.app_version,
        hostname = %context.hostname,
        artifacts = %config.artifacts_dir.display(),
        model = %config.model_name,
        "toolrec starting"
    );

    match cli.command {
        Commands::Recommend(cmd) => cmd.execute(&config),
        Commands::Candidates(cmd) => cmd.execute(&config),
        Commands::Catalog(cmd) => cmd.execute(&config),
        Commands::Config(cmd) => cmd.execute(&config),
    }
}

/// File and env first, then flags on top
fn load_config(global: &GlobalArgs) -> Result<AppConfig> {
    let mut config = AppConfig::load(global.config.as_deref())?;

    if let Some(artifacts) = &global.artifacts {
        config.artifacts_dir = artifacts.clone();
    }
    if let Some(model) = &global.model {
        config.model_name = model.clone();
    }
    if let Some(device) = global.device {
        config.device = device;
    }
    if global.log_json {
        config.logging.json = true;
    }

    config.validate()?;
    Ok(config)
}
