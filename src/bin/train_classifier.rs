use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use disaster_response::config::AppConfig;
use disaster_response::logging::init_logging;
use disaster_response::service::run_training;

const USAGE: &str = "Please provide the filepath of the disaster messages database \
as the first argument and the filepath of the model file to \
save the model to as the second argument. \n\nExample: \
train_classifier ../data/DisasterResponse.db classifier.bin";

#[derive(Parser)]
#[command(author, version, about = "Train a multi-label disaster message classifier", long_about = None)]
struct Cli {
    /// SQLite database written by process_data
    database_path: PathBuf,

    /// Output model file
    model_path: PathBuf,

    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for the train/test split and forests
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            // --help and --version
            err.print()?;
            return Ok(());
        },
        Err(_) => {
            println!("{USAGE}");
            return Ok(());
        },
    };

    // Load configuration
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.seed.is_some() {
        config.training.seed = cli.seed;
    }

    // Initialize logging
    let log_file = config.logging.file_path.as_ref().map(PathBuf::from);
    let _guard = init_logging(Some(&config.get_log_level()), log_file.as_deref(), &config.logging.format)?;
    info!(seed = ?config.training.seed, "Starting training run");

    let stdout = std::io::stdout();
    let summary = run_training(&config, &cli.database_path, &cli.model_path, &mut stdout.lock())
        .context("Training run failed")?;
    info!(
        params = %summary.best_params,
        score = summary.best_score,
        "Best parameters"
    );

    Ok(())
}
