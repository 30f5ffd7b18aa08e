use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use disaster_response::cleaner::TwoValuePolicy;
use disaster_response::config::AppConfig;
use disaster_response::logging::init_logging;
use disaster_response::service::run_etl;

const USAGE: &str = "Please provide the filepaths of the messages and categories \
datasets as the first and second argument respectively, as \
well as the filepath of the database to save the cleaned data \
to as the third argument. \n\nExample: process_data \
disaster_messages.csv disaster_categories.csv \
DisasterResponse.db";

#[derive(Parser)]
#[command(author, version, about = "Clean disaster messages into a SQLite table", long_about = None)]
struct Cli {
    /// Messages CSV (id, message, original, genre)
    messages_path: PathBuf,

    /// Categories CSV (id, categories)
    categories_path: PathBuf,

    /// SQLite database to write
    database_path: PathBuf,

    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Handling of category value 2 (drop_row, clip_to_one, keep)
    #[arg(long)]
    policy: Option<TwoValuePolicy>,
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
    if let Some(policy) = cli.policy {
        config.etl.two_value_policy = policy;
    }

    // Initialize logging
    let log_file = config.logging.file_path.as_ref().map(PathBuf::from);
    let _guard = init_logging(Some(&config.get_log_level()), log_file.as_deref(), &config.logging.format)?;
    info!(policy = %config.etl.two_value_policy, "Starting ETL run");

    let stdout = std::io::stdout();
    run_etl(
        &config,
        &cli.messages_path,
        &cli.categories_path,
        &cli.database_path,
        &mut stdout.lock(),
    )
    .context("ETL run failed")?;

    Ok(())
}
