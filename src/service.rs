//! End-to-end ETL and training runs.
//!
//! Each run is a strict sequence of stages. Operator-facing progress and the
//! classification report go to `out`; diagnostics go through `tracing`.

use std::io::Write;
use std::path::Path;

use tracing::{error, info};

use crate::artifact::{save_model, ModelArtifact};
use crate::cleaner::Cleaner;
use crate::config::AppConfig;
use crate::db::Database;
use crate::error::Result;
use crate::evaluation::{evaluate_model, train_test_split, LabelReport};
use crate::loader::load_data;
use crate::logging::OperationTimer;
use crate::metrics::MetricsCollector;
use crate::model::{build_model, ForestParams};
use crate::nlp::LinguisticResources;

const SEPARATOR: &str = "--------------------------------------------------";

/// What an ETL run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtlSummary {
    /// Rows after the join
    pub rows_loaded: usize,
    /// Rows written to the database
    pub rows_saved: usize,
    /// Derived category columns
    pub category_names: Vec<String>,
}

/// What a training run produced
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    /// Rows in the training partition
    pub train_rows: usize,
    /// Rows in the held-out partition
    pub test_rows: usize,
    /// Winning hyperparameters
    pub best_params: ForestParams,
    /// Winning mean cross-validated score
    pub best_score: f64,
    /// Held-out report per label
    pub reports: Vec<LabelReport>,
}

/// Load, clean, and persist the two CSV inputs
pub fn run_etl<W: Write>(
    config: &AppConfig,
    messages_path: &Path,
    categories_path: &Path,
    database_path: &Path,
    out: &mut W,
) -> Result<EtlSummary> {
    let metrics = MetricsCollector::default();

    writeln!(
        out,
        "Loading data...\n    MESSAGES: {}\n    CATEGORIES: {}",
        messages_path.display(),
        categories_path.display()
    )?;
    let timer = OperationTimer::new("load");
    let combined = load_data(messages_path, categories_path).inspect_err(|e| {
        error!(error = %e, "Failed to load input files");
        metrics.record_error("load");
    })?;
    metrics.record_stage("load", timer.finish());
    metrics.record_rows_loaded(combined.len());

    writeln!(out, "Cleaning data...")?;
    let timer = OperationTimer::new("clean");
    let cleaner = Cleaner::new(config.etl.two_value_policy)?;
    let table = cleaner.clean(&combined).inspect_err(|e| {
        error!(error = %e, "Failed to clean data");
        metrics.record_error("clean");
    })?;
    metrics.record_stage("clean", timer.finish());
    metrics.record_cleaning(combined.len() - table.len(), table.category_names.len());

    writeln!(out, "Saving data...\n    DATABASE: {}", database_path.display())?;
    let timer = OperationTimer::new("save");
    let mut db = Database::open(database_path)?;
    let rows_saved = db.save_table(&table, &config.database.table_name)?;
    metrics.record_stage("save", timer.finish());
    metrics.record_rows_persisted(rows_saved);

    writeln!(out, "Cleaned data saved to database!")?;
    info!(rows_loaded = combined.len(), rows_saved, "ETL run complete");

    Ok(EtlSummary {
        rows_loaded: combined.len(),
        rows_saved,
        category_names: table.category_names,
    })
}

/// Load the dataset, grid-search a classifier, report on held-out rows, and
/// write the model file
pub fn run_training<W: Write>(
    config: &AppConfig,
    database_path: &Path,
    model_path: &Path,
    out: &mut W,
) -> Result<TrainingSummary> {
    let metrics = MetricsCollector::default();
    let training = &config.training;

    writeln!(out, "Loading data...\n    DATABASE: {}", database_path.display())?;
    let db = Database::open(database_path)?;
    let dataset = db.load_dataset(&config.database.table_name, training.label_layout())?;
    let (train_idx, test_idx) = train_test_split(dataset.len(), training.test_fraction, training.seed);
    let train = dataset.subset(&train_idx);
    let test = dataset.subset(&test_idx);
    info!(train = train.len(), test = test.len(), "Partitioned dataset");

    writeln!(out, "Building model...")?;
    let search = build_model(training, &config.grid);

    writeln!(out, "Training model...")?;
    let timer = OperationTimer::new("train");
    let resources = LinguisticResources::shared()?;
    let fitted = search.fit(&train, resources).inspect_err(|e| {
        error!(error = %e, "Training failed");
        metrics.record_error("train");
    })?;
    metrics.record_stage("train", timer.finish());

    writeln!(out, "Evaluating model...")?;
    let reports = evaluate_model(&fitted, &test)?;
    for report in &reports {
        writeln!(out, "{SEPARATOR}")?;
        writeln!(out, "{} :", report.label)?;
        write!(out, "{report}")?;
        writeln!(out, "{SEPARATOR}")?;
        metrics.record_label_f1(&report.label, report.weighted_avg.f1);
    }

    writeln!(out, "Saving model...\n    MODEL: {}", model_path.display())?;
    let best_params = fitted.best_params;
    let best_score = fitted.best_score;
    save_model(&ModelArtifact::new(fitted), model_path)?;
    writeln!(out, "Trained model saved!")?;

    Ok(TrainingSummary {
        train_rows: train.len(),
        test_rows: test.len(),
        best_params,
        best_score,
        reports,
    })
}
