//! Train a small classifier end to end and reload the saved model

use std::fs;
use std::path::Path;

use tempfile::tempdir;

use disaster_response::artifact::{load_model, FORMAT_VERSION};
use disaster_response::config::AppConfig;
use disaster_response::db::{Database, LabelLayout};
use disaster_response::evaluation::evaluate_model;
use disaster_response::model::{build_model, MaxFeatures, ParameterGrid};
use disaster_response::nlp::LinguisticResources;
use disaster_response::service::{run_etl, run_training};

const TEMPLATES: [(&str, &str); 4] = [
    ("We need water urgently", "water-1;food-0"),
    ("Families need food supplies", "water-0;food-1"),
    ("No water and no food here", "water-1;food-1"),
    ("The storm damaged our roof", "water-0;food-0"),
];

fn small_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.training.seed = Some(7);
    config.training.cv_folds = 2;
    config.training.n_trees = 15;
    config.training.max_vocabulary = None;
    config.grid = ParameterGrid {
        max_features: vec![MaxFeatures::All],
        min_samples_leaf: vec![1],
        min_samples_split: vec![2, 4],
    };
    config
}

fn write_inputs(dir: &Path, rows: usize) -> (std::path::PathBuf, std::path::PathBuf) {
    let mut messages = String::from("id,message,original,genre\n");
    let mut categories = String::from("id,categories\n");
    for id in 0..rows {
        let (text, labels) = TEMPLATES[id % TEMPLATES.len()];
        messages.push_str(&format!("{id},{text},,direct\n"));
        categories.push_str(&format!("{id},{labels}\n"));
    }

    let messages_path = dir.join("messages.csv");
    let categories_path = dir.join("categories.csv");
    fs::write(&messages_path, messages).expect("Failed to write messages");
    fs::write(&categories_path, categories).expect("Failed to write categories");
    (messages_path, categories_path)
}

#[test]
fn test_train_evaluate_and_save() {
    let dir = tempdir().expect("Failed to create temp directory");
    let (messages, categories) = write_inputs(dir.path(), 40);
    let database = dir.path().join("DisasterResponse.db");
    let model_path = dir.path().join("classifier.bin");
    let config = small_config();

    run_etl(&config, &messages, &categories, &database, &mut Vec::new()).expect("ETL run failed");

    let mut out = Vec::new();
    let summary = run_training(&config, &database, &model_path, &mut out).expect("Training run failed");
    assert_eq!(summary.train_rows, 32);
    assert_eq!(summary.test_rows, 8);
    assert_eq!(summary.reports.len(), 2);
    assert_eq!(summary.reports[0].label, "water");
    assert_eq!(summary.reports[1].label, "food");

    let printed = String::from_utf8(out).expect("Output is not UTF-8");
    assert!(printed.contains("Training model..."));
    assert!(printed.contains("water :"));
    assert!(printed.contains("Trained model saved!"));

    let artifact = load_model(&model_path).expect("Failed to load model");
    assert_eq!(artifact.format_version, FORMAT_VERSION);
    assert_eq!(artifact.search.label_names(), ["water", "food"]);
    assert_eq!(artifact.search.cv_results.len(), 2);

    let predictions = artifact
        .search
        .predict(&["please send water".to_string(), "we have no food".to_string()])
        .expect("Prediction failed");
    assert_eq!(predictions[0][0], 1);
    assert_eq!(predictions[1][1], 1);
}

#[test]
fn test_seeded_training_is_reproducible() {
    let dir = tempdir().expect("Failed to create temp directory");
    let (messages, categories) = write_inputs(dir.path(), 24);
    let database = dir.path().join("data.db");
    let config = small_config();
    run_etl(&config, &messages, &categories, &database, &mut Vec::new()).expect("ETL run failed");

    let first = run_training(&config, &database, &dir.path().join("a.bin"), &mut Vec::new())
        .expect("First training run failed");
    let second = run_training(&config, &database, &dir.path().join("b.bin"), &mut Vec::new())
        .expect("Second training run failed");
    assert_eq!(first.best_params, second.best_params);
    assert_eq!(first.reports, second.reports);
}

#[test]
fn test_evaluate_rejects_mismatched_labels() {
    let dir = tempdir().expect("Failed to create temp directory");
    let (messages, categories) = write_inputs(dir.path(), 20);
    let database = dir.path().join("data.db");
    let config = small_config();
    run_etl(&config, &messages, &categories, &database, &mut Vec::new()).expect("ETL run failed");

    let dataset = Database::open(&database)
        .expect("Failed to open database")
        .load_dataset("data", LabelLayout::Manifest)
        .expect("Failed to load dataset");
    let fitted = build_model(&config.training, &config.grid)
        .fit(&dataset, LinguisticResources::shared().expect("Failed to build resources"))
        .expect("Fit failed");

    let mut narrowed = dataset.clone();
    narrowed.category_names.truncate(1);
    assert!(evaluate_model(&fitted, &narrowed).is_err());
}
