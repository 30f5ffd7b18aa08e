//! Error types for the disaster-response pipeline.
//!
//! Library code returns [`PipelineError`]; the binaries wrap it in `anyhow`
//! at the process boundary. Nothing here is retried: every variant is fatal.

use thiserror::Error;

/// Errors that can occur in either the ETL or the training pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// CSV reading or deserialization errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary serialization errors
    #[error("Binary serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Errors raised by the classifier while fitting or predicting
    #[error("Classifier error: {0}")]
    Classifier(#[from] smartcore::error::Failed),

    /// Configuration source or deserialization errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A required column is absent from an input table
    #[error("Missing column '{column}' in {source_name}")]
    MissingColumn {
        /// Column that was expected
        column: String,
        /// Input the column was expected in
        source_name: String,
    },

    /// There are no rows to derive the category layout from
    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    /// A row's category list does not match the layout of the first row
    #[error("Row {row} has {found} category fields, expected {expected}")]
    FieldCountMismatch {
        /// Zero-based row index in the combined table
        row: usize,
        /// Field count of the first row
        expected: usize,
        /// Field count of this row
        found: usize,
    },

    /// A category value whose final character is not a digit
    #[error("Row {row}, category '{column}': cannot convert '{value}' to an integer")]
    InvalidCategoryValue {
        /// Zero-based row index in the combined table
        row: usize,
        /// Derived category name
        column: String,
        /// Raw `name-value` field
        value: String,
    },

    /// Two fields of the first row reduce to the same category name
    #[error("Duplicate category name '{0}' in first row")]
    DuplicateCategory(String),

    /// The training relation has no label columns
    #[error("No label columns found in relation '{0}'")]
    EmptyLabelBlock(String),

    /// A label column holds a single class in the data a forest is fit on
    #[error("Label '{0}' has a single class in the training data")]
    SingleClassLabel(String),

    /// A model was asked to score against a different label layout
    #[error("Label count mismatch: model has {expected}, data has {found}")]
    LabelCountMismatch {
        /// Labels known to the model
        expected: usize,
        /// Labels in the supplied data
        found: usize,
    },
}

/// Convenience type alias for Result with PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;
