use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::cleaner::TwoValuePolicy;
use crate::db::LabelLayout;
use crate::error::{PipelineError, Result};
use crate::model::ParameterGrid;

/// Prefix for environment overrides, e.g. `DISASTER_PIPELINE__TRAINING__SEED=42`
pub const ENV_PREFIX: &str = "DISASTER_PIPELINE";

/// Application configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub etl: EtlConfig,
    pub training: TrainingConfig,
    pub grid: ParameterGrid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub table_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtlConfig {
    pub two_value_policy: TwoValuePolicy,
}

/// Where the training side looks for label columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    /// Label names from the manifest written by the ETL step
    #[default]
    Manifest,
    /// Fixed column range `[label_range_start, label_range_end)`
    Positional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub test_fraction: f64,
    pub seed: Option<u64>,
    pub cv_folds: usize,
    pub n_trees: u16,
    pub max_vocabulary: Option<usize>,
    pub label_source: LabelSource,
    pub label_range_start: usize,
    pub label_range_end: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: None,
            cv_folds: 5,
            n_trees: 100,
            max_vocabulary: Some(2000),
            label_source: LabelSource::Manifest,
            label_range_start: 4,
            label_range_end: 40,
        }
    }
}

impl TrainingConfig {
    /// Label layout the dataset loader should use
    #[must_use]
    pub const fn label_layout(&self) -> LabelLayout {
        match self.label_source {
            LabelSource::Manifest => LabelLayout::Manifest,
            LabelSource::Positional => LabelLayout::Positional {
                start: self.label_range_start,
                end: self.label_range_end,
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                table_name: "data".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            etl: EtlConfig {
                two_value_policy: TwoValuePolicy::DropRow,
            },
            training: TrainingConfig::default(),
            grid: ParameterGrid::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// defaults, `config/default`, `config/local`, `explicit`, environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            // Start with default values
            .add_source(Config::try_from(&Self::default())?)
            // Add config files if they exist
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));
        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }
        let config = builder
            // Add environment variables with prefix
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: Self = config.try_deserialize()?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PipelineError::InvalidConfig(msg));

        if self.database.table_name.trim().is_empty() {
            return invalid("table_name cannot be empty".to_string());
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return invalid(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                self.logging.level
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return invalid(format!(
                "Invalid log format: {}. Must be one of: {valid_formats:?}",
                self.logging.format
            ));
        }

        // Validate training config
        let training = &self.training;
        if !(training.test_fraction > 0.0 && training.test_fraction < 1.0) {
            return invalid(format!(
                "test_fraction must be between 0 and 1, got {}",
                training.test_fraction
            ));
        }
        if training.cv_folds < 2 {
            return invalid("cv_folds must be at least 2".to_string());
        }
        if training.n_trees == 0 {
            return invalid("n_trees must be greater than 0".to_string());
        }
        if training.max_vocabulary == Some(0) {
            return invalid("max_vocabulary must be greater than 0".to_string());
        }
        if training.label_range_start >= training.label_range_end {
            return invalid("label_range_start must be less than label_range_end".to_string());
        }

        // Validate grid
        if self.grid.max_features.is_empty()
            || self.grid.min_samples_leaf.is_empty()
            || self.grid.min_samples_split.is_empty()
        {
            return invalid("every grid dimension needs at least one value".to_string());
        }
        if self.grid.min_samples_leaf.contains(&0) {
            return invalid("min_samples_leaf values must be greater than 0".to_string());
        }
        if self.grid.min_samples_split.iter().any(|&v| v < 2) {
            return invalid("min_samples_split values must be at least 2".to_string());
        }

        Ok(())
    }

    /// Get log level from environment or config
    #[must_use]
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.table_name, "data");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.training.cv_folds, 5);
        assert_eq!(config.etl.two_value_policy, TwoValuePolicy::DropRow);
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = AppConfig::default();
        config.training.cv_folds = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_label_layout() {
        let mut training = TrainingConfig::default();
        assert_eq!(training.label_layout(), LabelLayout::Manifest);
        training.label_source = LabelSource::Positional;
        assert_eq!(training.label_layout(), LabelLayout::Positional { start: 4, end: 40 });
    }
}
