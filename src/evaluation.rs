//! Train/test partitioning and per-label classification reports.

use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::model::FittedSearch;
use crate::models::Dataset;

/// Shuffle row indices and split off `ceil(n * test_fraction)` for testing.
///
/// A seed makes the partition reproducible; without one the shuffle is
/// entropy-seeded. Returns `(train, test)`.
#[must_use]
pub fn train_test_split(n: usize, test_fraction: f64, seed: Option<u64>) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    indices.shuffle(&mut rng);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n_test = ((n as f64) * test_fraction).ceil() as usize;
    let n_test = n_test.min(n);
    let train = indices.split_off(n_test);
    (train, indices)
}

/// Precision, recall, F1, and support for one class value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Share of predictions of this value that were correct
    pub precision: f64,
    /// Share of true rows of this value that were found
    pub recall: f64,
    /// Harmonic mean of precision and recall
    pub f1: f64,
    /// True rows carrying this value
    pub support: usize,
}

/// Classification report for one label column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelReport {
    /// Label column name
    pub label: String,
    /// Per class value, ascending
    pub classes: Vec<(u32, ClassMetrics)>,
    /// Share of rows predicted correctly
    pub accuracy: f64,
    /// Unweighted mean over classes
    pub macro_avg: ClassMetrics,
    /// Mean over classes weighted by support
    pub weighted_avg: ClassMetrics,
}

impl LabelReport {
    /// Build a report from true and predicted values of one label
    #[must_use]
    pub fn from_predictions(label: &str, truth: &[u32], predicted: &[u32]) -> Self {
        let mut values: Vec<u32> = truth.iter().chain(predicted).copied().collect();
        values.sort_unstable();
        values.dedup();

        let classes: Vec<(u32, ClassMetrics)> = values
            .iter()
            .map(|&value| (value, class_metrics(value, truth, predicted)))
            .collect();

        let total = truth.len();
        let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
        let accuracy = ratio(correct as f64, total as f64);

        let n_classes = classes.len() as f64;
        let macro_avg = ClassMetrics {
            precision: ratio(classes.iter().map(|(_, m)| m.precision).sum(), n_classes),
            recall: ratio(classes.iter().map(|(_, m)| m.recall).sum(), n_classes),
            f1: ratio(classes.iter().map(|(_, m)| m.f1).sum(), n_classes),
            support: total,
        };
        let weighted = |pick: fn(&ClassMetrics) -> f64| {
            ratio(
                classes.iter().map(|(_, m)| pick(m) * m.support as f64).sum(),
                total as f64,
            )
        };
        let weighted_avg = ClassMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
            support: total,
        };

        Self {
            label: label.to_string(),
            classes,
            accuracy,
            macro_avg,
            weighted_avg,
        }
    }
}

impl fmt::Display for LabelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.macro_avg.support;
        writeln!(f, "{:>14} {:>10} {:>10} {:>10} {:>10}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for (value, m) in &self.classes {
            writeln!(
                f,
                "{value:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:>14} {:>10} {:>10} {:>10.2} {:>10}", "accuracy", "", "", self.accuracy, total)?;
        for (name, m) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{name:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                m.precision, m.recall, m.f1, m.support
            )?;
        }
        Ok(())
    }
}

/// Score the fitted search on held-out data, one report per label
pub fn evaluate_model(model: &FittedSearch, test: &Dataset) -> Result<Vec<LabelReport>> {
    if model.label_names().len() != test.category_names.len() {
        return Err(PipelineError::LabelCountMismatch {
            expected: model.label_names().len(),
            found: test.category_names.len(),
        });
    }

    let predicted = model.predict(&test.messages)?;
    let reports = test
        .category_names
        .iter()
        .enumerate()
        .map(|(label, name)| {
            let truth = test.label_column(label);
            let guesses: Vec<u32> = predicted.iter().map(|row| row[label]).collect();
            let report = LabelReport::from_predictions(name, &truth, &guesses);
            debug!(label = %name, accuracy = report.accuracy, f1 = report.weighted_avg.f1, "Evaluated label");
            report
        })
        .collect();
    Ok(reports)
}

fn class_metrics(value: u32, truth: &[u32], predicted: &[u32]) -> ClassMetrics {
    let pairs = || truth.iter().zip(predicted);
    let true_positive = pairs().filter(|(t, p)| **t == value && **p == value).count() as f64;
    let predicted_positive = predicted.iter().filter(|&&p| p == value).count() as f64;
    let support = truth.iter().filter(|&&t| t == value).count();

    let precision = ratio(true_positive, predicted_positive);
    let recall = ratio(true_positive, support as f64);
    let f1 = ratio(2.0 * precision * recall, precision + recall);
    ClassMetrics {
        precision,
        recall,
        f1,
        support,
    }
}

// Zero denominators score 0.0
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes() {
        let (train, test) = train_test_split(10, 0.2, Some(1));
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);

        let (train, test) = train_test_split(11, 0.2, Some(1));
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 8);
    }

    #[test]
    fn test_split_is_seeded_partition() {
        let first = train_test_split(50, 0.2, Some(42));
        let second = train_test_split(50, 0.2, Some(42));
        assert_eq!(first, second);

        let mut all: Vec<usize> = first.0.iter().chain(&first.1).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_report_metrics() {
        let truth = [1, 1, 0, 0, 1];
        let predicted = [1, 0, 0, 1, 1];
        let report = LabelReport::from_predictions("related", &truth, &predicted);

        let (value, ones) = report.classes[1];
        assert_eq!(value, 1);
        assert!((ones.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((ones.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(ones.support, 3);
        assert!((report.accuracy - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_report_zero_division() {
        let report = LabelReport::from_predictions("offer", &[0, 0, 1], &[0, 0, 0]);
        let (_, ones) = report.classes[1];
        assert_eq!(ones.precision, 0.0);
        assert_eq!(ones.f1, 0.0);
    }

    #[test]
    fn test_report_display() {
        let report = LabelReport::from_predictions("request", &[0, 1], &[0, 1]);
        let text = report.to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("1.00"));
    }
}
