//! Model building and hyperparameter search.
//!
//! [`GridSearch`] is the unfit search configuration returned by
//! [`build_model`]. Fitting consumes it and yields a [`FittedSearch`], which
//! holds the refit best pipeline and can score raw message text.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::{debug, info};

use crate::config::TrainingConfig;
use crate::error::{PipelineError, Result};
use crate::metrics::MetricsCollector;
use crate::models::Dataset;
use crate::nlp::{LinguisticResources, Tokenizer};
use crate::vectorizer::{tokenize_all, FittedVectorizer, TfidfVectorizer};

/// Random forest for a single label
pub type LabelClassifier = RandomForestClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

/// Number of features each tree split considers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// Square root of the feature count (the classifier default)
    Auto,
    /// Square root of the feature count
    Sqrt,
    /// Base-2 logarithm of the feature count
    Log2,
    /// Every feature
    All,
}

impl MaxFeatures {
    /// Features per split for a feature space of `n_features`
    #[must_use]
    pub fn resolve(self, n_features: usize) -> usize {
        let n = n_features.max(1) as f64;
        let m = match self {
            Self::Auto | Self::Sqrt => n.sqrt().floor(),
            Self::Log2 => n.log2().floor(),
            Self::All => n,
        };
        // Truncation is intended: m is a small positive count
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let m = m as usize;
        m.clamp(1, n_features.max(1))
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Sqrt => "sqrt",
            Self::Log2 => "log2",
            Self::All => "all",
        };
        f.write_str(name)
    }
}

/// One point of the hyperparameter grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Feature sampling strategy
    pub max_features: MaxFeatures,
    /// Minimum samples in a leaf
    pub min_samples_leaf: usize,
    /// Minimum samples to split a node
    pub min_samples_split: usize,
}

impl fmt::Display for ForestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max_features={}, min_samples_leaf={}, min_samples_split={}",
            self.max_features, self.min_samples_leaf, self.min_samples_split
        )
    }
}

/// Values searched for each forest hyperparameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterGrid {
    /// Feature sampling strategies
    pub max_features: Vec<MaxFeatures>,
    /// Minimum leaf sizes
    pub min_samples_leaf: Vec<usize>,
    /// Minimum split sizes
    pub min_samples_split: Vec<usize>,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        Self {
            max_features: vec![MaxFeatures::Auto, MaxFeatures::Sqrt],
            min_samples_leaf: vec![2, 4, 6],
            min_samples_split: vec![3, 6, 15],
        }
    }
}

impl ParameterGrid {
    /// Every combination, max_features varying slowest
    #[must_use]
    pub fn candidates(&self) -> Vec<ForestParams> {
        let mut candidates = Vec::new();
        for &max_features in &self.max_features {
            for &min_samples_leaf in &self.min_samples_leaf {
                for &min_samples_split in &self.min_samples_split {
                    candidates.push(ForestParams {
                        max_features,
                        min_samples_leaf,
                        min_samples_split,
                    });
                }
            }
        }
        candidates
    }
}

/// Mean cross-validated score of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    /// Candidate hyperparameters
    pub params: ForestParams,
    /// Mean subset accuracy over folds
    pub mean_score: f64,
    /// Per-fold subset accuracy
    pub fold_scores: Vec<f64>,
}

/// Unfit vectorize → reweight → per-label forest pipeline wrapped in a grid search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSearch {
    /// Vectorizer settings
    pub vectorizer: TfidfVectorizer,
    /// Searched hyperparameters
    pub grid: ParameterGrid,
    /// Cross-validation folds
    pub cv_folds: usize,
    /// Trees per forest
    pub n_trees: u16,
    /// Forest seed; entropy-seeded when absent
    pub seed: Option<u64>,
}

/// Compose the pipeline and search from configuration. No I/O.
#[must_use]
pub fn build_model(training: &TrainingConfig, grid: &ParameterGrid) -> GridSearch {
    GridSearch {
        vectorizer: TfidfVectorizer::new(training.max_vocabulary),
        grid: grid.clone(),
        cv_folds: training.cv_folds,
        n_trees: training.n_trees,
        seed: training.seed,
    }
}

impl GridSearch {
    /// Evaluate every candidate by K-fold cross-validation, then refit the
    /// best one on all of `train`.
    pub fn fit(self, train: &Dataset, resources: &LinguisticResources) -> Result<FittedSearch> {
        let candidates = self.grid.candidates();
        if candidates.is_empty() {
            return Err(PipelineError::InvalidConfig("parameter grid is empty".to_string()));
        }
        if self.cv_folds < 2 || self.cv_folds > train.len() {
            return Err(PipelineError::InvalidConfig(format!(
                "cv_folds must be between 2 and the number of training rows ({}), got {}",
                train.len(),
                self.cv_folds
            )));
        }

        let tokenizer = Tokenizer::new(resources);
        let tokens = tokenize_all(&tokenizer, &train.messages);
        let folds = kfold_indices(train.len(), self.cv_folds);
        let metrics = MetricsCollector::default();
        info!(
            candidates = candidates.len(),
            folds = folds.len(),
            rows = train.len(),
            "Starting grid search"
        );

        let mut cv_results = Vec::with_capacity(candidates.len());
        for params in candidates {
            let started = Instant::now();
            let mut fold_scores = Vec::with_capacity(folds.len());
            for (fit_idx, val_idx) in &folds {
                let fit_tokens = select(&tokens, fit_idx);
                let fit_labels = select(&train.labels, fit_idx);
                let pipeline =
                    self.fit_pipeline(&params, &fit_tokens, &fit_labels, &train.category_names, true)?;

                let predicted = pipeline.predict_tokens(&select(&tokens, val_idx))?;
                fold_scores.push(subset_accuracy(&select(&train.labels, val_idx), &predicted));
            }
            let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            debug!(%params, mean_score, "Evaluated candidate");
            metrics.record_candidate(mean_score, started.elapsed());
            cv_results.push(CandidateScore {
                params,
                mean_score,
                fold_scores,
            });
        }

        // First candidate wins ties
        let best = cv_results
            .iter()
            .enumerate()
            .fold(0, |best, (i, c)| if c.mean_score > cv_results[best].mean_score { i } else { best });
        let best_params = cv_results[best].params;
        let best_score = cv_results[best].mean_score;
        info!(params = %best_params, score = best_score, "Selected best candidate");

        let pipeline = self.fit_pipeline(&best_params, &tokens, &train.labels, &train.category_names, false)?;
        Ok(FittedSearch {
            best_params,
            best_score,
            cv_results,
            pipeline,
        })
    }

    /// Fit one model per label. With `allow_constant`, a label that shows a
    /// single value gets a constant predictor; otherwise it is an error.
    fn fit_pipeline(
        &self,
        params: &ForestParams,
        tokens: &[Vec<String>],
        labels: &[Vec<u32>],
        label_names: &[String],
        allow_constant: bool,
    ) -> Result<FittedPipeline> {
        let vectorizer = self.vectorizer.fit(tokens);
        let features = vectorizer.transform(tokens);
        let forest_params = RandomForestClassifierParameters::default()
            .with_n_trees(self.n_trees)
            .with_m(params.max_features.resolve(vectorizer.n_features()))
            .with_min_samples_leaf(params.min_samples_leaf)
            .with_min_samples_split(params.min_samples_split)
            .with_seed(self.seed.unwrap_or_else(rand::random));

        let mut classifiers = Vec::with_capacity(label_names.len());
        for (label, name) in label_names.iter().enumerate() {
            let y: Vec<u32> = labels.iter().map(|row| row[label]).collect();
            let first = y.first().copied().unwrap_or_default();
            if y.iter().all(|&v| v == first) {
                if !allow_constant {
                    return Err(PipelineError::SingleClassLabel(name.clone()));
                }
                debug!(label = %name, value = first, "Single-valued label in fold, predicting a constant");
                classifiers.push(LabelModel::Constant(first));
                continue;
            }
            classifiers.push(LabelModel::Forest(RandomForestClassifier::fit(
                &features,
                &y,
                forest_params.clone(),
            )?));
        }

        Ok(FittedPipeline {
            vectorizer,
            classifiers,
            label_names: label_names.to_vec(),
        })
    }
}

/// Predictor for one label
#[derive(Debug, Serialize, Deserialize)]
pub enum LabelModel {
    /// Random forest over the TF-IDF features
    Forest(LabelClassifier),
    /// Value predicted for every row; only fitted inside cross-validation folds
    Constant(u32),
}

impl LabelModel {
    fn predict(&self, features: &DenseMatrix<f64>, rows: usize) -> Result<Vec<u32>> {
        match self {
            Self::Forest(forest) => Ok(forest.predict(features)?),
            Self::Constant(value) => Ok(vec![*value; rows]),
        }
    }
}

/// Fitted vectorizer plus one model per label
#[derive(Debug, Serialize, Deserialize)]
pub struct FittedPipeline {
    vectorizer: FittedVectorizer,
    classifiers: Vec<LabelModel>,
    label_names: Vec<String>,
}

impl FittedPipeline {
    /// Label names in prediction column order
    #[must_use]
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Fitted vectorizer
    #[must_use]
    pub const fn vectorizer(&self) -> &FittedVectorizer {
        &self.vectorizer
    }

    /// Predict every label for tokenized documents, `result[row][label]`
    pub fn predict_tokens(&self, tokens: &[Vec<String>]) -> Result<Vec<Vec<u32>>> {
        let mut predictions = vec![Vec::with_capacity(self.classifiers.len()); tokens.len()];
        if tokens.is_empty() {
            return Ok(predictions);
        }

        let features = self.vectorizer.transform(tokens);
        for classifier in &self.classifiers {
            let column = classifier.predict(&features, tokens.len())?;
            for (row, value) in predictions.iter_mut().zip(column) {
                row.push(value);
            }
        }
        Ok(predictions)
    }
}

/// Result of a grid search: scores for every candidate and the refit winner
#[derive(Debug, Serialize, Deserialize)]
pub struct FittedSearch {
    /// Winning hyperparameters
    pub best_params: ForestParams,
    /// Winning mean cross-validated score
    pub best_score: f64,
    /// Scores for every candidate, in grid order
    pub cv_results: Vec<CandidateScore>,
    /// Best pipeline refit on the full training partition
    pub pipeline: FittedPipeline,
}

impl FittedSearch {
    /// Label names in prediction column order
    #[must_use]
    pub fn label_names(&self) -> &[String] {
        self.pipeline.label_names()
    }

    /// Predict every label for raw message texts
    pub fn predict(&self, texts: &[String]) -> Result<Vec<Vec<u32>>> {
        let tokenizer = Tokenizer::new(LinguisticResources::shared()?);
        self.pipeline.predict_tokens(&tokenize_all(&tokenizer, texts))
    }
}

/// Unshuffled K-fold split; the first `n % k` folds get one extra row
#[must_use]
pub fn kfold_indices(n: usize, k: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = n / k + usize::from(fold < n % k);
        let validation: Vec<usize> = (start..start + size).collect();
        let training: Vec<usize> = (0..start).chain(start + size..n).collect();
        folds.push((training, validation));
        start += size;
    }
    folds
}

/// Fraction of rows whose labels are all predicted correctly
#[must_use]
pub fn subset_accuracy(truth: &[Vec<u32>], predicted: &[Vec<u32>]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let exact = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    exact as f64 / truth.len() as f64
}

fn select<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| items[i].clone()).collect()
}
