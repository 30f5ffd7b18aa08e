//! Term-count vectorization with inverse-document-frequency reweighting.
//!
//! [`TfidfVectorizer`] is the unfit configuration; fitting it on a corpus
//! yields a [`FittedVectorizer`] that owns the vocabulary and IDF weights.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::nlp::Tokenizer;

/// Vectorizer settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// Keep only this many of the most frequent terms
    pub max_vocabulary: Option<usize>,
}

impl TfidfVectorizer {
    /// Create a vectorizer with an optional vocabulary cap
    #[must_use]
    pub const fn new(max_vocabulary: Option<usize>) -> Self {
        Self { max_vocabulary }
    }

    /// Learn vocabulary and document frequencies from tokenized documents
    #[must_use]
    pub fn fit(&self, documents: &[Vec<String>]) -> FittedVectorizer {
        let mut term_counts: HashMap<&str, usize> = HashMap::new();
        let mut document_counts: HashMap<&str, usize> = HashMap::new();
        for document in documents {
            for token in document {
                *term_counts.entry(token.as_str()).or_default() += 1;
            }
            let distinct: HashSet<&str> = document.iter().map(String::as_str).collect();
            for token in distinct {
                *document_counts.entry(token).or_default() += 1;
            }
        }

        let mut terms: Vec<&str> = term_counts.keys().copied().collect();
        if let Some(limit) = self.max_vocabulary {
            // Most frequent first, ties broken alphabetically
            terms.sort_by(|a, b| term_counts[b].cmp(&term_counts[a]).then_with(|| a.cmp(b)));
            terms.truncate(limit);
        }
        terms.sort_unstable();

        let n_documents = documents.len() as f64;
        let vocabulary: BTreeMap<String, usize> = terms
            .iter()
            .enumerate()
            .map(|(index, term)| ((*term).to_string(), index))
            .collect();
        let idf = terms
            .iter()
            .map(|term| {
                let df = document_counts[term] as f64;
                ((1.0 + n_documents) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        FittedVectorizer { vocabulary, idf }
    }
}

/// Vocabulary and IDF weights learned from a training corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedVectorizer {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl FittedVectorizer {
    /// Number of features produced per document
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    /// Index of a term in the feature space
    #[must_use]
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// L2-normalized TF-IDF weights for one tokenized document
    #[must_use]
    pub fn transform_tokens(&self, tokens: &[String]) -> Vec<f64> {
        let mut row = vec![0.0; self.n_features()];
        for token in tokens {
            if let Some(&index) = self.vocabulary.get(token) {
                row[index] += 1.0;
            }
        }
        for (value, weight) in row.iter_mut().zip(&self.idf) {
            *value *= weight;
        }

        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in &mut row {
                *value /= norm;
            }
        }
        row
    }

    /// Feature matrix for tokenized documents, one row per document
    #[must_use]
    pub fn transform(&self, documents: &[Vec<String>]) -> DenseMatrix<f64> {
        // An empty vocabulary still needs one column for the classifier
        let n_features = self.n_features().max(1);
        let mut values = Vec::with_capacity(documents.len() * n_features);
        for document in documents {
            let mut row = self.transform_tokens(document);
            row.resize(n_features, 0.0);
            values.extend(row);
        }
        DenseMatrix::new(documents.len(), n_features, values, false)
    }
}

/// Tokenize a batch of raw texts
#[must_use]
pub fn tokenize_all(tokenizer: &Tokenizer<'_>, texts: &[String]) -> Vec<Vec<String>> {
    texts.iter().map(|text| tokenizer.tokenize(text)).collect()
}
