//! Data models for the ETL and training pipelines
//!
//! Records mirror the two raw CSV inputs, the joined table the loader
//! produces, and the cleaned table the persister writes.

use serde::{Deserialize, Serialize};

/// A raw disaster message as read from the messages CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Shared identifier joining a message to its categories
    pub id: i64,
    /// Message text (English translation)
    pub message: String,
    /// Untranslated message text, often empty
    #[serde(default)]
    pub original: Option<String>,
    /// Source genre (direct, news, social, ...)
    pub genre: String,
}

/// A raw category assignment as read from the categories CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    /// Shared identifier joining categories to a message
    pub id: i64,
    /// Encoded label string, e.g. `related-1;request-0;offer-0`
    pub categories: String,
}

/// One row of the inner join of messages and categories on `id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedRecord {
    /// Identifier present in both inputs
    pub id: i64,
    /// Message text
    pub message: String,
    /// Untranslated message text
    pub original: Option<String>,
    /// Source genre
    pub genre: String,
    /// Still-encoded category string
    pub categories: String,
}

/// A message row with its categories expanded into integer columns
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CleanedRecord {
    /// Message identifier
    pub id: i64,
    /// Message text
    pub message: String,
    /// Untranslated message text
    pub original: Option<String>,
    /// Source genre
    pub genre: String,
    /// One value per category column, in [`CleanedTable::category_names`] order
    pub labels: Vec<i64>,
}

/// Output of the cleaner: shared column layout plus rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanedTable {
    /// Category column names, derived once from the first combined row
    pub category_names: Vec<String>,
    /// Deduplicated rows
    pub rows: Vec<CleanedRecord>,
}

impl CleanedTable {
    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Features and labels read back from the persisted relation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    /// Message text, one entry per row
    pub messages: Vec<String>,
    /// Label matrix, `labels[row][label]`
    pub labels: Vec<Vec<u32>>,
    /// Label column names in matrix column order
    pub category_names: Vec<String>,
}

impl Dataset {
    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the dataset holds no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Select a subset of rows by index, keeping the label layout
    #[must_use]
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            messages: indices.iter().map(|&i| self.messages[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i].clone()).collect(),
            category_names: self.category_names.clone(),
        }
    }

    /// Values of a single label column
    #[must_use]
    pub fn label_column(&self, label: usize) -> Vec<u32> {
        self.labels.iter().map(|row| row[label]).collect()
    }
}
