//! Expands the encoded `categories` column into one integer column per
//! category and removes duplicate rows.

use std::collections::HashSet;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::models::{CleanedRecord, CleanedTable, CombinedRecord};

/// What to do with a category whose value is `2`.
///
/// The real category file contains `related-2` entries; whether those mean
/// "drop the message" or "treat as positive" is a policy choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwoValuePolicy {
    /// Exclude any row carrying a `2`
    #[default]
    DropRow,
    /// Rewrite `2` to `1`
    ClipToOne,
    /// Store the `2` unchanged
    Keep,
}

impl fmt::Display for TwoValuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DropRow => "drop_row",
            Self::ClipToOne => "clip_to_one",
            Self::Keep => "keep",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for TwoValuePolicy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "drop_row" | "drop" => Ok(Self::DropRow),
            "clip_to_one" | "clip" => Ok(Self::ClipToOne),
            "keep" => Ok(Self::Keep),
            other => Err(PipelineError::InvalidConfig(format!(
                "Unknown two-value policy: {other}. Must be one of: drop_row, clip_to_one, keep"
            ))),
        }
    }
}

/// Cleans a combined table into its persisted shape
pub struct Cleaner {
    policy: TwoValuePolicy,
    name_regex: Regex,
}

impl Cleaner {
    /// Create a cleaner applying the given two-value policy
    pub fn new(policy: TwoValuePolicy) -> Result<Self> {
        let name_regex = Regex::new(r"[^A-Za-z_]+")
            .map_err(|e| PipelineError::InvalidConfig(format!("Failed to compile name regex: {e}")))?;
        Ok(Self { policy, name_regex })
    }

    /// Policy this cleaner applies
    #[must_use]
    pub const fn policy(&self) -> TwoValuePolicy {
        self.policy
    }

    /// Derive category column names from one encoded category string
    #[must_use]
    pub fn category_names(&self, encoded: &str) -> Vec<String> {
        encoded
            .split(';')
            .map(|field| self.name_regex.replace_all(field, "").into_owned())
            .collect()
    }

    /// Expand categories, apply the two-value policy, and drop duplicates
    pub fn clean(&self, combined: &[CombinedRecord]) -> Result<CleanedTable> {
        let first = combined
            .first()
            .ok_or_else(|| PipelineError::EmptyDataset("no rows to derive categories from".to_string()))?;

        let category_names = self.category_names(&first.categories);
        let mut seen_names = HashSet::new();
        for name in &category_names {
            if !seen_names.insert(name.as_str()) {
                return Err(PipelineError::DuplicateCategory(name.clone()));
            }
        }
        debug!(categories = category_names.len(), "Derived category columns from first row");

        let mut rows = Vec::with_capacity(combined.len());
        let mut dropped = 0_usize;
        for (index, record) in combined.iter().enumerate() {
            match self.expand_row(index, record, &category_names)? {
                Some(row) => rows.push(row),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(dropped, policy = %self.policy, "Dropped rows carrying category value 2");
        }

        let before = rows.len();
        let rows = drop_duplicates(rows);
        info!(
            rows = rows.len(),
            duplicates = before - rows.len(),
            "Cleaned category columns"
        );

        Ok(CleanedTable { category_names, rows })
    }

    fn expand_row(
        &self,
        index: usize,
        record: &CombinedRecord,
        names: &[String],
    ) -> Result<Option<CleanedRecord>> {
        let fields: Vec<&str> = record.categories.split(';').collect();
        if fields.len() != names.len() {
            return Err(PipelineError::FieldCountMismatch {
                row: index,
                expected: names.len(),
                found: fields.len(),
            });
        }

        let mut labels = Vec::with_capacity(fields.len());
        let mut has_two = false;
        for (field, name) in fields.iter().zip(names) {
            let value = field
                .chars()
                .last()
                .and_then(|c| c.to_digit(10))
                .ok_or_else(|| PipelineError::InvalidCategoryValue {
                    row: index,
                    column: name.clone(),
                    value: (*field).to_string(),
                })?;

            // Every field is validated before a row is dropped
            let value = match (value, self.policy) {
                (2, TwoValuePolicy::DropRow) => {
                    has_two = true;
                    2
                },
                (2, TwoValuePolicy::ClipToOne) => 1,
                (v, _) => i64::from(v),
            };
            labels.push(value);
        }
        if has_two {
            return Ok(None);
        }

        Ok(Some(CleanedRecord {
            id: record.id,
            message: record.message.clone(),
            original: record.original.clone(),
            genre: record.genre.clone(),
            labels,
        }))
    }
}

/// Remove exact duplicate rows, keeping the first occurrence
#[must_use]
pub fn drop_duplicates(rows: Vec<CleanedRecord>) -> Vec<CleanedRecord> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter().filter(|row| seen.insert(row.clone())).collect()
}
