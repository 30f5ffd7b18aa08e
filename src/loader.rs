//! Reads the two raw CSV inputs and joins them on `id`.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::models::{CategoryRecord, CombinedRecord, MessageRecord};

/// Load both CSV files and return their inner join on `id`
pub fn load_data(messages_path: &Path, categories_path: &Path) -> Result<Vec<CombinedRecord>> {
    let messages: Vec<MessageRecord> = read_csv_file(messages_path)?;
    let categories: Vec<CategoryRecord> = read_csv_file(categories_path)?;
    info!(
        messages = messages.len(),
        categories = categories.len(),
        "Read raw input files"
    );

    let combined = merge(&messages, &categories);
    info!(rows = combined.len(), "Joined messages with categories");
    Ok(combined)
}

/// Inner join on `id`.
///
/// Rows come out in message order; a message matching several category rows
/// yields one combined row per match, in category-file order.
#[must_use]
pub fn merge(messages: &[MessageRecord], categories: &[CategoryRecord]) -> Vec<CombinedRecord> {
    let mut by_id: HashMap<i64, Vec<&CategoryRecord>> = HashMap::new();
    for category in categories {
        by_id.entry(category.id).or_default().push(category);
    }

    let mut combined = Vec::with_capacity(messages.len());
    for message in messages {
        let Some(matches) = by_id.get(&message.id) else {
            debug!(id = message.id, "No categories for message");
            continue;
        };
        for category in matches {
            combined.push(CombinedRecord {
                id: message.id,
                message: message.message.clone(),
                original: message.original.clone().filter(|o| !o.is_empty()),
                genre: message.genre.clone(),
                categories: category.categories.clone(),
            });
        }
    }
    combined
}

fn read_csv_file<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)?;
    read_csv(file, &path.display().to_string())
}

/// Deserialize every record of a headered CSV stream.
///
/// `source_name` only labels the error when the `id` column is absent.
pub fn read_csv<R: Read, T: DeserializeOwned>(reader: R, source_name: &str) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new().flexible(false).from_reader(reader);

    let headers = reader.headers()?;
    if !headers.iter().any(|h| h == "id") {
        return Err(PipelineError::MissingColumn {
            column: "id".to_string(),
            source_name: source_name.to_string(),
        });
    }

    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: i64, text: &str) -> MessageRecord {
        MessageRecord {
            id,
            message: text.to_string(),
            original: None,
            genre: "direct".to_string(),
        }
    }

    fn category(id: i64, categories: &str) -> CategoryRecord {
        CategoryRecord {
            id,
            categories: categories.to_string(),
        }
    }

    #[test]
    fn test_merge_keeps_only_shared_ids() {
        let messages = vec![message(1, "a"), message(2, "b"), message(3, "c")];
        let categories = vec![category(3, "x-1"), category(1, "x-0"), category(9, "x-1")];

        let combined = merge(&messages, &categories);
        let ids: Vec<i64> = combined.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(combined[0].categories, "x-0");
    }

    #[test]
    fn test_merge_duplicate_category_ids_fan_out() {
        let messages = vec![message(7, "help")];
        let categories = vec![category(7, "x-1"), category(7, "x-1")];

        assert_eq!(merge(&messages, &categories).len(), 2);
    }

    #[test]
    fn test_read_csv_without_id_column() {
        let data = "identifier,categories\n1,related-1\n";
        let result: Result<Vec<CategoryRecord>> = read_csv(data.as_bytes(), "categories.csv");
        assert!(matches!(result, Err(PipelineError::MissingColumn { .. })));
    }

    #[test]
    fn test_read_csv_empty_original() {
        let data = "id,message,original,genre\n1,Help me now,,direct\n";
        let records: Vec<MessageRecord> = read_csv(data.as_bytes(), "messages.csv").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].original, None);
        assert_eq!(records[0].genre, "direct");
    }
}
