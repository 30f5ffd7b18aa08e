use std::fs;
use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::models::{CleanedTable, Dataset};
use crate::schema::{self, data, label_manifest, quote_ident};

/// How the training side finds the label block in the persisted relation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelLayout {
    /// Label columns listed by name in the manifest table
    #[default]
    Manifest,
    /// Columns `[start, end)` by position, message text at position 1
    Positional {
        /// First label column
        start: usize,
        /// One past the last label column
        end: usize,
    },
}

/// SQLite store holding the cleaned dataset
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database file
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Opened database");
        Ok(Self { conn })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Write the cleaned table as `table_name`, replacing any previous contents.
    ///
    /// The label manifest is replaced in the same transaction. Returns the
    /// number of rows written.
    pub fn save_table(&mut self, table: &CleanedTable, table_name: &str) -> Result<usize> {
        let manifest = schema::manifest_table(table_name);
        let tx = self.conn.transaction()?;

        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {}; DROP TABLE IF EXISTS {};",
            quote_ident(table_name),
            quote_ident(&manifest)
        ))?;

        let mut columns = vec![
            format!("{} INTEGER", quote_ident(data::ID)),
            format!("{} TEXT", quote_ident(data::MESSAGE)),
            format!("{} TEXT", quote_ident(data::ORIGINAL)),
            format!("{} TEXT", quote_ident(data::GENRE)),
        ];
        columns.extend(
            table
                .category_names
                .iter()
                .map(|name| format!("{} INTEGER", quote_ident(name))),
        );
        tx.execute(
            &format!("CREATE TABLE {} ({})", quote_ident(table_name), columns.join(", ")),
            [],
        )?;
        tx.execute(
            &format!(
                "CREATE TABLE {} ({} INTEGER PRIMARY KEY, {} TEXT NOT NULL)",
                quote_ident(&manifest),
                label_manifest::POSITION,
                label_manifest::NAME
            ),
            [],
        )?;

        {
            let placeholders = vec!["?"; data::FIXED_COLUMNS.len() + table.category_names.len()].join(", ");
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {} VALUES ({placeholders})",
                quote_ident(table_name)
            ))?;
            for row in &table.rows {
                let mut values = vec![
                    Value::Integer(row.id),
                    Value::Text(row.message.clone()),
                    row.original.clone().map_or(Value::Null, Value::Text),
                    Value::Text(row.genre.clone()),
                ];
                values.extend(row.labels.iter().map(|&v| Value::Integer(v)));
                insert.execute(params_from_iter(values.iter()))?;
            }

            let mut insert_label = tx.prepare(&format!(
                "INSERT INTO {} ({}, {}) VALUES (?, ?)",
                quote_ident(&manifest),
                label_manifest::POSITION,
                label_manifest::NAME
            ))?;
            for (position, name) in table.category_names.iter().enumerate() {
                insert_label.execute(params![position as i64, name])?;
            }
        }

        tx.commit()?;
        info!(table = table_name, rows = table.len(), "Saved cleaned table");
        Ok(table.len())
    }

    /// Column names of a table, in declaration order
    pub fn table_columns(&self, table_name: &str) -> Result<Vec<String>> {
        let stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {} LIMIT 0", quote_ident(table_name)))?;
        Ok(stmt.column_names().into_iter().map(ToString::to_string).collect())
    }

    /// Number of rows in a table
    pub fn row_count(&self, table_name: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table_name)),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Label names recorded for a data table, if a manifest exists
    pub fn label_manifest(&self, table_name: &str) -> Result<Option<Vec<String>>> {
        let manifest = schema::manifest_table(table_name);
        let exists: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
                params![manifest],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY {}",
            label_manifest::NAME,
            quote_ident(&manifest),
            label_manifest::POSITION
        ))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(names))
    }

    /// Read the whole relation back and split it into messages and labels
    pub fn load_dataset(&self, table_name: &str, layout: LabelLayout) -> Result<Dataset> {
        let columns = self.table_columns(table_name)?;
        let (message_index, label_indices) = self.resolve_layout(table_name, &columns, layout)?;
        if label_indices.is_empty() {
            return Err(PipelineError::EmptyLabelBlock(table_name.to_string()));
        }
        let category_names: Vec<String> = label_indices.iter().map(|&i| columns[i].clone()).collect();

        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", quote_ident(table_name)))?;
        let mut rows = stmt.query([])?;

        let mut dataset = Dataset {
            category_names,
            ..Dataset::default()
        };
        while let Some(row) = rows.next()? {
            let message: Option<String> = row.get(message_index)?;
            let mut labels = Vec::with_capacity(label_indices.len());
            for (&index, name) in label_indices.iter().zip(&dataset.category_names) {
                let value: i64 = row.get(index)?;
                let value = u32::try_from(value).map_err(|_| PipelineError::InvalidCategoryValue {
                    row: dataset.messages.len(),
                    column: name.clone(),
                    value: value.to_string(),
                })?;
                labels.push(value);
            }
            dataset.messages.push(message.unwrap_or_default());
            dataset.labels.push(labels);
        }

        info!(
            table = table_name,
            rows = dataset.len(),
            labels = dataset.category_names.len(),
            "Loaded dataset"
        );
        Ok(dataset)
    }

    fn resolve_layout(
        &self,
        table_name: &str,
        columns: &[String],
        layout: LabelLayout,
    ) -> Result<(usize, Vec<usize>)> {
        let position_of = |name: &str| {
            columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| PipelineError::MissingColumn {
                    column: name.to_string(),
                    source_name: table_name.to_string(),
                })
        };

        match layout {
            LabelLayout::Manifest => {
                let names = self.label_manifest(table_name)?.ok_or_else(|| PipelineError::MissingColumn {
                    column: label_manifest::NAME.to_string(),
                    source_name: schema::manifest_table(table_name),
                })?;
                let message_index = position_of(data::MESSAGE)?;
                let label_indices = names
                    .iter()
                    .map(|name| position_of(name))
                    .collect::<Result<Vec<_>>>()?;
                Ok((message_index, label_indices))
            },
            LabelLayout::Positional { start, end } => {
                if columns.len() < 2 {
                    return Err(PipelineError::MissingColumn {
                        column: data::MESSAGE.to_string(),
                        source_name: table_name.to_string(),
                    });
                }
                let end = end.min(columns.len());
                if end < columns.len() {
                    warn!(
                        ignored = columns.len() - end,
                        "Positional layout ignores trailing columns"
                    );
                }
                Ok((1, (start.min(end)..end).collect()))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CleanedRecord;

    fn sample_table() -> CleanedTable {
        CleanedTable {
            category_names: vec!["related".to_string(), "request".to_string()],
            rows: vec![
                CleanedRecord {
                    id: 1,
                    message: "Help me now".to_string(),
                    original: None,
                    genre: "direct".to_string(),
                    labels: vec![1, 0],
                },
                CleanedRecord {
                    id: 2,
                    message: "Need water".to_string(),
                    original: Some("Nou bezwen dlo".to_string()),
                    genre: "social".to_string(),
                    labels: vec![1, 1],
                },
            ],
        }
    }

    #[test]
    fn test_save_and_load_by_manifest() {
        let mut db = Database::open_in_memory().unwrap();
        db.save_table(&sample_table(), "data").unwrap();

        let dataset = db.load_dataset("data", LabelLayout::Manifest).unwrap();
        assert_eq!(dataset.messages, vec!["Help me now", "Need water"]);
        assert_eq!(dataset.category_names, vec!["related", "request"]);
        assert_eq!(dataset.labels, vec![vec![1, 0], vec![1, 1]]);
    }

    #[test]
    fn test_positional_layout_clamps_range() {
        let mut db = Database::open_in_memory().unwrap();
        db.save_table(&sample_table(), "data").unwrap();

        let dataset = db
            .load_dataset("data", LabelLayout::Positional { start: 4, end: 40 })
            .unwrap();
        assert_eq!(dataset.category_names, vec!["related", "request"]);
    }

    #[test]
    fn test_save_replaces_previous_table() {
        let mut db = Database::open_in_memory().unwrap();
        db.save_table(&sample_table(), "data").unwrap();

        let mut smaller = sample_table();
        smaller.rows.truncate(1);
        smaller.category_names.truncate(1);
        smaller.rows[0].labels.truncate(1);
        db.save_table(&smaller, "data").unwrap();

        assert_eq!(db.row_count("data").unwrap(), 1);
        assert_eq!(db.table_columns("data").unwrap(), vec!["id", "message", "original", "genre", "related"]);
        assert_eq!(db.label_manifest("data").unwrap(), Some(vec!["related".to_string()]));
    }

    #[test]
    fn test_missing_manifest() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute_batch("CREATE TABLE data (id INTEGER, message TEXT, original TEXT, genre TEXT, related INTEGER)")
            .unwrap();
        assert_eq!(db.label_manifest("data").unwrap(), None);
        assert!(db.load_dataset("data", LabelLayout::Manifest).is_err());
    }
}
