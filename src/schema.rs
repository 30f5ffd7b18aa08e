//! Database schema definitions
//!
//! Constants for table and column names shared by the ETL writer and the
//! training reader.

/// Cleaned message relation
pub mod data {
    /// Default table name
    pub const TABLE: &str = "data";
    /// Message identifier column
    pub const ID: &str = "id";
    /// Message text column
    pub const MESSAGE: &str = "message";
    /// Untranslated message column
    pub const ORIGINAL: &str = "original";
    /// Genre column
    pub const GENRE: &str = "genre";
    /// Columns preceding the category block, in order
    pub const FIXED_COLUMNS: [&str; 4] = [ID, MESSAGE, ORIGINAL, GENRE];
}

/// Label manifest relation listing the category columns of `data`
pub mod label_manifest {
    /// Table name suffix, appended to the data table name
    pub const TABLE_SUFFIX: &str = "_labels";
    /// Zero-based label position
    pub const POSITION: &str = "position";
    /// Label column name
    pub const NAME: &str = "name";
}

/// Quote an identifier for use in SQL
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Name of the manifest table paired with a data table
#[must_use]
pub fn manifest_table(data_table: &str) -> String {
    format!("{data_table}{}", label_manifest::TABLE_SUFFIX)
}
