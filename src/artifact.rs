//! Serialized trained-model files.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::model::FittedSearch;

/// Bumped whenever the serialized layout changes
pub const FORMAT_VERSION: u32 = 1;

/// Everything written to the model file
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Layout version of this file
    pub format_version: u32,
    /// When training finished
    pub trained_at: DateTime<Utc>,
    /// Fitted search, including the refit best pipeline
    pub search: FittedSearch,
}

impl ModelArtifact {
    /// Wrap a fitted search, stamping it with the current time
    #[must_use]
    pub fn new(search: FittedSearch) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            trained_at: Utc::now(),
            search,
        }
    }
}

/// Serialize the artifact to `path`, overwriting any existing file
pub fn save_model(artifact: &ModelArtifact, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, artifact)?;
    writer.flush()?;

    info!(path = %path.display(), labels = artifact.search.label_names().len(), "Saved model");
    Ok(())
}

/// Read an artifact written by [`save_model`]
pub fn load_model(path: &Path) -> Result<ModelArtifact> {
    let reader = BufReader::new(File::open(path)?);
    let artifact: ModelArtifact = bincode::deserialize_from(reader)?;
    Ok(artifact)
}
