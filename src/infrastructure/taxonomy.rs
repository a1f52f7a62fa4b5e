//! Local taxonomy table.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::domain::errors::CacheError;

/// Lookup table mapping scientific names to display names.
///
/// Loaded once from the station's JSON labels file, a flat object of
/// `"Sci name": "Common name"` pairs.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    labels: HashMap<String, String>,
}

impl Taxonomy {
    /// Loads the labels file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a JSON object of
    /// string pairs.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let content = fs::read_to_string(path)
            .map_err(|e| CacheError::io(format!("failed to read labels file: {e}")))?;
        let labels: HashMap<String, String> = serde_json::from_str(&content)
            .map_err(|e| CacheError::io(format!("failed to parse labels file: {e}")))?;
        info!(path = %path.display(), species = labels.len(), "Loaded taxonomy labels");
        Ok(Self { labels })
    }

    /// Builds a taxonomy from an in-memory label map.
    #[must_use]
    pub fn from_labels(labels: HashMap<String, String>) -> Self {
        Self { labels }
    }

    /// Resolves the display name for a scientific name.
    #[must_use]
    pub fn common_name(&self, sci_name: &str) -> Option<&str> {
        self.labels.get(sci_name).map(String::as_str)
    }

    /// Number of known species.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True if the table holds no species.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
