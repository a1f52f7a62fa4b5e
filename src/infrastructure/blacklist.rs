//! Durable image blacklist.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::domain::errors::CacheError;

/// Append-only set of banned external photo identifiers.
///
/// Backed by a flat text file, one id per line. Loaded once at construction;
/// `add` appends to both the file and the in-memory set. Ids never leave the
/// list.
#[derive(Debug)]
pub struct Blacklist {
    path: PathBuf,
    ids: RwLock<Vec<String>>,
}

impl Blacklist {
    /// Loads the blacklist file. A missing file is an empty blacklist.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let ids = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| CacheError::io(format!("failed to read blacklist: {e}")))?;
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ToString::to_string)
                .collect()
        } else {
            Vec::new()
        };
        info!(path = %path.display(), entries = ids.len(), "Loaded image blacklist");
        Ok(Self {
            path,
            ids: RwLock::new(ids),
        })
    }

    /// Whether an external id is banned.
    #[must_use]
    pub fn contains(&self, external_id: &str) -> bool {
        self.ids.read().iter().any(|id| id == external_id)
    }

    /// Appends an id to the list, durably.
    ///
    /// # Errors
    /// Returns error if the file cannot be appended to.
    pub fn add(&self, external_id: &str) -> Result<(), CacheError> {
        let mut ids = self.ids.write();
        if ids.iter().any(|id| id == external_id) {
            debug!(external_id, "Id already blacklisted");
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CacheError::io(format!("failed to create blacklist dir: {e}")))?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CacheError::io(format!("failed to open blacklist: {e}")))?;
        writeln!(file, "{external_id}")
            .map_err(|e| CacheError::io(format!("failed to append to blacklist: {e}")))?;
        ids.push(external_id.to_string());
        info!(external_id, "Blacklisted image id");
        Ok(())
    }

    /// Number of banned ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.read().len()
    }

    /// True if nothing is banned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.read().is_empty()
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
