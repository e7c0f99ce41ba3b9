//! Serialising the documentation database and writing it to disk.

use directories::ProjectDirs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::{OutputConfig, DATABASE_FILE_NAME};
use crate::contract::DatabaseSink;
use crate::error::{DocgenError, Result};
use crate::model::DocumentationDatabase;

/// Pretty-printed JSON with object keys in lexicographic order.
///
/// Going through [`serde_json::Value`] sorts the keys, since its map is ordered.
pub fn serialize_database(database: &DocumentationDatabase) -> Result<Vec<u8>> {
    let value = serde_json::to_value(database)?;
    let mut bytes = serde_json::to_vec_pretty(&value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub fn parse_database(bytes: &[u8]) -> Result<DocumentationDatabase> {
    Ok(serde_json::from_slice(bytes)?)
}

/// `<data dir>/repodoc/repository_database.json`, if the platform has a data directory.
pub fn default_primary_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "repodoc").map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
}

/// `./repository_database.json`
pub fn default_secondary_path() -> PathBuf {
    PathBuf::from(DATABASE_FILE_NAME)
}

/// File destinations for `output`, primary first. A primary with no platform data
/// directory to fall back on is skipped with a warning.
pub fn default_sinks(output: &OutputConfig) -> Vec<FileSink> {
    let mut sinks = Vec::with_capacity(2);
    match output.primary.clone().or_else(default_primary_path) {
        Some(path) => sinks.push(FileSink::new(path)),
        None => warn!("No application data directory on this platform, skipping primary output"),
    }
    let secondary = output.secondary.clone().unwrap_or_else(default_secondary_path);
    sinks.push(FileSink::new(secondary));
    sinks
}

/// Writes the database to a single file, replacing it atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSink { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist_error(&self, source: std::io::Error) -> DocgenError {
        DocgenError::Persist {
            path: self.path.clone(),
            source,
        }
    }
}

impl DatabaseSink for FileSink {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.persist_error(e))?;

        // Write next to the target so the final rename never crosses filesystems.
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| self.persist_error(e))?;
        tmp.write_all(bytes).map_err(|e| self.persist_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.persist_error(e))?;
        debug!(
            tmp = %tmp.path().display(),
            target = %self.path.display(),
            "Renaming database into place"
        );
        tmp.persist(&self.path).map_err(|e| self.persist_error(e.error))?;

        info!(path = %self.path.display(), bytes = bytes.len(), "Wrote documentation database");
        Ok(())
    }
}
