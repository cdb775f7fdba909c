//! Filesystem-based state backend.
//!
//! Stores the dedup snapshot as a single JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "records": {
//!     "t3_abc123": "2026-10-15T12:00:00Z",
//!     "t1_def456": "2026-10-14T08:30:00Z"
//!   }
//! }
//! ```
//!
//! The file is replaced wholesale on every persist using write-to-temp,
//! fsync, rename, then fsync of the parent directory, so a crash mid-write
//! leaves the previous snapshot intact and a completed persist survives
//! power loss. Cache files written by the earlier Go tool
//! (`{"Posts": {"t3_abc": "<rfc3339>"}}`) are still accepted on load.

use crate::models::ItemId;
use crate::storage::traits::{StateBackend, StoreSnapshot};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Maximum state file size (16MB).
/// A week of saves is a few hundred records; anything near this is not ours.
const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Current on-disk format version.
const FORMAT_VERSION: u32 = 1;

/// Default state file name.
pub const DEFAULT_STATE_FILE: &str = "reddit2dynalist.cache.json";

/// Serializable state format.
#[derive(Debug, Serialize, Deserialize)]
struct StoredState {
    version: u32,
    records: BTreeMap<String, DateTime<Utc>>,
}

/// Cache layout of the original Go implementation.
#[derive(Debug, Deserialize)]
struct LegacyCache {
    #[serde(rename = "Posts")]
    posts: HashMap<String, DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredFile {
    Current(StoredState),
    Legacy(LegacyCache),
}

impl From<&StoreSnapshot> for StoredState {
    fn from(snapshot: &StoreSnapshot) -> Self {
        Self {
            version: FORMAT_VERSION,
            records: snapshot
                .records
                .iter()
                .map(|(id, seen)| (id.as_str().to_string(), *seen))
                .collect(),
        }
    }
}

fn into_snapshot<I>(records: I) -> StoreSnapshot
where
    I: IntoIterator<Item = (String, DateTime<Utc>)>,
{
    StoreSnapshot {
        records: records
            .into_iter()
            .map(|(id, seen)| (ItemId::new(id), seen))
            .collect(),
    }
}

/// Filesystem state backend writing one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    /// Path of the state file.
    path: PathBuf,
}

impl JsonFileBackend {
    /// Creates a backend for the given state file path.
    ///
    /// Nothing is touched on disk until the first load or persist.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the state file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the temporary file used during persist.
    ///
    /// Lives next to the target so the final rename never crosses filesystems.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map_or_else(
                || DEFAULT_STATE_FILE.to_string(),
                |n| n.to_string_lossy().into_owned(),
            );
        self.path.with_file_name(format!(".{name}.tmp"))
    }

    fn load_error(&self, cause: impl ToString) -> Error {
        Error::StoreLoad {
            path: self.path.display().to_string(),
            cause: cause.to_string(),
        }
    }

    fn persist_error(&self, cause: impl ToString) -> Error {
        Error::StorePersist {
            path: self.path.display().to_string(),
            cause: cause.to_string(),
        }
    }

    fn write_temp(&self, temp: &Path, data: &[u8]) -> Result<()> {
        let mut file = fs::File::create(temp).map_err(|e| self.persist_error(e))?;
        file.write_all(data).map_err(|e| self.persist_error(e))?;
        file.sync_all().map_err(|e| self.persist_error(e))?;
        Ok(())
    }
}

impl StateBackend for JsonFileBackend {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Option<StoreSnapshot>> {
        let metadata = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.load_error(e)),
        };

        if metadata.len() > MAX_FILE_SIZE {
            return Err(self.load_error(format!(
                "file exceeds maximum size of {MAX_FILE_SIZE} bytes"
            )));
        }

        let data = fs::read(&self.path).map_err(|e| self.load_error(e))?;
        let stored: StoredFile = serde_json::from_slice(&data).map_err(|e| self.load_error(e))?;

        match stored {
            StoredFile::Current(state) if state.version > FORMAT_VERSION => Err(self.load_error(
                format!("unsupported format version {}", state.version),
            )),
            StoredFile::Current(state) => Ok(Some(into_snapshot(state.records))),
            StoredFile::Legacy(cache) => {
                tracing::info!(
                    records = cache.posts.len(),
                    "Migrating legacy cache file layout"
                );
                Ok(Some(into_snapshot(cache.posts)))
            },
        }
    }

    fn persist(&self, snapshot: &StoreSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.persist_error(e))?;
            }
        }

        let json = serde_json::to_vec_pretty(&StoredState::from(snapshot))
            .map_err(|e| self.persist_error(e))?;

        let temp = self.temp_path();
        if let Err(e) = self.write_temp(&temp, &json) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }

        fs::rename(&temp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            self.persist_error(e)
        })?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        sync_dir(dir).map_err(|e| self.persist_error(e))
    }
}

/// Flushes a directory entry change (the rename) to disk.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
