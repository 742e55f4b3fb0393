//! Hash store: SHA-256 digests of the last payload written per config key.
//!
//! Persists a [`HashStoreFile`] JSON document at
//! `<root>/.perspective/hashes.json`. Writes use the same atomic `.tmp` +
//! rename pattern as the state store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, SyncError};

/// Payload path string → hex SHA-256 digest.
pub type HashStore = BTreeMap<String, String>;

/// On-disk hash store payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HashStoreFile {
    pub synced_at: DateTime<Utc>,
    #[serde(default)]
    pub files: HashStore,
}

impl Default for HashStoreFile {
    fn default() -> Self {
        Self {
            synced_at: Utc::now(),
            files: HashStore::new(),
        }
    }
}

/// `<root>/.perspective/hashes.json`
pub fn store_path_at(root: &Path) -> PathBuf {
    root.join(".perspective").join("hashes.json")
}

/// Load the hash store. Returns an empty store if the file does not exist.
pub fn load_at(root: &Path) -> Result<HashStoreFile, SyncError> {
    let path = store_path_at(root);
    if !path.exists() {
        return Ok(HashStoreFile::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Save the hash store atomically (`hashes.json.tmp` then rename).
pub fn save_at(root: &Path, store: &HashStoreFile) -> Result<(), SyncError> {
    let path = store_path_at(root);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid hash store path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(store)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    Ok(())
}
