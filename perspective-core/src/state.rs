//! Config files and last-synced snapshots on disk.
//!
//! # Storage layout
//!
//! ```text
//! <root>/
//!   <key>.yaml                          (user-edited flat config)
//!   .perspective/
//!     state/
//!       <key>.yaml                      (snapshot of the last export, mode 0600)
//! ```
//!
//! The snapshot is the explicit `previous` handed to the reconciler on the
//! next export. Every function takes the workspace root; callers (and tests)
//! pass it explicitly.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, StateError};
use crate::flat::PerspectiveState;

/// A flat state as it was last sent to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub synced_at: DateTime<Utc>,
    /// Largest numeric ref-id this perspective has ever used. Sequential
    /// minting starts above it, so ids of deleted groups are not reissued.
    #[serde(default)]
    pub ref_id_watermark: u64,
    pub perspective: PerspectiveState,
}

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<root>/<key>.yaml` (pure, no I/O).
pub fn config_path_at(root: &Path, key: &str) -> PathBuf {
    root.join(format!("{key}.yaml"))
}

/// `<root>/.perspective/state/` (pure, no I/O).
pub fn state_dir_at(root: &Path) -> PathBuf {
    root.join(".perspective").join("state")
}

/// `<root>/.perspective/state/<key>.yaml` (pure, no I/O).
pub fn state_path_at(root: &Path, key: &str) -> PathBuf {
    state_dir_at(root).join(format!("{key}.yaml"))
}

/// Keys of every `<root>/*.yaml` config, sorted.
pub fn list_config_keys_at(root: &Path) -> Result<Vec<String>, StateError> {
    if !root.exists() {
        return Ok(vec![]);
    }
    let mut keys: Vec<String> = std::fs::read_dir(root)
        .map_err(|e| io_err(root, e))?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            name.strip_suffix(".yaml").map(str::to_owned)
        })
        .collect();
    keys.sort();
    Ok(keys)
}

// ---------------------------------------------------------------------------
// 2. User config
// ---------------------------------------------------------------------------

/// Load the user-edited config `<root>/<key>.yaml`.
///
/// Returns `StateError::NotFound` if absent,
/// `StateError::Parse` (with path + line context) if malformed YAML.
pub fn load_config_at(root: &Path, key: &str) -> Result<PerspectiveState, StateError> {
    read_yaml(&config_path_at(root, key))
}

/// Atomically write the user config `<root>/<key>.yaml`.
pub fn save_config_at(root: &Path, key: &str, state: &PerspectiveState) -> Result<(), StateError> {
    std::fs::create_dir_all(root).map_err(|e| io_err(root, e))?;
    write_yaml_atomic(&config_path_at(root, key), state, false)
}

// ---------------------------------------------------------------------------
// 3. Snapshots
// ---------------------------------------------------------------------------

/// Load the snapshot for `key`.
pub fn load_state_at(root: &Path, key: &str) -> Result<StateSnapshot, StateError> {
    read_yaml(&state_path_at(root, key))
}

/// The `previous` state for `key`: the snapshot if one exists, otherwise `None`.
pub fn load_previous_at(root: &Path, key: &str) -> Result<Option<StateSnapshot>, StateError> {
    match load_state_at(root, key) {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(StateError::NotFound { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Atomically save the snapshot for `key`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_state_at(root: &Path, key: &str, snapshot: &StateSnapshot) -> Result<(), StateError> {
    let dir = state_dir_at(root);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        set_dir_permissions(&dir)?;
    }
    write_yaml_atomic(&state_path_at(root, key), snapshot, true)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StateError> {
    if !path.exists() {
        return Err(StateError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| StateError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

fn write_yaml_atomic<T: Serialize>(path: &Path, value: &T, private: bool) -> Result<(), StateError> {
    let tmp_path = path.with_extension("yaml.tmp");
    let yaml = serde_yaml::to_string(value)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    if private {
        set_file_permissions(&tmp_path)?;
    }
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(path, e));
    }
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StateError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StateError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StateError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StateError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
