//! File-level sync pipeline shared by every CLI command.
//!
//! ```text
//! <root>/
//!   <key>.yaml                          user config
//!   .perspective/
//!     state/<key>.yaml                  snapshot (the `previous` of the next export)
//!     payloads/<key>.json               last exported payload (default output)
//!     hashes.json                       payload digests
//! ```

use std::path::{Path, PathBuf};

use chrono::Utc;

use perspective_core::state::{self, StateSnapshot};

use crate::export::{export_from, to_json_bytes, Export, ExportOptions};
use crate::reconcile::{ref_id_watermark, ReconcileReport};
use crate::writer::{atomic_write, WriteResult};
use crate::{hash_store, import, SyncError};

/// `<root>/.perspective/payloads/<key>.json`
pub fn payload_path_at(root: &Path, key: &str) -> PathBuf {
    root.join(".perspective")
        .join("payloads")
        .join(format!("{key}.json"))
}

// ---------------------------------------------------------------------------
// import
// ---------------------------------------------------------------------------

/// Outcome of importing one remote payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub key: String,
    pub config_path: PathBuf,
    pub groups: usize,
    pub other_groups: usize,
}

/// Import a remote payload as `<root>/<key>.yaml` and record it as the
/// last-synced snapshot.
pub fn import_at(root: &Path, key: &str, raw: &[u8]) -> Result<ImportOutcome, SyncError> {
    let perspective = import::import(raw)?;
    state::save_config_at(root, key, &perspective)?;
    let outcome = ImportOutcome {
        key: key.to_string(),
        config_path: state::config_path_at(root, key),
        groups: perspective.groups.len(),
        other_groups: perspective.other_groups.len(),
    };
    state::save_state_at(
        root,
        key,
        &StateSnapshot {
            synced_at: Utc::now(),
            ref_id_watermark: ref_id_watermark(&perspective),
            perspective,
        },
    )?;
    tracing::info!("imported '{}' into {}", key, outcome.config_path.display());
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// export
// ---------------------------------------------------------------------------

/// Reconcile `<root>/<key>.yaml` against its snapshot without touching disk.
pub fn preview_at(root: &Path, key: &str, options: &ExportOptions) -> Result<Export, SyncError> {
    let desired = state::load_config_at(root, key)?;
    let previous = state::load_previous_at(root, key)?;
    Ok(export_from(
        desired,
        previous.as_ref().map(|s| &s.perspective),
        previous.as_ref().map_or(0, |s| s.ref_id_watermark),
        options,
    )?)
}

/// Outcome of exporting one config.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub key: String,
    pub write: WriteResult,
    pub report: ReconcileReport,
    /// The config file was rewritten with reconciled ref-ids.
    pub config_updated: bool,
}

/// Export `<root>/<key>.yaml` to `out` (default [`payload_path_at`]).
///
/// Unless `dry_run`, the reconciled state becomes the new snapshot and is
/// written back to the config when its ref-ids changed.
pub fn export_at(
    root: &Path,
    key: &str,
    out: Option<&Path>,
    options: &ExportOptions,
    dry_run: bool,
) -> Result<ExportOutcome, SyncError> {
    let sync_started_at = Utc::now();
    let desired = state::load_config_at(root, key)?;
    let previous = state::load_previous_at(root, key)?;
    let exported = export_from(
        desired.clone(),
        previous.as_ref().map(|s| &s.perspective),
        previous.as_ref().map_or(0, |s| s.ref_id_watermark),
        options,
    )?;
    let bytes = to_json_bytes(&exported.document, options)?;

    let path = out.map_or_else(|| payload_path_at(root, key), Path::to_path_buf);
    let mut store = hash_store::load_at(root)?;
    let write = atomic_write(&path, &bytes, &mut store.files, dry_run)?;

    let config_updated = exported.state != desired;
    if !dry_run {
        if config_updated {
            state::save_config_at(root, key, &exported.state)?;
        }
        state::save_state_at(
            root,
            key,
            &StateSnapshot {
                synced_at: sync_started_at,
                ref_id_watermark: exported.report.watermark,
                perspective: exported.state,
            },
        )?;
        store.synced_at = sync_started_at;
        hash_store::save_at(root, &store)?;
    }

    Ok(ExportOutcome {
        key: key.to_string(),
        write,
        report: exported.report,
        config_updated: config_updated && !dry_run,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
