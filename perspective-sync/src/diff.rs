//! Unified diff between a remote payload and what `export` would send.

use std::path::Path;

use similar::TextDiff;

use crate::export::ExportOptions;
use crate::{pipeline, SyncError};

/// Diff of one config's payload against the remote copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDiff {
    pub key: String,
    /// Empty when both sides are equal up to key order and whitespace.
    pub unified_diff: String,
}

impl PayloadDiff {
    pub fn is_empty(&self) -> bool {
        self.unified_diff.is_empty()
    }
}

/// Compare `remote` against the payload `export` would produce for `key`.
///
/// Both sides are normalized to pretty-printed JSON with sorted keys. No files
/// are written.
pub fn diff_at(
    root: &Path,
    key: &str,
    remote: &[u8],
    options: &ExportOptions,
) -> Result<PayloadDiff, SyncError> {
    let exported = pipeline::preview_at(root, key, options)?;
    let remote: serde_json::Value = serde_json::from_slice(remote)?;
    let local = serde_json::to_value(&exported.document)?;

    let old = normalize(&remote)?;
    let new = normalize(&local)?;
    if old == new {
        return Ok(PayloadDiff {
            key: key.to_string(),
            unified_diff: String::new(),
        });
    }

    let unified = TextDiff::from_lines(&old, &new)
        .unified_diff()
        .header("remote", &format!("{key}.yaml"))
        .context_radius(3)
        .to_string();
    Ok(PayloadDiff {
        key: key.to_string(),
        unified_diff: unified,
    })
}

fn normalize(value: &serde_json::Value) -> Result<String, SyncError> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}
