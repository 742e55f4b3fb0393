//! Whether a config has drifted from its last-synced snapshot.
//!
//! Signal precedence:
//! 1. `NeverSynced` (no snapshot)
//! 2. `Modified` (config differs from the snapshot)
//! 3. `Current`

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};

use perspective_core::state;
use perspective_core::{Group, PerspectiveState, RefId};

use crate::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StalenessSignal {
    NeverSynced,
    Current {
        synced_at: DateTime<Utc>,
    },
    Modified {
        synced_at: DateTime<Utc>,
        changes: Vec<String>,
    },
}

/// Compare `<root>/<key>.yaml` with its snapshot.
pub fn check_at(root: &Path, key: &str) -> Result<StalenessSignal, SyncError> {
    let config = state::load_config_at(root, key)?;
    let Some(snapshot) = state::load_previous_at(root, key)? else {
        return Ok(StalenessSignal::NeverSynced);
    };

    let changes = describe_changes(&snapshot.perspective, &config);
    if changes.is_empty() {
        Ok(StalenessSignal::Current {
            synced_at: snapshot.synced_at,
        })
    } else {
        Ok(StalenessSignal::Modified {
            synced_at: snapshot.synced_at,
            changes,
        })
    }
}

/// Human-readable differences between two flat states. Ref-ids are ignored:
/// an empty ref-id in the config is not a change on its own.
pub fn describe_changes(synced: &PerspectiveState, config: &PerspectiveState) -> Vec<String> {
    let mut changes = Vec::new();
    if synced.name != config.name {
        changes.push(format!("renamed perspective to '{}'", config.name));
    }
    if synced.include_in_reports != config.include_in_reports {
        changes.push(format!(
            "include_in_reports set to {}",
            config.include_in_reports
        ));
    }

    let before: HashMap<&str, &Group> = synced
        .groups
        .iter()
        .map(|g| (g.name.as_str(), g))
        .collect();
    let after: HashMap<&str, &Group> = config
        .groups
        .iter()
        .map(|g| (g.name.as_str(), g))
        .collect();

    for group in &config.groups {
        match before.get(group.name.as_str()) {
            None => changes.push(format!("added group '{}'", group.name)),
            Some(old) if !same_group(old, group) => {
                changes.push(format!("changed group '{}'", group.name))
            }
            Some(_) => {}
        }
    }
    for group in &synced.groups {
        if !after.contains_key(group.name.as_str()) {
            changes.push(format!("removed group '{}'", group.name));
        }
    }

    let order = |s: &PerspectiveState| -> Vec<String> {
        s.groups.iter().map(|g| g.name.clone()).collect()
    };
    if changes.is_empty() && order(synced) != order(config) {
        changes.push("reordered groups".to_string());
    }
    if synced.other_groups != config.other_groups {
        changes.push("changed other groups".to_string());
    }
    changes
}

fn same_group(a: &Group, b: &Group) -> bool {
    let strip = |g: &Group| Group {
        ref_id: RefId::default(),
        ..g.clone()
    };
    strip(a) == strip(b)
}

/// Format age from a chrono timestamp (snapshot `synced_at`).
pub fn format_datetime_age(timestamp: DateTime<Utc>) -> String {
    let now = Utc::now();
    let age = now.signed_duration_since(timestamp).num_seconds().max(0) as u64;
    format_seconds(age)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}
