//! Ref-id reconciliation between the previous and the desired group lists.
//!
//! The flat list has no stable identity for its members, so the group name
//! (within one group kind) is the only correlation key:
//!
//! 1. A desired group whose kind and name appear in `previous` takes that
//!    group's ref-id.
//! 2. Any other group keeps the ref-id it carries, unless that id is already
//!    claimed in this pass (covers "renamed but not moved").
//! 3. Everything else gets a freshly minted ref-id.
//!
//! A group that is renamed *and* moved relative to other renamed or moved
//! groups cannot be told apart from a delete plus a create, and is given a new
//! ref-id. Callers that need continuity across a rename must not reorder in
//! the same edit.
//!
//! Minted ids are never handed out twice. UUIDs are unique on their own;
//! sequential ids start above a watermark, the largest numeric ref-id the
//! perspective has ever used, which callers persist between runs.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use perspective_core::{
    ConstantKind, Group, GroupKind, OtherEntry, PerspectiveState, RefId, TranslateError,
};

// ---------------------------------------------------------------------------
// Minting
// ---------------------------------------------------------------------------

/// How new ref-ids are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RefIdStrategy {
    /// A random v4 UUID.
    #[default]
    Uuid,
    /// One past the watermark. Falls back to a UUID once `u64` is exhausted.
    Sequential,
}

#[derive(Debug)]
enum RefIdMinter {
    Sequential { next: Option<u64> },
    Uuid,
}

impl RefIdMinter {
    fn new(strategy: RefIdStrategy, watermark: u64) -> Self {
        match strategy {
            RefIdStrategy::Sequential => RefIdMinter::Sequential {
                next: watermark.checked_add(1),
            },
            RefIdStrategy::Uuid => RefIdMinter::Uuid,
        }
    }

    fn mint(&mut self, is_taken: impl Fn(&RefId) -> bool) -> RefId {
        loop {
            let candidate = match self {
                RefIdMinter::Sequential { next } => match *next {
                    Some(n) => {
                        *next = n.checked_add(1);
                        RefId(n.to_string())
                    }
                    None => {
                        tracing::warn!("numeric ref-ids exhausted; minting a UUID");
                        RefId(Uuid::new_v4().to_string())
                    }
                },
                RefIdMinter::Uuid => RefId(Uuid::new_v4().to_string()),
            };
            if !is_taken(&candidate) {
                return candidate;
            }
        }
    }
}

/// Largest numeric ref-id anywhere in `state`, or 0.
pub fn ref_id_watermark(state: &PerspectiveState) -> u64 {
    max_numeric(all_ref_ids(&state.groups, &state.other_groups))
}

fn all_ref_ids<'a>(
    groups: &'a [Group],
    others: &'a [OtherEntry],
) -> impl Iterator<Item = &'a RefId> {
    groups
        .iter()
        .flat_map(|g| std::iter::once(&g.ref_id).chain(g.dynamic_groups.iter().map(|c| &c.ref_id)))
        .chain(others.iter().map(|o| &o.ref_id))
}

fn max_numeric<'a>(ids: impl IntoIterator<Item = &'a RefId>) -> u64 {
    ids.into_iter()
        .filter_map(RefId::as_number)
        .max()
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Where a group's final ref-id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefIdSource {
    /// Matched a previous group by kind and name.
    Previous,
    /// Kept the ref-id the desired group already carried.
    Carried,
    /// Newly minted.
    Minted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub group: String,
    pub ref_id: RefId,
    pub source: RefIdSource,
}

/// One [`Assignment`] per desired group, in list order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub assignments: Vec<Assignment>,
    /// Watermark to persist for the next run: the input watermark raised to
    /// every numeric ref-id seen or assigned.
    pub watermark: u64,
}

impl ReconcileReport {
    pub fn minted(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments
            .iter()
            .filter(|a| a.source == RefIdSource::Minted)
    }
}

// ---------------------------------------------------------------------------
// reconcile
// ---------------------------------------------------------------------------

/// [`reconcile_from`] with no recorded history beyond `previous`.
pub fn reconcile(
    desired: &mut [Group],
    previous: &[Group],
    others: &[OtherEntry],
    strategy: RefIdStrategy,
) -> Result<ReconcileReport, TranslateError> {
    reconcile_from(desired, previous, others, strategy, 0)
}

/// Assign a stable, unique ref-id to every group in `desired`.
///
/// `others` are the catch-all entries that will be exported alongside; their
/// ref-ids are never handed to a group of the same constant kind. Sequential
/// minting starts above both `watermark` and every numeric id in view.
///
/// Fails with [`TranslateError::DuplicateGroupName`] when two desired groups
/// of one kind share a name.
pub fn reconcile_from(
    desired: &mut [Group],
    previous: &[Group],
    others: &[OtherEntry],
    strategy: RefIdStrategy,
    watermark: u64,
) -> Result<ReconcileReport, TranslateError> {
    check_unique_names(desired)?;

    let mut by_name: HashMap<(GroupKind, &str), &RefId> = HashMap::new();
    for group in previous.iter().filter(|g| !g.ref_id.is_empty()) {
        by_name
            .entry((group.kind, group.name.as_str()))
            .or_insert(&group.ref_id);
    }

    let reserved: HashSet<(ConstantKind, RefId)> = others
        .iter()
        .filter(|o| !o.ref_id.is_empty())
        .map(|o| (o.constant_type, o.ref_id.clone()))
        .collect();

    let floor = watermark
        .max(max_numeric(all_ref_ids(desired, others)))
        .max(max_numeric(all_ref_ids(previous, &[])));
    let mut minter = RefIdMinter::new(strategy, floor);

    let mut claimed: HashSet<(ConstantKind, RefId)> = HashSet::new();
    let mut resolved: Vec<Option<(RefId, RefIdSource)>> = vec![None; desired.len()];

    // Pass 1: name matches.
    for (idx, group) in desired.iter().enumerate() {
        let Some(ref_id) = by_name.get(&(group.kind, group.name.as_str())) else {
            continue;
        };
        let kind = group.kind.constant_kind();
        if !claimed.insert((kind, (*ref_id).clone())) {
            return Err(TranslateError::DuplicateRefId {
                kind,
                ref_id: (*ref_id).clone(),
            });
        }
        resolved[idx] = Some(((*ref_id).clone(), RefIdSource::Previous));
    }

    // Pass 2: carried or minted.
    for (idx, group) in desired.iter().enumerate() {
        if resolved[idx].is_some() {
            continue;
        }
        let kind = group.kind.constant_kind();
        let is_taken = |id: &RefId| {
            let key = (kind, id.clone());
            claimed.contains(&key) || reserved.contains(&key)
        };

        let (ref_id, source) = if !group.ref_id.is_empty() && !is_taken(&group.ref_id) {
            (group.ref_id.clone(), RefIdSource::Carried)
        } else {
            (minter.mint(is_taken), RefIdSource::Minted)
        };
        claimed.insert((kind, ref_id.clone()));
        resolved[idx] = Some((ref_id, source));
    }

    let mut report = ReconcileReport {
        assignments: Vec::with_capacity(desired.len()),
        watermark: floor,
    };
    for (group, slot) in desired.iter_mut().zip(resolved) {
        let Some((ref_id, source)) = slot else {
            continue;
        };
        match source {
            RefIdSource::Previous if group.ref_id != ref_id => tracing::debug!(
                "group '{}': ref_id {} restored from previous state (was '{}')",
                group.name,
                ref_id,
                group.ref_id
            ),
            RefIdSource::Minted => {
                tracing::debug!("group '{}': minted ref_id {}", group.name, ref_id)
            }
            _ => {}
        }
        if let Some(n) = ref_id.as_number() {
            report.watermark = report.watermark.max(n);
        }
        group.ref_id = ref_id.clone();
        report.assignments.push(Assignment {
            group: group.name.clone(),
            ref_id,
            source,
        });
    }
    Ok(report)
}

/// Names are the correlation key, so they must be unique within a kind.
fn check_unique_names(groups: &[Group]) -> Result<(), TranslateError> {
    let mut names: HashSet<(GroupKind, &str)> = HashSet::new();
    match groups
        .iter()
        .find(|g| !names.insert((g.kind, g.name.as_str())))
    {
        Some(dup) => Err(TranslateError::DuplicateGroupName {
            name: dup.name.clone(),
            kind: dup.kind,
        }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
