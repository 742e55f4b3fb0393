//! The flat, user-editable configuration.
//!
//! Groups are listed in display order and own their rules and (for
//! categorize groups) their dynamic children. Rules carry no target: the
//! owning group is implied by containment. Ref-ids are carried along but are
//! never authored by the user; the reconciler fills them in.
//!
//! Stored as YAML. Unknown keys are rejected so typos surface on load.

use serde::{Deserialize, Serialize};

use crate::types::{ConstantKind, GroupKind, RefId};

/// A whole perspective in flat form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerspectiveState {
    pub name: String,
    #[serde(default)]
    pub include_in_reports: bool,
    #[serde(default)]
    pub groups: Vec<Group>,
    /// Catch-all buckets, passed through untouched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other_groups: Vec<OtherEntry>,
}

/// A named bucket of assets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Group {
    pub name: String,
    #[serde(default, skip_serializing_if = "RefId::is_empty")]
    pub ref_id: RefId,
    #[serde(rename = "type", default)]
    pub kind: GroupKind,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Observed category values (categorize groups only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dynamic_groups: Vec<DynamicChild>,
}

impl Group {
    pub fn new(name: impl Into<String>, kind: GroupKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    /// Inherits the group's kind when omitted.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<GroupKind>,
    pub asset: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_field: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combine_with: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Clause>,
}

impl Rule {
    pub fn new(asset: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            ..Self::default()
        }
    }
}

/// A single condition clause of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Clause {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_field: Vec<String>,
    #[serde(default = "default_op")]
    pub op: String,
    #[serde(default)]
    pub val: String,
}

impl Default for Clause {
    fn default() -> Self {
        Self {
            field: Vec::new(),
            tag_field: Vec::new(),
            op: default_op(),
            val: String::new(),
        }
    }
}

fn default_op() -> String {
    "=".to_owned()
}

/// One category value under a categorize group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DynamicChild {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub val: String,
    #[serde(default, skip_serializing_if = "RefId::is_empty")]
    pub ref_id: RefId,
}

/// An opaque catch-all constant item.
///
/// Stored verbatim so that exporting reproduces exactly what was imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OtherEntry {
    pub constant_type: ConstantKind,
    #[serde(default, skip_serializing_if = "RefId::is_empty")]
    pub ref_id: RefId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub val: String,
    /// The wire `is_other` literal, kept as written (`"true"`, `"false"` or absent).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub is_other: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blk_id: Option<RefId>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
