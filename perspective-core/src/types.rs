//! Shared vocabulary of the wire and flat schemas.
//!
//! Ref-ids are opaque strings on both sides; the two kind enums are closed
//! sets so every translation site matches them exhaustively.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TranslateError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A server-correlated identifier for a group, child item or catch-all bucket.
///
/// Unique within one [`ConstantKind`]; two kinds may reuse the same literal.
/// An empty ref-id means "not assigned yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RefId(pub String);

impl RefId {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the ref-id, if it is a plain non-negative integer.
    pub fn as_number(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RefId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RefId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The kind of a group, and of every rule it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    /// Assets matched by conditions land in a single static bucket.
    #[default]
    Filter,
    /// Assets are split into one dynamic bucket per observed field/tag value.
    Categorize,
}

impl GroupKind {
    /// The constant block that holds the group's own item.
    pub fn constant_kind(self) -> ConstantKind {
        match self {
            GroupKind::Filter => ConstantKind::StaticGroup,
            GroupKind::Categorize => ConstantKind::DynamicGroupBlock,
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKind::Filter => write!(f, "filter"),
            GroupKind::Categorize => write!(f, "categorize"),
        }
    }
}

/// The three constant block kinds of the wire schema.
///
/// - `StaticGroup` items are leaf group markers for filter groups.
/// - `DynamicGroupBlock` items own a set of `DynamicGroup` children.
/// - `DynamicGroup` items are children, pointing at their block via `blk_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConstantKind {
    #[serde(rename = "Static Group")]
    StaticGroup,
    #[serde(rename = "Dynamic Group")]
    DynamicGroup,
    #[serde(rename = "Dynamic Group Block")]
    DynamicGroupBlock,
}

impl ConstantKind {
    /// All kinds, in the order blocks are emitted on export.
    pub fn all() -> &'static [ConstantKind] {
        &[
            ConstantKind::StaticGroup,
            ConstantKind::DynamicGroup,
            ConstantKind::DynamicGroupBlock,
        ]
    }

    /// The literal used for the block `type` on the wire.
    pub fn as_wire_str(self) -> &'static str {
        match self {
            ConstantKind::StaticGroup => "Static Group",
            ConstantKind::DynamicGroup => "Dynamic Group",
            ConstantKind::DynamicGroupBlock => "Dynamic Group Block",
        }
    }
}

impl fmt::Display for ConstantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

impl FromStr for ConstantKind {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConstantKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_wire_str() == s)
            .ok_or_else(|| TranslateError::UnknownConstantKind {
                kind: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_id_display_and_number() {
        assert_eq!(RefId::from("42").to_string(), "42");
        assert_eq!(RefId::from("42").as_number(), Some(42));
        assert_eq!(RefId::from("a1b2").as_number(), None);
        assert!(RefId::default().is_empty());
    }

    #[test]
    fn group_kind_maps_to_constant_kind() {
        assert_eq!(GroupKind::Filter.constant_kind(), ConstantKind::StaticGroup);
        assert_eq!(
            GroupKind::Categorize.constant_kind(),
            ConstantKind::DynamicGroupBlock
        );
    }

    #[test]
    fn constant_kind_parses_wire_literals() {
        for kind in ConstantKind::all() {
            let parsed: ConstantKind = kind.as_wire_str().parse().expect("parse");
            assert_eq!(parsed, *kind);
        }
    }

    #[test]
    fn unknown_constant_kind_is_rejected() {
        let err = "Merged Group".parse::<ConstantKind>().unwrap_err();
        assert!(matches!(err, TranslateError::UnknownConstantKind { .. }));
    }

    #[test]
    fn constant_kind_serializes_with_spaces() {
        let json = serde_json::to_string(&ConstantKind::DynamicGroupBlock).unwrap();
        assert_eq!(json, "\"Dynamic Group Block\"");
    }
}
