//! The remote service's nested JSON schema.
//!
//! Decoding is closed: every struct denies unknown fields so that drift in the
//! remote format fails loudly instead of being dropped on the next write.
//! Empty strings and lists are omitted on output, matching the remote's own
//! omit-empty encoding. `blk_id` is the exception: an absent `blk_id` and an
//! empty one are distinct and both survive a round trip.

use serde::{Deserialize, Serialize};

use crate::types::{ConstantKind, GroupKind, RefId};

/// Top-level payload: `{"schema": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerspectiveDocument {
    pub schema: PerspectiveSchema,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerspectiveSchema {
    pub name: String,
    /// `"true"` / `"false"` on the wire; parsed by the importer.
    pub include_in_reports: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub constants: Vec<ConstantBlock>,
    /// Merges are not supported: ignored on input, always empty on output.
    #[serde(default)]
    pub merges: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    #[serde(rename = "type")]
    pub kind: GroupKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub asset: String,
    /// Owning Static Group (filter rules).
    #[serde(default, skip_serializing_if = "RefId::is_empty")]
    pub to: RefId,
    /// Owning Dynamic Group Block (categorize rules).
    #[serde(default, skip_serializing_if = "RefId::is_empty")]
    pub ref_id: RefId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_field: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl Rule {
    /// The group this rule belongs to: `to` when set, otherwise `ref_id`.
    pub fn target(&self) -> Option<&RefId> {
        if !self.to.is_empty() {
            Some(&self.to)
        } else if !self.ref_id.is_empty() {
            Some(&self.ref_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub combine_with: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clauses: Vec<Clause>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Clause {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_field: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub op: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub val: String,
}

/// One block of constants, all of the same kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstantBlock {
    #[serde(rename = "type")]
    pub kind: ConstantKind,
    #[serde(default)]
    pub list: Vec<ConstantItem>,
}

impl ConstantBlock {
    pub fn new(kind: ConstantKind) -> Self {
        Self {
            kind,
            list: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstantItem {
    #[serde(default, skip_serializing_if = "RefId::is_empty")]
    pub ref_id: RefId,
    /// Back-reference to the owning Dynamic Group Block (Dynamic Group items only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blk_id: Option<RefId>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub val: String,
    /// `"true"` marks the catch-all bucket of its kind.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub is_other: String,
}

impl ConstantItem {
    pub fn is_other(&self) -> bool {
        self.is_other == "true"
    }

    /// `true` when `blk_id` is absent or empty.
    pub fn has_no_block(&self) -> bool {
        self.blk_id.as_ref().map_or(true, RefId::is_empty)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_document_parses() {
        let doc: PerspectiveDocument =
            serde_json::from_str(r#"{"schema": {"name": "a", "include_in_reports": "true"}}"#)
                .expect("parse");
        assert_eq!(doc.schema.name, "a");
        assert!(doc.schema.rules.is_empty());
        assert!(doc.schema.constants.is_empty());
    }

    #[test]
    fn unknown_top_level_field_is_rejected() {
        let result = serde_json::from_str::<PerspectiveDocument>(
            r#"{"schema": {"name": "a", "include_in_reports": "true", "some_key": "some_value"}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_nested_field_is_rejected() {
        let result = serde_json::from_str::<PerspectiveDocument>(
            r#"{"schema": {"name": "a", "include_in_reports": "true",
                "constants": [{"type": "Static Group", "list": [{"ref_id": "1", "colour": "red"}]}]}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rule_target_prefers_to() {
        let rule = Rule {
            kind: GroupKind::Filter,
            asset: "AwsAccount".into(),
            to: RefId::from("1"),
            ref_id: RefId::from("2"),
            field: vec![],
            tag_field: vec![],
            condition: None,
        };
        assert_eq!(rule.target(), Some(&RefId::from("1")));
    }

    #[test]
    fn empty_blk_id_survives_serialization() {
        let item = ConstantItem {
            ref_id: RefId::from("6"),
            blk_id: Some(RefId::default()),
            name: "Remaining".into(),
            val: "Remaining".into(),
            is_other: String::new(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["blk_id"], "");
        assert!(json.get("is_other").is_none());
        assert!(item.has_no_block());
    }
}
