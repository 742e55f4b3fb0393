//! Flat state → remote payload.
//!
//! [`export`] reconciles ref-ids first, since they are embedded in rules and
//! constants, then builds the document with [`build_document`]. The
//! reconciled state comes back in [`Export::state`]; callers persist it as the
//! next `previous`.

use serde::{Deserialize, Serialize};

use perspective_core::{
    flat, wire, ConstantKind, Group, GroupKind, PerspectiveDocument, PerspectiveSchema,
    PerspectiveState, RefId, TranslateError,
};

use crate::reconcile::{reconcile_from, RefIdStrategy, ReconcileReport};

/// Knobs for [`export`] and [`to_json_bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub ref_id_strategy: RefIdStrategy,
    /// Indent the JSON payload with two spaces.
    pub pretty: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            ref_id_strategy: RefIdStrategy::Uuid,
            pretty: true,
        }
    }
}

/// Result of a successful [`export`].
#[derive(Debug, Clone)]
pub struct Export {
    /// The desired state with every group's ref-id finalized.
    pub state: PerspectiveState,
    pub document: PerspectiveDocument,
    pub report: ReconcileReport,
}

/// Reconcile `desired` against `previous` and build the remote payload.
pub fn export(
    desired: PerspectiveState,
    previous: Option<&PerspectiveState>,
    options: &ExportOptions,
) -> Result<Export, TranslateError> {
    export_from(desired, previous, 0, options)
}

/// [`export`] with a persisted ref-id watermark (see
/// [`reconcile_from`](crate::reconcile::reconcile_from)).
/// The raised watermark comes back in [`ReconcileReport::watermark`].
pub fn export_from(
    mut desired: PerspectiveState,
    previous: Option<&PerspectiveState>,
    watermark: u64,
    options: &ExportOptions,
) -> Result<Export, TranslateError> {
    for group in &desired.groups {
        check_rule_kinds(group)?;
    }

    let previous_groups = previous.map(|p| p.groups.as_slice()).unwrap_or_default();
    let report = reconcile_from(
        &mut desired.groups,
        previous_groups,
        &desired.other_groups,
        options.ref_id_strategy,
        watermark,
    )?;
    let document = build_document(&desired)?;

    Ok(Export {
        state: desired,
        document,
        report,
    })
}

/// Serialize a document the way the remote service expects it.
pub fn to_json_bytes(
    document: &PerspectiveDocument,
    options: &ExportOptions,
) -> Result<Vec<u8>, TranslateError> {
    let bytes = if options.pretty {
        serde_json::to_vec_pretty(document)?
    } else {
        serde_json::to_vec(document)?
    };
    Ok(bytes)
}

/// Build the payload for a state whose ref-ids are already final.
pub fn build_document(state: &PerspectiveState) -> Result<PerspectiveDocument, TranslateError> {
    let mut blocks = Blocks::default();
    let mut rules = Vec::new();

    for group in &state.groups {
        check_rule_kinds(group)?;
        match group.kind {
            GroupKind::Categorize => {
                for child in &group.dynamic_groups {
                    blocks.list_mut(ConstantKind::DynamicGroup).push(wire::ConstantItem {
                        ref_id: child.ref_id.clone(),
                        blk_id: Some(group.ref_id.clone()),
                        name: child.name.clone(),
                        val: child.val.clone(),
                        is_other: String::new(),
                    });
                }
                rules.extend(group.rules.iter().map(|r| wire_rule(r, group)));
            }
            GroupKind::Filter => {
                rules.extend(group.rules.iter().map(|r| wire_rule(r, group)));
            }
        }
        blocks
            .list_mut(group.kind.constant_kind())
            .push(wire::ConstantItem {
                ref_id: group.ref_id.clone(),
                name: group.name.clone(),
                ..wire::ConstantItem::default()
            });
    }

    for other in &state.other_groups {
        blocks.list_mut(other.constant_type).push(wire::ConstantItem {
            ref_id: other.ref_id.clone(),
            blk_id: other.blk_id.clone(),
            name: other.name.clone(),
            val: other.val.clone(),
            is_other: other.is_other.clone(),
        });
    }

    Ok(PerspectiveDocument {
        schema: PerspectiveSchema {
            name: state.name.clone(),
            include_in_reports: state.include_in_reports.to_string(),
            rules,
            constants: blocks.into_blocks()?,
            merges: Vec::new(),
        },
    })
}

/// Every explicit rule kind must match the group's kind.
fn check_rule_kinds(group: &Group) -> Result<(), TranslateError> {
    for rule in &group.rules {
        if let Some(rule_kind) = rule.kind {
            if rule_kind != group.kind {
                return Err(TranslateError::MixedRuleKinds {
                    group: group.name.clone(),
                    group_kind: group.kind,
                    rule_kind,
                });
            }
        }
    }
    Ok(())
}

fn wire_rule(rule: &flat::Rule, group: &Group) -> wire::Rule {
    let (to, ref_id) = match group.kind {
        GroupKind::Filter => (group.ref_id.clone(), RefId::default()),
        GroupKind::Categorize => (RefId::default(), group.ref_id.clone()),
    };
    let condition = if rule.combine_with.is_some() || !rule.conditions.is_empty() {
        Some(wire::Condition {
            combine_with: rule.combine_with.clone().unwrap_or_default(),
            clauses: rule
                .conditions
                .iter()
                .map(|c| wire::Clause {
                    field: c.field.clone(),
                    tag_field: c.tag_field.clone(),
                    op: c.op.clone(),
                    val: c.val.clone(),
                })
                .collect(),
        })
    } else {
        None
    };
    wire::Rule {
        kind: group.kind,
        asset: rule.asset.clone(),
        to,
        ref_id,
        field: rule.field.clone(),
        tag_field: rule.tag_field.clone(),
        condition,
    }
}

// ---------------------------------------------------------------------------
// Constant blocks
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Blocks {
    static_groups: Vec<wire::ConstantItem>,
    dynamic_groups: Vec<wire::ConstantItem>,
    dynamic_group_blocks: Vec<wire::ConstantItem>,
}

impl Blocks {
    fn list_mut(&mut self, kind: ConstantKind) -> &mut Vec<wire::ConstantItem> {
        match kind {
            ConstantKind::StaticGroup => &mut self.static_groups,
            ConstantKind::DynamicGroup => &mut self.dynamic_groups,
            ConstantKind::DynamicGroupBlock => &mut self.dynamic_group_blocks,
        }
    }

    /// Non-empty blocks in wire order; fails on a repeated ref-id within a kind.
    fn into_blocks(mut self) -> Result<Vec<wire::ConstantBlock>, TranslateError> {
        let mut blocks = Vec::new();
        for kind in ConstantKind::all() {
            let list = std::mem::take(self.list_mut(*kind));
            if list.is_empty() {
                continue;
            }
            let mut seen = std::collections::HashSet::new();
            if let Some(dup) = list
                .iter()
                .filter(|i| !i.ref_id.is_empty())
                .find(|i| !seen.insert(i.ref_id.clone()))
            {
                return Err(TranslateError::DuplicateRefId {
                    kind: *kind,
                    ref_id: dup.ref_id.clone(),
                });
            }
            blocks.push(wire::ConstantBlock { kind: *kind, list });
        }
        Ok(blocks)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use perspective_core::{DynamicChild, ErrorCategory, OtherEntry};

    fn filter_group(name: &str, ref_id: &str) -> Group {
        let mut g = Group::new(name, GroupKind::Filter);
        g.ref_id = RefId::from(ref_id);
        g.rules.push(flat::Rule::new("AwsAccount"));
        g
    }

    fn state(groups: Vec<Group>) -> PerspectiveState {
        PerspectiveState {
            name: "Test".into(),
            include_in_reports: true,
            groups,
            other_groups: vec![],
        }
    }

    #[test]
    fn mixed_rule_kinds_are_rejected() {
        let mut g = filter_group("Mixed", "1");
        g.rules[0].kind = Some(GroupKind::Filter);
        let mut categorize = flat::Rule::new("AwsAsset");
        categorize.kind = Some(GroupKind::Categorize);
        g.rules.push(categorize);

        let err = export(state(vec![g]), None, &ExportOptions::default()).unwrap_err();
        assert!(matches!(err, TranslateError::MixedRuleKinds { .. }));
        assert_eq!(err.category(), ErrorCategory::Consistency);
    }

    #[test]
    fn empty_blocks_are_omitted() {
        let exported =
            export(state(vec![filter_group("A", "1")]), None, &ExportOptions::default())
                .expect("export");
        let constants = &exported.document.schema.constants;
        assert_eq!(constants.len(), 1);
        assert_eq!(constants[0].kind, ConstantKind::StaticGroup);
    }

    #[test]
    fn include_in_reports_is_a_string_and_merges_empty() {
        let exported = export(state(vec![]), None, &ExportOptions::default()).expect("export");
        let json = serde_json::to_value(&exported.document).unwrap();
        assert_eq!(json["schema"]["include_in_reports"], "true");
        assert_eq!(json["schema"]["merges"], serde_json::json!([]));
        assert_eq!(json["schema"]["constants"], serde_json::json!([]));
    }

    #[test]
    fn categorize_group_emits_children_with_blk_id() {
        let mut g = Group::new("Teams", GroupKind::Categorize);
        g.ref_id = RefId::from("1");
        let mut rule = flat::Rule::new("AwsAsset");
        rule.tag_field = vec!["team".into()];
        g.rules.push(rule);
        g.dynamic_groups.push(DynamicChild {
            name: "ops".into(),
            val: "ops".into(),
            ref_id: RefId::from("2"),
        });

        let exported = export(state(vec![g]), None, &ExportOptions::default()).expect("export");
        let schema = &exported.document.schema;
        assert_eq!(schema.rules[0].ref_id, RefId::from("1"));
        assert!(schema.rules[0].to.is_empty());
        assert_eq!(schema.constants[0].kind, ConstantKind::DynamicGroup);
        assert_eq!(schema.constants[0].list[0].blk_id, Some(RefId::from("1")));
        assert_eq!(schema.constants[1].kind, ConstantKind::DynamicGroupBlock);
    }

    #[test]
    fn missing_ref_ids_are_filled_in() {
        let exported = export(
            state(vec![filter_group("New Group", ""), filter_group("Existing Group", "1")]),
            None,
            &ExportOptions::default(),
        )
        .expect("export");
        let new_ref = &exported.state.groups[0].ref_id;
        assert!(!new_ref.is_empty());
        assert_ne!(new_ref, &RefId::from("1"));
        assert_eq!(exported.document.schema.rules[0].to, *new_ref);
    }

    #[test]
    fn duplicate_child_ref_ids_are_rejected() {
        let mut g = Group::new("Teams", GroupKind::Categorize);
        g.ref_id = RefId::from("1");
        for name in ["a", "b"] {
            g.dynamic_groups.push(DynamicChild {
                name: name.into(),
                val: name.into(),
                ref_id: RefId::from("9"),
            });
        }
        let err = build_document(&state(vec![g])).unwrap_err();
        assert!(matches!(
            err,
            TranslateError::DuplicateRefId {
                kind: ConstantKind::DynamicGroup,
                ..
            }
        ));
    }

    #[test]
    fn other_entries_land_in_their_own_block() {
        let mut s = state(vec![filter_group("A", "1")]);
        s.other_groups.push(OtherEntry {
            constant_type: ConstantKind::StaticGroup,
            ref_id: RefId::from("2"),
            name: "Other".into(),
            val: String::new(),
            is_other: "true".into(),
            blk_id: None,
        });
        let doc = build_document(&s).expect("build");
        let list = &doc.schema.constants[0].list;
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].is_other, "true");
    }

    #[test]
    fn compact_output_has_no_newlines() {
        let exported = export(state(vec![]), None, &ExportOptions::default()).expect("export");
        let options = ExportOptions {
            pretty: false,
            ..ExportOptions::default()
        };
        let bytes = to_json_bytes(&exported.document, &options).expect("bytes");
        assert!(!bytes.contains(&b'\n'));
    }
}
