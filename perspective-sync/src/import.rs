//! Remote payload → flat state.
//!
//! ## Import order
//!
//! 1. Decode strictly (unknown fields are an error).
//! 2. Build a skeleton group for every non-catch-all Static Group and
//!    Dynamic Group Block item, indexed by `(kind, ref_id)`.
//! 3. Hang each Dynamic Group item under the block named by its `blk_id`.
//! 4. Walk the rules in wire order; a group's position in the output is the
//!    position of the first rule that targets it.
//! 5. Collect catch-all items verbatim as other entries.

use std::collections::{HashMap, HashSet};

use perspective_core::{
    flat, wire, ConstantKind, DynamicChild, Group, GroupKind, OtherEntry, PerspectiveDocument,
    PerspectiveState, RefId, TranslateError,
};

/// Parse a raw remote payload into the flat form.
pub fn import(raw: &[u8]) -> Result<PerspectiveState, TranslateError> {
    let doc: PerspectiveDocument = serde_json::from_slice(raw)?;
    import_document(&doc)
}

/// Convert an already decoded payload into the flat form.
pub fn import_document(doc: &PerspectiveDocument) -> Result<PerspectiveState, TranslateError> {
    let schema = &doc.schema;
    let include_in_reports = parse_bool("include_in_reports", &schema.include_in_reports)?;

    let mut skeletons = Skeletons::build(&schema.constants)?;
    skeletons.attach_dynamic_children(&schema.constants)?;
    let groups = skeletons.attach_rules(&schema.rules)?;
    let other_groups = find_other_groups(&schema.constants, &skeletons.other_blocks);

    tracing::debug!(
        "imported perspective '{}': {} group(s), {} other group(s)",
        schema.name,
        groups.len(),
        other_groups.len()
    );

    Ok(PerspectiveState {
        name: schema.name.clone(),
        include_in_reports,
        groups,
        other_groups,
    })
}

// ---------------------------------------------------------------------------
// Skeleton groups
// ---------------------------------------------------------------------------

struct Skeletons {
    groups: Vec<Option<Group>>,
    index: HashMap<(GroupKind, RefId), usize>,
    /// Ref-ids of catch-all Dynamic Group Block items.
    other_blocks: HashSet<RefId>,
}

impl Skeletons {
    fn build(constants: &[wire::ConstantBlock]) -> Result<Self, TranslateError> {
        let mut skeletons = Skeletons {
            groups: Vec::new(),
            index: HashMap::new(),
            other_blocks: HashSet::new(),
        };

        for block in constants {
            let kind = match block.kind {
                ConstantKind::StaticGroup => GroupKind::Filter,
                ConstantKind::DynamicGroupBlock => GroupKind::Categorize,
                ConstantKind::DynamicGroup => continue,
            };
            for item in &block.list {
                if item.is_other() {
                    if kind == GroupKind::Categorize {
                        skeletons.other_blocks.insert(item.ref_id.clone());
                    }
                    continue;
                }
                let key = (kind, item.ref_id.clone());
                if skeletons.index.contains_key(&key) {
                    return Err(TranslateError::DuplicateRefId {
                        kind: block.kind,
                        ref_id: item.ref_id.clone(),
                    });
                }
                let mut group = Group::new(item.name.clone(), kind);
                group.ref_id = item.ref_id.clone();
                skeletons.index.insert(key, skeletons.groups.len());
                skeletons.groups.push(Some(group));
            }
        }
        Ok(skeletons)
    }

    fn attach_dynamic_children(
        &mut self,
        constants: &[wire::ConstantBlock],
    ) -> Result<(), TranslateError> {
        let dynamic_items = constants
            .iter()
            .filter(|block| block.kind == ConstantKind::DynamicGroup)
            .flat_map(|block| block.list.iter());

        for item in dynamic_items {
            if item.is_other() || item.has_no_block() {
                continue;
            }
            let blk_id = item.blk_id.clone().unwrap_or_default();
            if self.other_blocks.contains(&blk_id) {
                continue;
            }
            let owner = self
                .index
                .get(&(GroupKind::Categorize, blk_id.clone()))
                .and_then(|idx| self.groups[*idx].as_mut())
                .ok_or_else(|| TranslateError::DanglingBlockId {
                    name: item.name.clone(),
                    blk_id,
                })?;
            owner.dynamic_groups.push(DynamicChild {
                name: item.name.clone(),
                val: item.val.clone(),
                ref_id: item.ref_id.clone(),
            });
        }
        Ok(())
    }

    /// Consumes the skeletons, returning groups in first-referenced order.
    ///
    /// Groups no rule refers to follow, in constant order.
    fn attach_rules(&mut self, rules: &[wire::Rule]) -> Result<Vec<Group>, TranslateError> {
        let mut order: Vec<usize> = Vec::new();
        let mut seen = vec![false; self.groups.len()];

        for rule in rules {
            let target = rule
                .target()
                .ok_or_else(|| TranslateError::RuleWithoutTarget {
                    kind: rule.kind,
                    asset: rule.asset.clone(),
                })?;
            let idx = self.resolve(rule, target)?;
            if !seen[idx] {
                seen[idx] = true;
                order.push(idx);
            }
            if let Some(group) = self.groups[idx].as_mut() {
                group.rules.push(flat_rule(rule));
            }
        }

        for (idx, was_seen) in seen.iter().enumerate() {
            if !was_seen {
                if let Some(group) = &self.groups[idx] {
                    tracing::warn!(
                        "group '{}' (ref_id {}) has no rules; keeping it after referenced groups",
                        group.name,
                        group.ref_id
                    );
                }
                order.push(idx);
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|idx| self.groups[idx].take())
            .collect())
    }

    fn resolve(&self, rule: &wire::Rule, target: &RefId) -> Result<usize, TranslateError> {
        if let Some(idx) = self.index.get(&(rule.kind, target.clone())) {
            return Ok(*idx);
        }
        let other_kind = match rule.kind {
            GroupKind::Filter => GroupKind::Categorize,
            GroupKind::Categorize => GroupKind::Filter,
        };
        if self.index.contains_key(&(other_kind, target.clone())) {
            return Err(TranslateError::RuleKindMismatch {
                asset: rule.asset.clone(),
                target: target.clone(),
                expected: other_kind,
                found: rule.kind,
            });
        }
        Err(TranslateError::UnresolvedRuleTarget {
            kind: rule.kind,
            asset: rule.asset.clone(),
            target: target.clone(),
        })
    }
}

fn flat_rule(rule: &wire::Rule) -> flat::Rule {
    let (combine_with, conditions) = match &rule.condition {
        Some(condition) => (
            Some(condition.combine_with.clone()).filter(|c| !c.is_empty()),
            condition.clauses.iter().map(flat_clause).collect(),
        ),
        None => (None, Vec::new()),
    };
    flat::Rule {
        kind: None,
        asset: rule.asset.clone(),
        field: rule.field.clone(),
        tag_field: rule.tag_field.clone(),
        combine_with,
        conditions,
    }
}

fn flat_clause(clause: &wire::Clause) -> flat::Clause {
    flat::Clause {
        field: clause.field.clone(),
        tag_field: clause.tag_field.clone(),
        op: clause.op.clone(),
        val: clause.val.clone(),
    }
}

// ---------------------------------------------------------------------------
// Catch-all items
// ---------------------------------------------------------------------------

fn find_other_groups(
    constants: &[wire::ConstantBlock],
    other_blocks: &HashSet<RefId>,
) -> Vec<OtherEntry> {
    let mut result = Vec::new();
    for block in constants {
        for item in &block.list {
            let catch_all = match block.kind {
                ConstantKind::StaticGroup | ConstantKind::DynamicGroupBlock => item.is_other(),
                ConstantKind::DynamicGroup => {
                    item.is_other()
                        || item.has_no_block()
                        || item
                            .blk_id
                            .as_ref()
                            .is_some_and(|blk| other_blocks.contains(blk))
                }
            };
            if catch_all {
                result.push(OtherEntry {
                    constant_type: block.kind,
                    ref_id: item.ref_id.clone(),
                    name: item.name.clone(),
                    val: item.val.clone(),
                    is_other: item.is_other.clone(),
                    blk_id: item.blk_id.clone(),
                });
            }
        }
    }
    result
}

/// Accepts the same literals as the remote service's boolean parser.
fn parse_bool(field: &'static str, value: &str) -> Result<bool, TranslateError> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(TranslateError::MalformedBoolean {
            field,
            value: value.to_owned(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
