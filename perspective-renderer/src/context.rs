//! Template context: serializable rendering payload built from a
//! [`PerspectiveState`].
//!
//! Every string value is pre-quoted and escaped for HCL, so templates print
//! them verbatim. Attributes that would only restate a default (an `op` of
//! `=`, an empty `val`, empty lists) are `None` and skipped by the templates.
//! An empty `op` is not the default and renders as `op = ""`.

use serde::{Deserialize, Serialize};

use perspective_core::{flat, Group, PerspectiveState};

use crate::error::RenderError;

/// Resource type the rendered block declares.
pub const RESOURCE_TYPE: &str = "cloudhealth_perspective";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateContext {
    pub resource_type: String,
    /// Sanitized to a valid HCL identifier.
    pub resource_name: String,
    pub name: String,
    pub include_in_reports: bool,
    pub groups: Vec<GroupCtx>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupCtx {
    pub name: String,
    pub kind: String,
    pub rules: Vec<RuleCtx>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCtx {
    pub asset: String,
    pub combine_with: Option<String>,
    pub field: Option<String>,
    pub tag_field: Option<String>,
    pub conditions: Vec<ConditionCtx>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionCtx {
    pub field: Option<String>,
    pub tag_field: Option<String>,
    pub op: Option<String>,
    pub val: Option<String>,
}

impl TemplateContext {
    pub fn from_state(state: &PerspectiveState, resource_name: &str) -> Self {
        TemplateContext {
            resource_type: RESOURCE_TYPE.to_string(),
            resource_name: identifier(resource_name),
            name: quote(&state.name),
            include_in_reports: state.include_in_reports,
            groups: state.groups.iter().map(group_ctx).collect(),
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

fn group_ctx(group: &Group) -> GroupCtx {
    GroupCtx {
        name: quote(&group.name),
        kind: group.kind.to_string(),
        rules: group.rules.iter().map(rule_ctx).collect(),
    }
}

fn rule_ctx(rule: &flat::Rule) -> RuleCtx {
    RuleCtx {
        asset: quote(&rule.asset),
        combine_with: rule
            .combine_with
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(quote),
        field: list(&rule.field),
        tag_field: list(&rule.tag_field),
        conditions: rule
            .conditions
            .iter()
            .map(|c| ConditionCtx {
                field: list(&c.field),
                tag_field: list(&c.tag_field),
                op: Some(c.op.as_str()).filter(|op| *op != "=").map(quote),
                val: Some(c.val.as_str()).filter(|v| !v.is_empty()).map(quote),
            })
            .collect(),
    }
}

/// `"value"` with HCL escapes, including template interpolation markers.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn list(values: &[String]) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    let items: Vec<String> = values.iter().map(|v| quote(v)).collect();
    Some(format!("[{}]", items.join(", ")))
}

/// Replace anything outside `[A-Za-z0-9_-]` with `_`; prefix a leading digit.
fn identifier(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        out.insert(0, '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use perspective_core::{Clause, GroupKind};

    #[test]
    fn quote_escapes_hcl_specials() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote("C:\\tmp"), "\"C:\\\\tmp\"");
        assert_eq!(quote("${var}"), "\"$${var}\"");
        assert_eq!(quote("100%"), "\"100%\"");
    }

    #[test]
    fn identifier_is_sanitized() {
        assert_eq!(identifier("envs"), "envs");
        assert_eq!(identifier("my envs.v2"), "my_envs_v2");
        assert_eq!(identifier("2024"), "_2024");
        assert_eq!(identifier(""), "_");
    }

    #[test]
    fn default_op_and_empty_val_are_dropped() {
        let mut rule = flat::Rule::new("AwsAccount");
        rule.conditions.push(Clause {
            field: vec!["Account Name".into()],
            ..Clause::default()
        });
        rule.conditions.push(Clause {
            tag_field: vec!["team".into()],
            op: "Contains".into(),
            val: "ops".into(),
            ..Clause::default()
        });
        let mut group = Group::new("Prod", GroupKind::Filter);
        group.rules.push(rule);
        let state = PerspectiveState {
            name: "Envs".into(),
            groups: vec![group],
            ..PerspectiveState::default()
        };

        let ctx = TemplateContext::from_state(&state, "envs");
        let conditions = &ctx.groups[0].rules[0].conditions;
        assert_eq!(conditions[0].field.as_deref(), Some("[\"Account Name\"]"));
        assert!(conditions[0].op.is_none());
        assert!(conditions[0].val.is_none());
        assert_eq!(conditions[1].op.as_deref(), Some("\"Contains\""));
        assert_eq!(conditions[1].tag_field.as_deref(), Some("[\"team\"]"));
        assert_eq!(ctx.groups[0].kind, "filter");
    }

    #[test]
    fn empty_op_is_rendered_explicitly() {
        let mut rule = flat::Rule::new("AwsAccount");
        rule.conditions.push(Clause {
            field: vec!["Account Name".into()],
            op: String::new(),
            val: "prod".into(),
            ..Clause::default()
        });
        let mut group = Group::new("Prod", GroupKind::Filter);
        group.rules.push(rule);
        let state = PerspectiveState {
            name: "Envs".into(),
            groups: vec![group],
            ..PerspectiveState::default()
        };

        let ctx = TemplateContext::from_state(&state, "envs");
        assert_eq!(
            ctx.groups[0].rules[0].conditions[0].op.as_deref(),
            Some("\"\"")
        );
    }

    #[test]
    fn to_tera_context_succeeds() {
        let ctx = TemplateContext::from_state(&PerspectiveState::default(), "empty");
        ctx.to_tera_context().expect("context conversion");
    }
}
