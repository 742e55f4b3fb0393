use perspective_core::{Clause, DynamicChild, Group, GroupKind, PerspectiveState, RefId, Rule};
use perspective_renderer::{Renderer, TemplateContext, TemplateEngine};

fn sample_state() -> PerspectiveState {
    let mut accounts = Group::new("Group Two", GroupKind::Filter);
    accounts.ref_id = RefId::from("2");
    let mut rule = Rule::new("AwsAccount");
    rule.combine_with = Some("OR".into());
    rule.conditions.push(Clause {
        field: vec!["Account Name".into()],
        op: "Contains".into(),
        val: "Some Account".into(),
        ..Clause::default()
    });
    rule.conditions.push(Clause {
        field: vec!["Account Name".into()],
        val: "Another Account".into(),
        ..Clause::default()
    });
    accounts.rules.push(rule);

    let mut teams = Group::new("Teams", GroupKind::Categorize);
    teams.ref_id = RefId::from("1");
    let mut rule = Rule::new("AwsAsset");
    rule.tag_field = vec!["team".into(), "squad".into()];
    teams.rules.push(rule);
    let mut rule = Rule::new("AwsRedshiftCluster");
    rule.field = vec!["Cluster Identifier".into()];
    teams.rules.push(rule);
    teams.dynamic_groups.push(DynamicChild {
        name: "ops".into(),
        val: "ops".into(),
        ref_id: RefId::from("3"),
    });

    PerspectiveState {
        name: "My \"Quoted\" Name".into(),
        include_in_reports: true,
        groups: vec![accounts, teams],
        other_groups: vec![],
    }
}

#[test]
fn full_resource_block_layout() {
    let renderer = Renderer::new().expect("renderer");
    let text = renderer.render(&sample_state(), "my perspective").expect("render");

    let expected = r#"resource "cloudhealth_perspective" "my_perspective" {
    name = "My \"Quoted\" Name"
    include_in_reports = true

    group {
        name = "Group Two"
        type = "filter"

        rule {
            asset = "AwsAccount"
            combine_with = "OR"
            condition {
                field = ["Account Name"]
                op = "Contains"
                val = "Some Account"
            }
            condition {
                field = ["Account Name"]
                val = "Another Account"
            }
        }
    }

    group {
        name = "Teams"
        type = "categorize"

        rule {
            asset = "AwsAsset"
            tag_field = ["team", "squad"]
        }

        rule {
            asset = "AwsRedshiftCluster"
            field = ["Cluster Identifier"]
        }
    }
}
"#;
    assert_eq!(text, expected);
}

#[test]
fn ref_ids_and_children_are_not_rendered() {
    let renderer = Renderer::new().expect("renderer");
    let text = renderer.render(&sample_state(), "envs").expect("render");
    assert!(!text.contains("ref_id"));
    assert!(!text.contains("ops"));
}

#[test]
fn engine_renders_a_prebuilt_context() {
    let engine = TemplateEngine::new(None).expect("engine");
    let mut ctx = TemplateContext::from_state(&sample_state(), "envs");
    ctx.groups.truncate(1);
    let text = engine.render(&ctx).expect("render");
    assert!(text.contains("\"Group Two\""));
    assert!(!text.contains("\"Teams\""));
}

#[test]
fn empty_op_is_kept_instead_of_defaulting() {
    let mut state = sample_state();
    state.groups[0].rules[0].conditions[1].op = String::new();
    let renderer = Renderer::new().expect("renderer");
    let text = renderer.render(&state, "envs").expect("render");
    assert!(text.contains("op = \"\""), "{text}");
    assert_eq!(text.matches("op = ").count(), 2);
}
