use assert_fs::prelude::*;
use perspective_core::state::{
    config_path_at, list_config_keys_at, load_config_at, load_previous_at, save_config_at,
    save_state_at, StateSnapshot,
};
use perspective_core::{
    Clause, ConstantKind, DynamicChild, Group, GroupKind, OtherEntry, PerspectiveState, RefId,
    Rule, StateError,
};
use predicates::prelude::*;
use rstest::rstest;
use tempfile::TempDir;

fn dynamic_state() -> PerspectiveState {
    let mut group = Group::new("Teams", GroupKind::Categorize);
    group.ref_id = RefId::from("1");
    let mut rule = Rule::new("AwsAsset");
    rule.tag_field = vec!["team".into()];
    rule.combine_with = Some("OR".into());
    rule.conditions.push(Clause {
        field: vec!["Account Name".into()],
        op: "!=".into(),
        val: "Sandbox".into(),
        ..Clause::default()
    });
    group.rules.push(rule);
    group.dynamic_groups.push(DynamicChild {
        name: "ops".into(),
        val: "ops".into(),
        ref_id: RefId::from("2"),
    });
    PerspectiveState {
        name: "Teams".into(),
        include_in_reports: false,
        groups: vec![group],
        other_groups: vec![OtherEntry {
            constant_type: ConstantKind::DynamicGroup,
            ref_id: RefId::from("3"),
            name: "Remaining".into(),
            val: "Remaining".into(),
            is_other: String::new(),
            blk_id: Some(RefId::default()),
        }],
    }
}

#[test]
fn config_survives_save_and_load() {
    let root = TempDir::new().expect("tempdir");
    let state = dynamic_state();
    save_config_at(root.path(), "teams", &state).expect("save");
    let loaded = load_config_at(root.path(), "teams").expect("load");
    assert_eq!(loaded, state);
}

#[test]
fn hand_written_config_uses_defaults() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let yaml = "\
name: Envs
groups:
  - name: Prod
    rules:
      - asset: AwsAccount
        conditions:
          - field: [Account Name]
            val: prod
";
    root.child("envs.yaml").write_str(yaml).unwrap();
    let state = load_config_at(root.path(), "envs").expect("load");

    assert!(!state.include_in_reports);
    let group = &state.groups[0];
    assert_eq!(group.kind, GroupKind::Filter);
    assert!(group.ref_id.is_empty());
    assert_eq!(group.rules[0].kind, None);
    assert_eq!(group.rules[0].conditions[0].op, "=");
}

#[rstest]
#[case::unknown_group_key("name: Envs\ngroups:\n  - name: Prod\n    colour: red\n")]
#[case::unknown_kind("name: Envs\ngroups:\n  - name: Prod\n    type: sort\n")]
#[case::missing_name("groups: []\n")]
fn invalid_configs_fail_with_parse_error(#[case] yaml: &str) {
    let root = TempDir::new().expect("tempdir");
    std::fs::write(config_path_at(root.path(), "bad"), yaml).unwrap();
    let err = load_config_at(root.path(), "bad").unwrap_err();
    assert!(matches!(err, StateError::Parse { .. }), "{err}");
}

#[test]
fn snapshot_is_the_previous_state() {
    let root = TempDir::new().expect("tempdir");
    assert!(load_previous_at(root.path(), "teams").unwrap().is_none());

    let snapshot = StateSnapshot {
        synced_at: chrono::Utc::now(),
        ref_id_watermark: 3,
        perspective: dynamic_state(),
    };
    save_state_at(root.path(), "teams", &snapshot).expect("save");
    let previous = load_previous_at(root.path(), "teams")
        .expect("load")
        .expect("present");
    assert_eq!(previous.perspective, snapshot.perspective);
    assert_eq!(previous.ref_id_watermark, 3);
}

#[test]
fn snapshot_without_watermark_defaults_to_zero() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child(".perspective/state/envs.yaml")
        .write_str("synced_at: 2024-01-01T00:00:00Z\nperspective:\n  name: Envs\n")
        .unwrap();
    let previous = load_previous_at(root.path(), "envs")
        .expect("load")
        .expect("present");
    assert_eq!(previous.ref_id_watermark, 0);
    assert_eq!(previous.perspective.name, "Envs");
}

#[test]
fn only_top_level_yaml_files_are_configs() {
    let root = TempDir::new().expect("tempdir");
    save_config_at(root.path(), "teams", &dynamic_state()).unwrap();
    std::fs::write(root.path().join("notes.txt"), "hi").unwrap();
    assert_eq!(list_config_keys_at(root.path()).unwrap(), vec!["teams".to_string()]);
}

#[test]
fn saved_config_omits_empty_fields() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let mut group = Group::new("Prod", GroupKind::Filter);
    group.rules.push(Rule::new("AwsAccount"));
    let state = PerspectiveState {
        name: "Envs".into(),
        include_in_reports: true,
        groups: vec![group],
        other_groups: vec![],
    };
    save_config_at(root.path(), "envs", &state).expect("save");

    let config = root.child("envs.yaml");
    config.assert(predicate::str::contains("name: Prod"));
    config.assert(predicate::str::contains("type: filter"));
    config.assert(predicate::str::contains("ref_id").not());
    config.assert(predicate::str::contains("other_groups").not());
    config.assert(predicate::str::contains("dynamic_groups").not());
}
