// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn for_build_generates_an_id_when_absent() {
    let options = PipelineOptions::for_build(None);
    assert!(!options.build_id.is_empty());
    assert!(options.deploy_id.is_empty());
    assert_eq!(options.run_kind(), Some(RunKind::Build));
    // Must parse as a v4 UUID
    let parsed = uuid::Uuid::parse_str(&options.build_id).unwrap();
    assert_eq!(parsed.get_version_num(), 4);
}

#[test]
fn for_build_keeps_a_supplied_id() {
    let options = PipelineOptions::for_build(Some("b-123".to_string()));
    assert_eq!(options.build_id, "b-123");
    assert_eq!(options.run_id(), "b-123");
}

#[test]
fn for_deploy_sets_deploy_kind() {
    let options = PipelineOptions::for_deploy(Some("d-9".to_string()));
    assert_eq!(options.run_kind(), Some(RunKind::Deploy));
    assert_eq!(options.run_id(), "d-9");
}

#[test]
fn validate_rejects_conflicting_ids() {
    let options = PipelineOptions {
        build_id: "b".to_string(),
        deploy_id: "d".to_string(),
        ..PipelineOptions::default()
    };
    assert!(matches!(
        options.validate(),
        Err(OptionsError::ConflictingRunIds)
    ));
}

#[test]
fn validate_rejects_missing_ids() {
    let options = PipelineOptions::default();
    assert!(matches!(options.validate(), Err(OptionsError::MissingRunId)));
}

#[test]
fn run_kind_is_none_without_ids() {
    assert_eq!(PipelineOptions::default().run_kind(), None);
}
