// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const SAMPLE: &str = r#"
image = "alpine:3.20"

[env]
CI = "true"

[target]
repo = "acme/app"
tag = "nightly"

[[build.step]]
name = "test"
script = "make test"

[[build.step]]
name = "package"
owner = "acme"
version = "1.2.0"
script = "make dist"
cwd = "dist"
timeout = 120

[build.step.env]
DIST = "out"

[[build.after-step]]
name = "notify"
script = "./notify.sh"

[[deploy.step]]
name = "release"
script = "./release.sh"
"#;

fn options() -> PipelineOptions {
    let mut options = PipelineOptions::for_build(Some("b-1".to_string()));
    options.application_name = "app".to_string();
    options.application_owner_name = "acme".to_string();
    options
}

#[test]
fn parses_a_full_config() {
    let config = parse_config(SAMPLE).unwrap();
    assert_eq!(config.image, "alpine:3.20");
    assert_eq!(config.env, vec![("CI".to_string(), "true".to_string())]);
    assert_eq!(config.target.repo.as_deref(), Some("acme/app"));
    assert_eq!(config.build.steps.len(), 2);
    assert_eq!(config.build.after_steps.len(), 1);
    assert_eq!(config.deploy.steps.len(), 1);

    let package = &config.build.steps[1];
    assert_eq!(package.owner, "acme");
    assert_eq!(package.version, "1.2.0");
    assert_eq!(package.cwd.as_deref(), Some("dist"));
    assert_eq!(package.env, vec![("DIST".to_string(), "out".to_string())]);
    assert_eq!(package.timeout_secs, Some(120));
    assert_eq!(config.build.steps[0].timeout_secs, None);
}

#[test]
fn missing_image_is_rejected() {
    let err = parse_config("[[build.step]]\nname = \"x\"\nscript = \"true\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::MissingField(f) if f == "image"));
}

#[test]
fn step_without_script_is_rejected() {
    let err =
        parse_config("image = \"alpine\"\n\n[[build.step]]\nname = \"x\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::MissingField(_)));
}

#[test]
fn build_resolver_assigns_orders_from_three() {
    let config = parse_config(SAMPLE).unwrap();
    let pipeline = get_build_pipeline(&config, &options()).unwrap();

    let indices: Vec<u32> = pipeline.steps().iter().map(|s| s.index()).collect();
    assert_eq!(indices, vec![3, 4]);
    // After-steps start past the store step's slot
    assert_eq!(pipeline.after_steps()[0].index(), 6);
}

#[test]
fn resolver_threads_target_and_base_env() {
    let config = parse_config(SAMPLE).unwrap();
    let pipeline = get_build_pipeline(&config, &options()).unwrap();

    assert_eq!(pipeline.docker_repo(), "acme/app");
    assert_eq!(pipeline.docker_tag(), "nightly");
    let env = pipeline.env_exports();
    assert!(env.contains(&("WERCKER".to_string(), "true".to_string())));
    assert!(env.contains(&("WERCKER_BUILD_ID".to_string(), "b-1".to_string())));
    assert!(env.contains(&("CI".to_string(), "true".to_string())));
}

#[test]
fn target_defaults_fall_back_to_application_identity() {
    let config = parse_config(
        "image = \"alpine\"\n\n[[build.step]]\nname = \"x\"\nscript = \"true\"\n",
    )
    .unwrap();
    let pipeline = get_build_pipeline(&config, &options()).unwrap();
    assert_eq!(pipeline.docker_repo(), "acme/app");
    assert_eq!(pipeline.docker_tag(), "latest");
}

#[test]
fn load_reads_a_config_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wercker.toml");
    std::fs::write(&path, SAMPLE).unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.image, "alpine:3.20");

    let err = Config::load(&dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn deploy_resolver_accepts_a_missing_section_as_empty() {
    let config = parse_config(
        "image = \"alpine\"\n\n[[build.step]]\nname = \"x\"\nscript = \"true\"\n",
    )
    .unwrap();
    let pipeline = get_deploy_pipeline(&config, &options()).unwrap();
    assert!(pipeline.steps().is_empty());
    assert!(pipeline.after_steps().is_empty());
}
