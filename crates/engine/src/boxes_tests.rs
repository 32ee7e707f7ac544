// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use wercker_adapters::{ContainerCall, FakeContainerClient};
use wercker_core::{Pipeline, PipelineOptions};

fn pipeline() -> Pipeline {
    Pipeline::new(
        Vec::new(),
        Vec::new(),
        "alpine:3.20".to_string(),
        "acme/app".to_string(),
        "latest".to_string(),
        "built by wercker".to_string(),
        Vec::new(),
    )
}

fn boxed(client: &FakeContainerClient) -> PipelineBox<FakeContainerClient> {
    let options = PipelineOptions::for_build(Some("b-1".to_string()));
    PipelineBox::new(client.clone(), &options, &pipeline())
}

#[tokio::test]
async fn provision_pulls_absent_image_and_creates() {
    let client = FakeContainerClient::new();
    let mut bx = boxed(&client);

    bx.provision().await.unwrap();
    assert_eq!(bx.state(), BoxState::Provisioned);

    let calls = client.calls();
    assert!(matches!(calls[0], ContainerCall::ImageExists { .. }));
    assert!(matches!(calls[1], ContainerCall::PullImage { .. }));
    assert!(matches!(calls[2], ContainerCall::Create { .. }));
}

#[tokio::test]
async fn provision_is_idempotent() {
    let client = FakeContainerClient::new();
    let mut bx = boxed(&client);

    bx.provision().await.unwrap();
    let calls_before = client.calls().len();
    bx.provision().await.unwrap();
    assert_eq!(client.calls().len(), calls_before);
}

#[tokio::test]
async fn run_attaches_and_hands_out_one_session() {
    let client = FakeContainerClient::new();
    let mut bx = boxed(&client);

    bx.provision().await.unwrap();
    let id = bx.run().await.unwrap();
    assert!(!id.is_empty());
    assert_eq!(bx.state(), BoxState::Running);

    assert!(bx.new_session().is_ok());
    assert!(matches!(
        bx.new_session().unwrap_err(),
        BoxError::SessionUnavailable
    ));
}

#[tokio::test]
async fn run_requires_provisioning() {
    let client = FakeContainerClient::new();
    let mut bx = boxed(&client);
    assert!(matches!(
        bx.run().await.unwrap_err(),
        BoxError::InvalidState { op: "run", .. }
    ));
}

#[tokio::test]
async fn commit_requires_running_or_stopped() {
    let client = FakeContainerClient::new();
    let mut bx = boxed(&client);

    assert!(bx.commit("acme/app", "latest", "m").await.is_err());

    bx.provision().await.unwrap();
    bx.run().await.unwrap();
    bx.commit("acme/app", "latest", "m").await.unwrap();
    assert!(bx.has_commit());

    bx.stop().await.unwrap();
    bx.commit("acme/app", "latest", "m").await.unwrap();
}

#[tokio::test]
async fn push_requires_a_prior_commit() {
    let client = FakeContainerClient::new();
    let mut bx = boxed(&client);
    bx.provision().await.unwrap();
    bx.run().await.unwrap();

    let opts = PushOptions {
        registry: String::new(),
        repo: "acme/app".to_string(),
        tag: "latest".to_string(),
        message: String::new(),
    };
    assert!(matches!(
        bx.push(&opts, &RegistryAuth::anonymous()).await.unwrap_err(),
        BoxError::NothingCommitted
    ));

    bx.commit("acme/app", "latest", "m").await.unwrap();
    let digest = bx.push(&opts, &RegistryAuth::anonymous()).await.unwrap();
    assert!(digest.starts_with("sha256:"));
}

#[tokio::test]
async fn restart_recreates_from_the_committed_image() {
    let client = FakeContainerClient::new();
    let mut bx = boxed(&client);
    bx.provision().await.unwrap();
    bx.run().await.unwrap();
    bx.commit("acme/app", "v2", "m").await.unwrap();

    let new_id = bx.restart().await.unwrap();
    assert_eq!(bx.state(), BoxState::Running);
    assert_eq!(bx.container_id(), Some(new_id.as_str()));

    let creates: Vec<String> = client
        .calls()
        .iter()
        .filter_map(|c| match c {
            ContainerCall::Create { image, .. } => Some(image.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(creates, vec!["alpine:3.20".to_string(), "acme/app:v2".to_string()]);

    // The old session channel is gone; a fresh one is available
    assert!(bx.new_session().is_ok());
}

#[tokio::test]
async fn restart_without_commit_uses_the_original_image() {
    let client = FakeContainerClient::new();
    let mut bx = boxed(&client);
    bx.provision().await.unwrap();
    bx.run().await.unwrap();
    bx.restart().await.unwrap();

    let creates: Vec<String> = client
        .calls()
        .iter()
        .filter_map(|c| match c {
            ContainerCall::Create { image, .. } => Some(image.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(creates, vec!["alpine:3.20".to_string(), "alpine:3.20".to_string()]);
}

#[tokio::test]
async fn stop_then_clean_removes_the_container() {
    let client = FakeContainerClient::new();
    let mut bx = boxed(&client);
    bx.provision().await.unwrap();
    bx.run().await.unwrap();

    bx.stop().await.unwrap();
    assert_eq!(bx.state(), BoxState::Stopped);
    bx.clean().await.unwrap();
    assert_eq!(bx.state(), BoxState::Cleaned);

    let calls = client.calls();
    let stop_pos = calls
        .iter()
        .position(|c| matches!(c, ContainerCall::Stop { .. }))
        .unwrap();
    let remove_pos = calls
        .iter()
        .position(|c| matches!(c, ContainerCall::RemoveContainer { .. }))
        .unwrap();
    assert!(stop_pos < remove_pos);

    // After clean, nothing works
    assert!(bx.stop().await.is_err());
    assert!(bx.provision().await.is_err());
    assert!(bx.commit("r", "t", "m").await.is_err());
}

#[tokio::test]
async fn stop_is_a_noop_before_anything_ran() {
    let client = FakeContainerClient::new();
    let mut bx = boxed(&client);
    bx.stop().await.unwrap();
    assert!(client.calls().is_empty());
}

#[test]
fn image_refs_split_into_name_and_tag() {
    assert_eq!(
        split_image_ref("alpine:3.20"),
        ("alpine".to_string(), "3.20".to_string())
    );
    assert_eq!(
        split_image_ref("alpine"),
        ("alpine".to_string(), "latest".to_string())
    );
    assert_eq!(
        split_image_ref("registry.example.com:5000/acme/app"),
        (
            "registry.example.com:5000/acme/app".to_string(),
            "latest".to_string()
        )
    );
}
