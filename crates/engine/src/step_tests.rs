// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use wercker_adapters::{
    ContainerClient, ContainerConfig, FakeContainerClient, ScriptedStep,
};

async fn fake_session(client: &FakeContainerClient) -> Session {
    let id = client
        .create_container(&ContainerConfig {
            image: "alpine".to_string(),
            name: "t".to_string(),
            ..ContainerConfig::default()
        })
        .await
        .unwrap();
    Session::new(client.attach(&id).await.unwrap())
}

fn step_with_script(script: &str) -> Step {
    let mut step = Step::new("acme", "unit", "1.0.0", 3);
    step.script = script.to_string();
    step
}

#[tokio::test]
async fn zero_exit_is_success() {
    let client = FakeContainerClient::new();
    client.script_step(ScriptedStep::passing().with_stdout(&["all green"]));
    let mut session = fake_session(&client).await;

    let mut seen = Vec::new();
    let mut sink = |stream: StreamKind, line: &str| seen.push((stream, line.to_string()));
    let result = execute_step(
        &mut session,
        &step_with_script("make test"),
        Duration::from_secs(5),
        &mut sink,
    )
    .await;

    assert!(result.success);
    assert_eq!(result.exit_code, 0);
    assert_eq!(seen, vec![(StreamKind::Stdout, "all green".to_string())]);
}

#[tokio::test]
async fn nonzero_exit_carries_the_last_output_line() {
    let client = FakeContainerClient::new();
    client.script_step(ScriptedStep::exiting(2).with_stdout(&["compiling", "oops"]));
    let mut session = fake_session(&client).await;

    let mut sink = |_: StreamKind, _: &str| {};
    let result = execute_step(
        &mut session,
        &step_with_script("make test"),
        Duration::from_secs(5),
        &mut sink,
    )
    .await;

    assert!(!result.success);
    assert_eq!(result.exit_code, 2);
    assert_eq!(result.message, "oops");
}

#[tokio::test]
async fn silent_failure_reports_the_exit_code() {
    let client = FakeContainerClient::new();
    client.script_step(ScriptedStep::exiting(3));
    let mut session = fake_session(&client).await;

    let mut sink = |_: StreamKind, _: &str| {};
    let result = execute_step(
        &mut session,
        &step_with_script("false"),
        Duration::from_secs(5),
        &mut sink,
    )
    .await;

    assert_eq!(result.message, "exit code 3");
}

#[tokio::test(start_paused = true)]
async fn hanging_step_times_out() {
    let client = FakeContainerClient::new();
    client.script_step(ScriptedStep::hanging());
    let mut session = fake_session(&client).await;

    let mut sink = |_: StreamKind, _: &str| {};
    let result = execute_step(
        &mut session,
        &step_with_script("sleep 9000"),
        Duration::from_secs(30),
        &mut sink,
    )
    .await;

    assert!(!result.success);
    assert_eq!(result.message, "timed out");
}
