// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::container::EXIT_MARKER;

async fn drain_lines(io: &mut ContainerIo) -> Vec<(StreamKind, String)> {
    let mut lines = Vec::new();
    let mut buffer = String::new();
    loop {
        let chunk = match tokio::time::timeout(
            std::time::Duration::from_millis(500),
            io.output.recv(),
        )
        .await
        {
            Ok(Some(chunk)) => chunk,
            _ => break,
        };
        buffer.push_str(&String::from_utf8_lossy(&chunk.data));
        while let Some(pos) = buffer.find('\n') {
            let line: String = buffer.drain(..=pos).collect();
            lines.push((chunk.stream, line.trim_end().to_string()));
        }
        if lines
            .last()
            .map(|(_, l)| l.starts_with(EXIT_MARKER))
            .unwrap_or(false)
        {
            break;
        }
    }
    lines
}

#[tokio::test]
async fn shell_answers_exit_marker_with_scripted_result() {
    let client = FakeContainerClient::new();
    client.script_step(ScriptedStep::exiting(7).with_stdout(&["oops"]));

    let id = client
        .create_container(&ContainerConfig {
            image: "alpine".to_string(),
            name: "t".to_string(),
            ..ContainerConfig::default()
        })
        .await
        .unwrap();
    let mut io = client.attach(&id).await.unwrap();

    let cmd = format!("make test\necho \"{} tok-1 $?\"\n", EXIT_MARKER);
    io.stdin.send(cmd.into_bytes()).await.unwrap();

    let lines = drain_lines(&mut io).await;
    assert_eq!(lines[0], (StreamKind::Stdout, "oops".to_string()));
    assert_eq!(
        lines[1],
        (
            StreamKind::Stdout,
            format!("{} tok-1 7", EXIT_MARKER)
        )
    );
}

#[tokio::test]
async fn unscripted_commands_pass_quietly() {
    let client = FakeContainerClient::new();
    let id = client
        .create_container(&ContainerConfig {
            image: "alpine".to_string(),
            name: "t".to_string(),
            ..ContainerConfig::default()
        })
        .await
        .unwrap();
    let mut io = client.attach(&id).await.unwrap();

    io.stdin
        .send(format!("true\necho \"{} tok-9 $?\"\n", EXIT_MARKER).into_bytes())
        .await
        .unwrap();

    let lines = drain_lines(&mut io).await;
    assert_eq!(
        lines,
        vec![(
            StreamKind::Stdout,
            format!("{} tok-9 0", EXIT_MARKER)
        )]
    );
}

#[tokio::test]
async fn export_lines_produce_no_output() {
    let client = FakeContainerClient::new();
    let id = client
        .create_container(&ContainerConfig {
            image: "alpine".to_string(),
            name: "t".to_string(),
            ..ContainerConfig::default()
        })
        .await
        .unwrap();
    let mut io = client.attach(&id).await.unwrap();

    io.stdin
        .send(b"export WERCKER='true'\n".to_vec())
        .await
        .unwrap();
    io.stdin
        .send(format!("echo \"{} tok-2 $?\"\n", EXIT_MARKER).into_bytes())
        .await
        .unwrap();

    let lines = drain_lines(&mut io).await;
    assert_eq!(lines.len(), 1);
    assert!(lines[0].1.ends_with(" tok-2 0"));
}

#[tokio::test]
async fn records_lifecycle_calls_in_order() {
    let client = FakeContainerClient::new();
    let id = client
        .create_container(&ContainerConfig {
            image: "alpine".to_string(),
            name: "t".to_string(),
            ..ContainerConfig::default()
        })
        .await
        .unwrap();
    client.commit(&id, "acme/app", "latest", "msg").await.unwrap();
    client.stop(&id).await.unwrap();
    client.remove_container(&id).await.unwrap();

    let calls = client.calls();
    assert!(matches!(calls[0], ContainerCall::Create { .. }));
    assert!(matches!(calls[1], ContainerCall::Commit { .. }));
    assert!(matches!(calls[2], ContainerCall::Stop { .. }));
    assert!(matches!(calls[3], ContainerCall::RemoveContainer { .. }));
}

#[tokio::test]
async fn scripted_push_failure_surfaces_as_registry_error() {
    let client = FakeContainerClient::new();
    client.fail_push("denied");
    let err = client
        .push(
            &PushOptions {
                registry: "reg.example.com".to_string(),
                repo: "acme/app".to_string(),
                tag: "latest".to_string(),
                message: String::new(),
            },
            &RegistryAuth::anonymous(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ContainerError::Registry(_)));
}

#[tokio::test]
async fn missing_export_path_errors() {
    let client = FakeContainerClient::new();
    let err = client.export_path("c-1", "/pipeline/output").await.unwrap_err();
    assert!(matches!(err, ContainerError::PathNotFound(_)));
}
